use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ratatui::layout::Rect;
use tokio::task::{JoinError, JoinHandle};
use localchat_core::{ChatClient, ChatError, Content, Session};

/// Background task delivering one prompt to the backend
pub type RequestTask = JoinHandle<Result<Content, ChatError>>;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Resolves when the in-flight request finishes; never resolves when idle.
pub async fn wait_for_request(
    task: &mut Option<RequestTask>,
) -> Result<Result<Content, ChatError>, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

pub struct App {
    pub should_quit: bool,
    pub session: Session,
    pub client: ChatClient,

    // Draft editing
    pub cursor: usize, // cursor position in the draft, in chars

    // Transcript view
    pub chat_scroll: u16,
    pub follow_tail: bool,  // keep the newest entry in view
    pub chat_height: u16,   // inner height of the transcript pane
    pub chat_width: u16,    // inner width, for wrap estimates
    pub chat_area: Option<Rect>,

    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub request_task: Option<RequestTask>,

    // Set by session notifications and input handling, cleared on draw
    redraw: Arc<AtomicBool>,
}

impl App {
    pub fn new(client: ChatClient) -> Self {
        let redraw = Arc::new(AtomicBool::new(true));

        let mut session = Session::new();
        let flag = Arc::clone(&redraw);
        session.subscribe(move |event| {
            tracing::trace!(?event, "session changed");
            flag.store(true, Ordering::Relaxed);
        });

        Self {
            should_quit: false,
            session,
            client,
            cursor: 0,
            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            animation_frame: 0,
            request_task: None,
            redraw,
        }
    }

    pub fn request_redraw(&self) {
        self.redraw.store(true, Ordering::Relaxed);
    }

    /// Returns whether a redraw was requested, and clears the request
    pub fn take_redraw(&self) -> bool {
        self.redraw.swap(false, Ordering::Relaxed)
    }

    /// The draft is read-only while a reply is pending
    pub fn input_enabled(&self) -> bool {
        !self.session.is_pending()
    }

    fn edit_draft(&mut self, edit: impl FnOnce(&mut String, &mut usize)) {
        if !self.input_enabled() {
            return;
        }
        let mut draft = self.session.draft().to_string();
        let mut cursor = self.cursor.min(draft.chars().count());
        edit(&mut draft, &mut cursor);
        self.cursor = cursor;
        self.session.update_draft(draft);
    }

    pub fn insert_char(&mut self, c: char) {
        self.edit_draft(|draft, cursor| {
            draft.insert(char_to_byte_index(draft, *cursor), c);
            *cursor += 1;
        });
    }

    pub fn insert_str(&mut self, text: &str) {
        // Pasted CRLF would leave stray carriage returns in the prompt
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        self.edit_draft(|draft, cursor| {
            draft.insert_str(char_to_byte_index(draft, *cursor), &text);
            *cursor += text.chars().count();
        });
    }

    pub fn delete_backward(&mut self) {
        self.edit_draft(|draft, cursor| {
            if *cursor > 0 {
                *cursor -= 1;
                draft.remove(char_to_byte_index(draft, *cursor));
            }
        });
    }

    pub fn delete_forward(&mut self) {
        self.edit_draft(|draft, cursor| {
            if *cursor < draft.chars().count() {
                draft.remove(char_to_byte_index(draft, *cursor));
            }
        });
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.session.draft().chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.session.draft().chars().count();
    }

    /// Submit the draft and start the request in the background.
    /// A no-op when the draft is blank or a reply is still pending.
    pub fn send(&mut self) {
        let Some(outbound) = self.session.submit() else {
            return;
        };

        self.cursor = 0;
        self.follow_tail = true;

        let client = self.client.clone();
        self.request_task = Some(tokio::spawn(async move {
            client.query(&outbound.prompt).await
        }));
    }

    /// Record the outcome of the background request.
    /// A task that panicked or was aborted still clears the pending state.
    pub fn finish_request(&mut self, joined: Result<Result<Content, ChatError>, JoinError>) {
        self.request_task = None;

        let result = joined.unwrap_or_else(|e| Err(ChatError::Interrupted(e.to_string())));
        self.session.resolve(result);
        self.follow_tail = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
            self.request_redraw();
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Estimated height of the rendered transcript at the current width
    pub fn transcript_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for record in self.session.render() {
            total_lines += 1; // role label
            for line in record.body.lines() {
                let char_count = line.chars().count();
                total_lines += char_count.div_ceil(wrap_width).max(1);
            }
            total_lines += 1; // blank line after record
        }

        total_lines.min(u16::MAX as usize) as u16
    }

    /// Clamp the scroll offset, pinning it to the bottom while following
    pub fn sync_scroll(&mut self) {
        let max_scroll = self.transcript_lines().saturating_sub(self.chat_height);
        if self.follow_tail || self.chat_scroll >= max_scroll {
            self.chat_scroll = max_scroll;
            self.follow_tail = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localchat_core::{Message, Role, SendState};

    fn test_app() -> App {
        // Nothing listens on the discard port; requests here are never awaited
        App::new(ChatClient::new("http://127.0.0.1:9"))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    #[test]
    fn test_editing_respects_cursor() {
        let mut app = test_app();
        type_text(&mut app, "héllo");
        app.cursor_home();
        app.insert_char('>');
        app.cursor_end();
        app.delete_backward();
        app.cursor_left();
        app.delete_forward();

        assert_eq!(app.session.draft(), ">hél");
        assert_eq!(app.cursor, 4);
    }

    #[test]
    fn test_paste_normalizes_line_endings() {
        let mut app = test_app();
        app.insert_str("one\r\ntwo\rthree");
        assert_eq!(app.session.draft(), "one\ntwo\nthree");
        assert_eq!(app.cursor, 13);
    }

    #[tokio::test]
    async fn test_send_starts_request_and_locks_input() {
        let mut app = test_app();
        type_text(&mut app, "hello");
        app.send();

        assert_eq!(app.session.state(), SendState::Sending);
        assert!(app.request_task.is_some());
        assert_eq!(app.session.draft(), "");
        assert_eq!(app.cursor, 0);

        type_text(&mut app, "more");
        assert_eq!(app.session.draft(), "");

        app.request_task.take().unwrap().abort();
    }

    #[tokio::test]
    async fn test_send_blank_draft_is_noop() {
        let mut app = test_app();
        type_text(&mut app, "   ");
        app.send();

        assert!(app.request_task.is_none());
        assert!(app.session.transcript().is_empty());
        assert!(!app.session.is_pending());
    }

    #[tokio::test]
    async fn test_finish_request_records_reply() {
        let mut app = test_app();
        type_text(&mut app, "hello");
        app.send();
        app.request_task.take().unwrap().abort();

        app.finish_request(Ok(Ok(Content::from("hi there"))));

        assert!(!app.session.is_pending());
        assert!(app.request_task.is_none());
        assert_eq!(
            app.session.transcript(),
            &[
                Message::new(Role::User, "hello"),
                Message::new(Role::Assistant, "hi there"),
            ]
        );
    }

    #[tokio::test]
    async fn test_aborted_request_clears_pending() {
        let mut app = test_app();
        type_text(&mut app, "hello");
        app.send();

        let handle = app.request_task.take().unwrap();
        handle.abort();
        let joined = handle.await;
        assert!(joined.is_err());

        app.finish_request(joined);

        assert!(!app.session.is_pending());
        let last = app.session.transcript().last().unwrap();
        assert_eq!(last.role(), Role::Error);
        assert!(last.content().display_text().starts_with("Error: request interrupted"));
    }

    #[tokio::test]
    async fn test_wait_for_request_yields_task_output() {
        let mut task: Option<RequestTask> =
            Some(tokio::spawn(async { Ok::<_, ChatError>(Content::from("done")) }));

        let joined = wait_for_request(&mut task).await.unwrap();
        assert_eq!(joined, Ok(Content::from("done")));
    }

    #[test]
    fn test_session_changes_request_redraw() {
        let mut app = test_app();
        assert!(app.take_redraw());
        assert!(!app.take_redraw());

        app.insert_char('x');
        assert!(app.take_redraw());
    }

    #[test]
    fn test_scroll_follows_tail_until_user_scrolls_up() {
        let mut app = test_app();
        app.chat_width = 10;
        app.chat_height = 4;
        app.insert_str("0123456789012345678901234");
        app.session.submit().unwrap();
        app.session.resolve(Ok(Content::from("ok")));

        // user: 1 + 3 + 1, assistant: 1 + 1 + 1
        assert_eq!(app.transcript_lines(), 8);
        app.sync_scroll();
        assert_eq!(app.chat_scroll, 4);

        app.scroll_up(3);
        app.sync_scroll();
        assert_eq!(app.chat_scroll, 1);
        assert!(!app.follow_tail);

        app.scroll_down(10);
        app.sync_scroll();
        assert_eq!(app.chat_scroll, 4);
        assert!(app.follow_tail);
    }
}
