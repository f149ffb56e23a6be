use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::App;
use crate::tui::AppEvent;

/// Lines moved per mouse wheel notch
const WHEEL_STEP: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => app.insert_str(&text),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
            return;
        }
    }
    app.request_redraw();
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') | KeyCode::Char('d') if ctrl => app.should_quit = true,
        KeyCode::Esc => app.should_quit = true,

        // Enter sends; with Shift (or Alt, where the terminal can't report
        // Shift+Enter) it breaks the line instead
        KeyCode::Enter if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) => {
            app.insert_char('\n');
        }
        KeyCode::Enter => app.send(),

        KeyCode::Backspace => app.delete_backward(),
        KeyCode::Delete => app.delete_forward(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),

        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),

        KeyCode::Char(c) if !ctrl => app.insert_char(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL_STEP),
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL_STEP),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use localchat_core::{ChatClient, Content, Role};

    fn test_app() -> App {
        App::new(ChatClient::new("http://127.0.0.1:9"))
    }

    fn press(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
        let key = KeyEvent::new_with_kind(code, modifiers, KeyEventKind::Press);
        handle_event(app, AppEvent::Key(key));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    #[tokio::test]
    async fn test_enter_submits_draft() {
        let mut app = test_app();
        type_text(&mut app, "hello");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);

        assert!(app.session.is_pending());
        assert_eq!(app.session.transcript().len(), 1);
        assert_eq!(app.session.transcript()[0].role(), Role::User);
        assert_eq!(
            app.session.transcript()[0].content(),
            &Content::from("hello")
        );

        app.request_task.take().unwrap().abort();
    }

    #[tokio::test]
    async fn test_modified_enter_inserts_newline() {
        let mut app = test_app();
        type_text(&mut app, "one");
        press(&mut app, KeyCode::Enter, KeyModifiers::SHIFT);
        type_text(&mut app, "two");
        press(&mut app, KeyCode::Enter, KeyModifiers::ALT);

        assert_eq!(app.session.draft(), "one\ntwo\n");
        assert!(app.session.transcript().is_empty());
        assert!(app.request_task.is_none());
    }

    #[tokio::test]
    async fn test_enter_while_pending_is_dropped() {
        let mut app = test_app();
        type_text(&mut app, "a");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        type_text(&mut app, "b");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(app.session.transcript().len(), 1);
        assert_eq!(app.session.draft(), "");

        app.request_task.take().unwrap().abort();
    }

    #[test]
    fn test_paste_goes_into_draft() {
        let mut app = test_app();
        handle_event(&mut app, AppEvent::Paste("line one\nline two".to_string()));
        assert_eq!(app.session.draft(), "line one\nline two");
    }

    #[test]
    fn test_quit_keys() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.should_quit);

        let mut app = test_app();
        press(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(app.should_quit);
        assert_eq!(app.session.draft(), "");
    }

    #[test]
    fn test_wheel_outside_chat_is_ignored() {
        let mut app = test_app();
        app.chat_area = Some(Rect::new(0, 0, 10, 10));
        app.chat_scroll = 5;

        let wheel = |row| MouseEvent {
            kind: MouseEventKind::ScrollUp,
            column: 2,
            row,
            modifiers: KeyModifiers::NONE,
        };

        handle_event(&mut app, AppEvent::Mouse(wheel(20)));
        assert_eq!(app.chat_scroll, 5);

        handle_event(&mut app, AppEvent::Mouse(wheel(3)));
        assert_eq!(app.chat_scroll, 2);
    }
}
