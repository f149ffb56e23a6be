use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use localchat_core::{Record, RecordKind, Role, IN_PROGRESS_TEXT};
use crate::app::App;

/// Tallest the input box grows before it scrolls
const MAX_INPUT_LINES: u16 = 5;

/// Render `**bold**` spans in a reply line. A line with an unmatched marker
/// is shown as-is.
fn styled_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    if parts.len() % 2 == 0 {
        return Line::from(text.to_string());
    }

    let spans: Vec<Span<'static>> = parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 1 {
                Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(part.to_string())
            }
        })
        .collect();

    Line::from(spans)
}

fn role_style(kind: RecordKind) -> Style {
    let color = match kind {
        RecordKind::Message(Role::User) => Color::Cyan,
        RecordKind::Message(Role::Assistant) | RecordKind::InProgress => Color::Yellow,
        RecordKind::Message(Role::Error) => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn record_lines(record: &Record, animation_frame: u8, lines: &mut Vec<Line<'static>>) {
    lines.push(Line::from(Span::styled(
        format!("{}:", record.label),
        role_style(record.kind),
    )));

    match record.kind {
        RecordKind::InProgress => {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("{}{}", IN_PROGRESS_TEXT.trim_end_matches('.'), dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        RecordKind::Message(Role::Error) => {
            for line in record.body.lines() {
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::Red),
                )));
            }
        }
        RecordKind::Message(Role::Assistant) if !record.structured => {
            for line in record.body.lines() {
                lines.push(styled_line(line));
            }
        }
        RecordKind::Message(_) => {
            for line in record.body.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
    }

    lines.push(Line::default());
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let draft_lines = app.session.draft().split('\n').count() as u16;
    let input_height = draft_lines.clamp(1, MAX_INPUT_LINES) + 2; // +2 for borders

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" localchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.endpoint_url(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    app.sync_scroll();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chat with local LLM ");

    let records = app.session.render();
    let text = if records.is_empty() {
        Text::from(Span::styled(
            "Type a message and press Enter...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for record in &records {
            record_lines(record, app.animation_frame, &mut lines);
        }
        Text::from(lines)
    };

    // No trimming: structured replies rely on their indentation
    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.input_enabled();
    let border_color = if enabled { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");

    if !enabled {
        let waiting = Paragraph::new(Span::styled(
            "Waiting for reply...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
        .block(block);
        frame.render_widget(waiting, area);
        return;
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    // Locate the cursor as (row, column) within the draft
    let before_cursor: String = app.session.draft().chars().take(app.cursor).collect();
    let cursor_row = before_cursor.matches('\n').count();
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|line| line.chars().count())
        .unwrap_or(0);

    // Scroll so the cursor stays visible in both directions
    let row_offset = if inner_height == 0 {
        0
    } else {
        (cursor_row + 1).saturating_sub(inner_height)
    };
    let col_offset = if inner_width == 0 {
        0
    } else {
        (cursor_col + 1).saturating_sub(inner_width)
    };

    let visible: Vec<Line> = app
        .session
        .draft()
        .split('\n')
        .skip(row_offset)
        .take(inner_height)
        .map(|line| Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    // Cyan text to match the "user:" label
    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    frame.set_cursor_position((
        area.x + 1 + (cursor_col - col_offset) as u16,
        area.y + 1 + (cursor_row - row_offset) as u16,
    ));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // The send hint doubles as the send button: dim when there is nothing to send
    let send_style = if app.session.can_send() {
        Style::default().fg(Color::Black).bg(Color::Green).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let hint = Style::default().fg(Color::DarkGray);
    let footer = Line::from(vec![
        Span::styled(" Enter: Send ", send_style),
        Span::styled(" Shift/Alt+Enter: newline ", hint),
        Span::styled(" PgUp/PgDn: scroll ", hint),
        Span::styled(" Esc: quit ", hint),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use localchat_core::{ChatClient, Content};
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut screen = String::new();
        for row in buffer.content.chunks(buffer.area.width as usize) {
            for cell in row {
                screen.push_str(cell.symbol());
            }
            screen.push('\n');
        }
        screen
    }

    #[test]
    fn test_styled_line_bold() {
        let line = styled_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "b");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_styled_line_unmatched_marker_is_literal() {
        let line = styled_line("2 ** 3");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "2 ** 3");
    }

    #[test]
    fn test_render_transcript_in_order() {
        let mut app = App::new(ChatClient::new("http://127.0.0.1:9"));
        app.session.update_draft("hello");
        app.session.submit().unwrap();

        let screen = draw(&mut app);
        assert!(screen.contains("user:"));
        assert!(screen.contains("Thinking."));
        assert!(screen.contains("Waiting for reply"));

        app.session.resolve(Err(localchat_core::ChatError::Status(500)));
        let screen = draw(&mut app);
        let user_at = screen.find("user:").unwrap();
        let error_at = screen.find("error:").unwrap();
        assert!(user_at < error_at);
        assert!(screen.contains("status 500"));
        assert!(!screen.contains("Thinking"));
    }

    #[test]
    fn test_render_structured_reply_indented() {
        let mut app = App::new(ChatClient::new("http://127.0.0.1:9"));
        app.session.update_draft("json please");
        app.session.submit().unwrap();
        app.session
            .resolve(Ok(Content::from_json(serde_json::json!({"answer": 42}))));

        let screen = draw(&mut app);
        assert!(screen.contains("  \"answer\": 42"));
    }
}
