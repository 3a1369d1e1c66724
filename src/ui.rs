use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use guider_core::{
    render_turn, ChatRole, DisplayLine, LineKind, Rendered, Theme, BULLET_GLYPH,
};
use crate::app::{App, FocusPane, InputMode};

/// Colors for one theme; passed down instead of read from global state
#[derive(Debug, Clone, Copy)]
struct Palette {
    text: Color,
    dim: Color,
    user: Color,
    assistant: Color,
    heading: Color,
    accent: Color,
    border: Color,
    bar_bg: Color,
    bar_fg: Color,
    error: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            // UCSB navy and gold
            Theme::Light => Self {
                text: Color::Black,
                dim: Color::DarkGray,
                user: Color::Rgb(0, 54, 96),
                assistant: Color::Rgb(156, 110, 0),
                heading: Color::Rgb(0, 54, 96),
                accent: Color::Blue,
                border: Color::Gray,
                bar_bg: Color::Rgb(0, 54, 96),
                bar_fg: Color::White,
                error: Color::Red,
            },
            Theme::Dark => Self {
                text: Color::White,
                dim: Color::Gray,
                user: Color::Cyan,
                assistant: Color::Rgb(254, 188, 17),
                heading: Color::Rgb(254, 188, 17),
                accent: Color::Cyan,
                border: Color::DarkGray,
                bar_bg: Color::DarkGray,
                bar_fg: Color::White,
                error: Color::LightRed,
            },
        }
    }
}

/// Convert formatted spans into styled ratatui spans
fn styled_spans(line: &DisplayLine, base: Style) -> Vec<Span<'static>> {
    line.spans
        .iter()
        .map(|span| {
            let style = if span.bold {
                base.add_modifier(Modifier::BOLD)
            } else {
                base
            };
            Span::styled(span.text.clone(), style)
        })
        .collect()
}

fn display_line(line: &DisplayLine, palette: &Palette) -> Line<'static> {
    let base = Style::default().fg(palette.text);
    match line.kind {
        LineKind::Break => Line::default(),
        LineKind::Heading => {
            let heading = Style::default()
                .fg(palette.heading)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            Line::from(styled_spans(line, heading))
        }
        LineKind::Bullet => {
            let mut spans = vec![Span::styled(BULLET_GLYPH, Style::default().fg(palette.assistant))];
            spans.extend(styled_spans(line, base));
            Line::from(spans)
        }
        LineKind::Plain => Line::from(styled_spans(line, base)),
    }
}

/// Builds the chat transcript for the revealed portion of every turn
fn chat_lines(app: &App, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let role_style = |color: Color| Style::default().fg(color).add_modifier(Modifier::BOLD);

    for turn in app.session.turns() {
        match turn.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled("You:", role_style(palette.user))));
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled("Guider:", role_style(palette.assistant))));
            }
        }

        match render_turn(turn.role, turn.revealed()) {
            Rendered::Verbatim(text) => {
                for line in text.split('\n') {
                    lines.push(Line::styled(line.to_string(), Style::default().fg(palette.text)));
                }
            }
            Rendered::Lines(formatted) => {
                lines.extend(formatted.iter().map(|l| display_line(l, palette)));
            }
        }
        lines.push(Line::default());
    }

    if app.loading {
        lines.push(Line::from(Span::styled("Guider:", role_style(palette.assistant))));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(palette.dim).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Number of terminal rows the lines take once wrapped to `width`
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let total: usize = lines
        .iter()
        .map(|line| {
            let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
            wrapped_rows(&text, width)
        })
        .sum();
    total.min(u16::MAX as usize) as u16
}

/// Rows `text` takes when word-wrapped at `width` columns. Words wider than
/// the row are broken across rows.
fn wrapped_rows(text: &str, width: usize) -> usize {
    let mut rows = 1;
    let mut current_len = 0;

    for word in text.split_whitespace() {
        // Use character count, not byte length, for proper UTF-8 handling
        let mut word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len <= width {
            current_len += 1 + word_len;
            continue;
        }
        if current_len > 0 {
            rows += 1;
        }
        while word_len > width {
            rows += 1;
            word_len -= width;
        }
        current_len = word_len;
    }

    rows
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = Palette::for_theme(app.theme);

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area, &palette);

    let chat_column = if app.show_history {
        let [history_area, chat_column] = Layout::horizontal([
            Constraint::Percentage(30),
            Constraint::Percentage(70),
        ])
        .areas(body_area);
        render_history(app, frame, history_area, &palette);
        chat_column
    } else {
        app.history_area = None;
        body_area
    };

    render_chat(app, frame, chat_column, &palette);
    render_footer(app, frame, footer_area, &palette);

    if app.show_profile {
        render_profile(app, frame, area, &palette);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let session_indicator = match app.session.current_id() {
        Some(id) => format!(" [{}]", id.as_str().chars().take(8).collect::<String>()),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" Gaucho Guider ", Style::default().fg(palette.bar_fg).bold()),
        Span::styled(session_indicator, Style::default().fg(palette.bar_fg)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(palette.bar_fg),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(palette.bar_bg));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    // Errors and status take over the footer until dismissed
    if let Some(message) = app.input_error.as_ref().or(app.status.as_ref()) {
        let line = Line::from(Span::styled(
            format!(" {} ", message),
            Style::default().fg(palette.error).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " ASK ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = vec![Span::styled(mode_text, mode_style)];
    match app.input_mode {
        InputMode::Editing => hints.extend(vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" normal ", label_style),
        ]),
        InputMode::Normal => {
            hints.extend(vec![
                Span::styled(" i ", key_style),
                Span::styled(" ask ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" n ", key_style),
                Span::styled(" new chat ", label_style),
                Span::styled(" h ", key_style),
                Span::styled(" history ", label_style),
                Span::styled(" t ", key_style),
                Span::styled(format!(" {} ", app.theme.toggled().as_str()), label_style),
                Span::styled(" p ", key_style),
                Span::styled(" profile ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            if app.show_history {
                hints.extend(vec![
                    Span::styled(" Tab ", key_style),
                    Span::styled(" focus ", label_style),
                ]);
            }
        }
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_history(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    app.history_area = Some(area);

    let focused = app.focus == FocusPane::History;
    let border_color = if focused { palette.accent } else { palette.border };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Recent ");

    if app.history.is_empty() {
        let text = if app.history_task.is_some() { "Loading..." } else { "No past chats" };
        let empty = Paragraph::new(Span::styled(text, Style::default().fg(palette.dim))).block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .history
        .iter()
        .map(|s| {
            let title = if s.title.is_empty() { s.chat_session_id.as_str() } else { s.title.as_str() };
            ListItem::new(format!(" {} ", title))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(palette.accent)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.history_state);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store areas for mouse hit-testing
    app.chat_area = Some(chat_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_focused = app.focus == FocusPane::Chat;
    let border_color = if chat_focused { palette.accent } else { palette.border };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", app.client.base_url()));

    let chat_text = if app.session.is_empty() && !app.loading {
        Text::from(Span::styled(
            "How can I help you today?",
            Style::default().fg(palette.assistant).add_modifier(Modifier::BOLD),
        ))
    } else {
        let lines = chat_lines(app, palette);
        let total = wrapped_height(&lines, app.chat_width);
        app.fit_scroll(total);
        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    // Question input at the bottom - highlight when editing
    let input_border_color = if app.input_mode == InputMode::Editing {
        palette.assistant
    } else {
        palette.border
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Ask a question ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(palette.user))
        .block(input_block);

    frame.render_widget(input, input_area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing && !app.show_profile {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((
            input_area.x + cursor_x + 1,
            input_area.y + 1,
        ));
    }
}

fn render_profile(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let [popup] = Layout::horizontal([Constraint::Length(60)]).flex(Flex::Center).areas(area);
    let [popup] = Layout::vertical([Constraint::Length(9)]).flex(Flex::Center).areas(popup);

    let label_style = Style::default().fg(palette.dim);
    let lines: Vec<Line> = app
        .profile
        .fields()
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{:<7}", label), label_style),
                Span::styled(value.to_string(), Style::default().fg(palette.text)),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .title(" Profile (edit with `guider profile set`) ");

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        popup,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use guider_core::format::format_block;

    #[test]
    fn test_bullet_line_gets_glyph() {
        let palette = Palette::for_theme(Theme::Dark);
        let lines = format_block("- Take CS16");
        let line = display_line(&lines[0], &palette);
        assert_eq!(line.spans[0].content, BULLET_GLYPH);
        assert_eq!(line.spans[1].content, "Take CS16");
    }

    #[test]
    fn test_bold_span_is_styled() {
        let palette = Palette::for_theme(Theme::Light);
        let lines = format_block("**Major**: CS");
        let line = display_line(&lines[0], &palette);
        assert!(line.spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(!line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("abcdefghij"), Line::default(), Line::from("abc")];
        assert_eq!(wrapped_height(&lines, 4), 3 + 1 + 1);
    }

    #[test]
    fn test_wrapped_height_moves_whole_words() {
        // "aa bbbbb" does not fit in 6 columns, so "bbbbb" starts a new row
        let lines = vec![Line::from("aa bbbbb cc")];
        assert_eq!(wrapped_height(&lines, 6), 3);
        assert_eq!(wrapped_height(&lines, 11), 1);
    }

    #[test]
    fn test_wrapped_height_counts_styled_spans_together() {
        let line = Line::from(vec![Span::raw("take "), Span::raw("CS16 next")]);
        assert_eq!(wrapped_height(&[line], 9), 2);
    }
}
