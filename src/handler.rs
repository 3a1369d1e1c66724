use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reveal => app.tick_reveal(),
        AppEvent::TaskDone => {}
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_profile {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('p')) {
            app.show_profile = false;
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') => app.input_mode = InputMode::Editing,
        KeyCode::Enter if app.focus == FocusPane::Chat => app.input_mode = InputMode::Editing,

        KeyCode::Char('n') => app.new_chat(),
        KeyCode::Char('t') => app.toggle_theme(),
        KeyCode::Char('h') => app.toggle_history(),
        KeyCode::Char('r') if app.show_history => app.refresh_history(),
        KeyCode::Char('p') => app.show_profile = true,

        KeyCode::Tab if app.show_history => {
            app.focus = match app.focus {
                FocusPane::Chat => FocusPane::History,
                FocusPane::History => FocusPane::Chat,
            };
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Chat => app.scroll_down(1),
            FocusPane::History => app.history_nav_down(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Chat => app.scroll_up(1),
            FocusPane::History => app.history_nav_up(),
        },
        KeyCode::Enter if app.focus == FocusPane::History => app.open_selected_history(),

        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half = (app.chat_height / 2).max(1);
            app.scroll_down(half);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half = (app.chat_height / 2).max(1);
            app.scroll_up(half);
        }
        KeyCode::Char('g') => app.scroll_up(u16::MAX),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        KeyCode::Esc => {
            app.input_error = None;
            app.status = None;
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
            app.input_error = None;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let over = |area: Option<Rect>| {
        area.is_some_and(|a| {
            mouse.column >= a.x
                && mouse.column < a.x + a.width
                && mouse.row >= a.y
                && mouse.row < a.y + a.height
        })
    };

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if over(app.history_area) {
                app.history_nav_down();
            } else if over(app.chat_area) {
                app.scroll_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if over(app.history_area) {
                app.history_nav_up();
            } else if over(app.chat_area) {
                app.scroll_up(3);
            }
        }
        _ => {}
    }
}
