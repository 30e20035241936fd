use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_response().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,

        // Start typing a question
        KeyCode::Char('i') | KeyCode::Char('/') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.session.cursor_end();
        }

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        // Submission is silently ignored while a request is in flight or
        // when the input is blank; the session enforces both.
        KeyCode::Enter => {
            app.submit();
        }
        KeyCode::Backspace => {
            app.session.delete_char();
        }
        KeyCode::Delete => {
            app.session.delete_forward();
        }
        KeyCode::Left => {
            app.session.cursor_left();
        }
        KeyCode::Right => {
            app.session.cursor_right();
        }
        KeyCode::Home => {
            app.session.cursor_home();
        }
        KeyCode::End => {
            app.session.cursor_end();
        }
        KeyCode::Char(c) => {
            app.session.insert_char(c);
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => {
            app.scroll_down();
            app.scroll_down();
            app.scroll_down();
        }
        MouseEventKind::ScrollUp => {
            app.scroll_up();
            app.scroll_up();
            app.scroll_up();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AskClient;
    use std::time::Duration;

    fn test_app() -> App {
        let client = AskClient::new("http://127.0.0.1:9/ask", Duration::from_secs(1)).unwrap();
        App::new(client)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_typing_then_enter_submits() {
        let mut app = test_app();
        handle_event(&mut app, AppEvent::Key(press(KeyCode::Char('i'))))
            .await
            .unwrap();
        assert_eq!(app.input_mode, InputMode::Editing);

        for c in "hi".chars() {
            handle_event(&mut app, AppEvent::Key(press(KeyCode::Char(c))))
                .await
                .unwrap();
        }
        handle_event(&mut app, AppEvent::Key(press(KeyCode::Enter)))
            .await
            .unwrap();

        assert_eq!(app.session.messages.len(), 1);
        assert_eq!(app.session.messages[0].content, "hi");
        assert!(app.session.is_loading());
        assert!(app.session.input.is_empty());
    }

    #[tokio::test]
    async fn test_enter_on_empty_input_is_noop() {
        let mut app = test_app();
        app.input_mode = InputMode::Editing;
        handle_event(&mut app, AppEvent::Key(press(KeyCode::Enter)))
            .await
            .unwrap();
        assert!(app.session.messages.is_empty());
        assert!(!app.session.is_loading());
    }

    #[tokio::test]
    async fn test_enter_while_loading_keeps_draft() {
        let mut app = test_app();
        app.session.input = "a".to_string();
        app.input_mode = InputMode::Editing;
        handle_event(&mut app, AppEvent::Key(press(KeyCode::Enter)))
            .await
            .unwrap();
        assert!(app.session.is_loading());

        // A second question typed while the first is in flight stays put.
        app.input_mode = InputMode::Editing;
        for c in "b".chars() {
            handle_event(&mut app, AppEvent::Key(press(KeyCode::Char(c))))
                .await
                .unwrap();
        }
        handle_event(&mut app, AppEvent::Key(press(KeyCode::Enter)))
            .await
            .unwrap();

        assert_eq!(app.session.messages.len(), 1);
        assert_eq!(app.session.messages[0].content, "a");
        assert_eq!(app.session.input, "b");
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_in_any_mode() {
        let mut app = test_app();
        app.input_mode = InputMode::Editing;
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        handle_event(&mut app, AppEvent::Key(key)).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_q_quits_only_in_normal_mode() {
        let mut app = test_app();
        handle_event(&mut app, AppEvent::Key(press(KeyCode::Char('q'))))
            .await
            .unwrap();
        assert!(app.should_quit);

        let mut app = test_app();
        app.input_mode = InputMode::Editing;
        handle_event(&mut app, AppEvent::Key(press(KeyCode::Char('q'))))
            .await
            .unwrap();
        assert!(!app.should_quit);
        assert_eq!(app.session.input, "q");
    }
}
