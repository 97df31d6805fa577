use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, Focus, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    // A notice swallows the next key
    if app.notice.is_some() {
        app.notice = None;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key).await,
    }

    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab | KeyCode::Char('j') | KeyCode::Down => app.focus = app.focus.next(),
        KeyCode::BackTab | KeyCode::Char('k') | KeyCode::Up => app.focus = app.focus.prev(),

        KeyCode::Enter => match app.focus {
            Focus::PastImage | Focus::RecentImage => app.input_mode = InputMode::Editing,
            // Disabled while busy: App::submit ignores the press
            Focus::Submit => app.submit(),
        },
        KeyCode::Char('s') => app.submit(),

        KeyCode::Char('x') | KeyCode::Delete => {
            if let Some(slot) = app.focus.slot() {
                app.clear_slot(slot);
            }
        }

        KeyCode::Esc => app.cancel_submission(),
        KeyCode::Char('e') => app.export_images(),

        KeyCode::PageDown | KeyCode::Char('J') => app.scroll_results_down(),
        KeyCode::PageUp | KeyCode::Char('K') => app.scroll_results_up(),

        _ => {}
    }
}

async fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let Some(slot) = app.focus.slot() else {
        app.input_mode = InputMode::Normal;
        return;
    };

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            app.load_slot(slot).await;
            if app.notice.is_none() {
                app.focus = app.focus.next();
            }
        }
        KeyCode::Backspace => {
            app.path_input_mut(slot).pop();
        }
        KeyCode::Char(c) => {
            app.path_input_mut(slot).push(c);
        }
        _ => {}
    }
}
