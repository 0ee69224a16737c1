use ratatui::crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};

use crate::action::Action;

/// Map a crossterm terminal event to a TUI action.
pub fn map_event(event: &Event) -> Action {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            // Ctrl+C always quits
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                return Action::Quit;
            }
            map_key(key)
        }
        Event::Paste(text) => Action::Paste(text.clone()),
        Event::Mouse(mouse) => map_mouse(mouse),
        Event::Resize(w, h) => Action::Resize(*w, *h),
        _ => Action::None,
    }
}

fn map_mouse(mouse: &MouseEvent) -> Action {
    match mouse.kind {
        MouseEventKind::ScrollDown => Action::MoveDown,
        MouseEventKind::ScrollUp => Action::MoveUp,
        _ => Action::None,
    }
}

fn map_key(key: &KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('p') => Action::Play,
        KeyCode::Char(' ') => Action::Pause,
        KeyCode::Char('s') => Action::Stop,
        KeyCode::Tab | KeyCode::BackTab => Action::CycleSlider,
        KeyCode::Char('l') | KeyCode::Char('+') | KeyCode::Right => Action::Increase,
        KeyCode::Char('h') | KeyCode::Char('-') | KeyCode::Left => Action::Decrease,
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::PageDown,
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::Char('g') | KeyCode::Home => Action::GoTop,
        KeyCode::Char('G') | KeyCode::End => Action::GoBottom,
        KeyCode::Enter => Action::DrillIn,
        KeyCode::Esc => Action::NavigateBack,
        KeyCode::Char('o') => Action::OpenFilePicker,
        KeyCode::Char('?') => Action::ToggleHelp,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn playback_keys() {
        assert_eq!(map_event(&key(KeyCode::Char('p'))), Action::Play);
        assert_eq!(map_event(&key(KeyCode::Char(' '))), Action::Pause);
        assert_eq!(map_event(&key(KeyCode::Char('s'))), Action::Stop);
    }

    #[test]
    fn ctrl_c_quits() {
        let event = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(map_event(&event), Action::Quit);
    }

    #[test]
    fn slider_keys() {
        assert_eq!(map_event(&key(KeyCode::Right)), Action::Increase);
        assert_eq!(map_event(&key(KeyCode::Char('h'))), Action::Decrease);
        assert_eq!(map_event(&key(KeyCode::Tab)), Action::CycleSlider);
    }

    #[test]
    fn paste_carries_text() {
        let event = Event::Paste("/tmp/paper.pdf".into());
        assert_eq!(map_event(&event), Action::Paste("/tmp/paper.pdf".into()));
    }

    #[test]
    fn key_release_is_ignored() {
        let mut release = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(map_event(&Event::Key(release)), Action::None);
    }
}
