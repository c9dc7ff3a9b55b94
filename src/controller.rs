use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use tracing::trace;

use crate::domain::{GmvConfig, GmvError, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &GmvConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, GmvError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            // While the search box is open the model consumes keys raw.
            if model.raw_keyevents() {
                return Ok(Some(Message::RawKey(key)));
            }
            return Ok(self.handle_key(key));
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('q'), KeyModifiers::NONE) => Some(Message::Quit),
            (KeyCode::Esc, KeyModifiers::NONE) => Some(Message::Exit),
            (KeyCode::Char('/'), KeyModifiers::NONE) => Some(Message::Search),
            (KeyCode::Tab, KeyModifiers::NONE) => Some(Message::NextGroup),
            (KeyCode::BackTab, _) => Some(Message::PrevGroup),
            (KeyCode::Up, KeyModifiers::NONE) | (KeyCode::Char('k'), KeyModifiers::NONE) => {
                Some(Message::MoveUp)
            }
            (KeyCode::Down, KeyModifiers::NONE) | (KeyCode::Char('j'), KeyModifiers::NONE) => {
                Some(Message::MoveDown)
            }
            (KeyCode::Left, KeyModifiers::NONE) | (KeyCode::Char('h'), KeyModifiers::NONE) => {
                Some(Message::MoveLeft)
            }
            (KeyCode::Right, KeyModifiers::NONE) | (KeyCode::Char('l'), KeyModifiers::NONE) => {
                Some(Message::MoveRight)
            }
            (KeyCode::Char('n'), KeyModifiers::NONE) | (KeyCode::PageDown, KeyModifiers::NONE) => {
                Some(Message::NextPage)
            }
            (KeyCode::Char('p'), KeyModifiers::NONE) | (KeyCode::PageUp, KeyModifiers::NONE) => {
                Some(Message::PrevPage)
            }
            (KeyCode::Home, KeyModifiers::NONE) => Some(Message::FirstPage),
            (KeyCode::End, KeyModifiers::NONE) => Some(Message::LastPage),
            (KeyCode::Enter, KeyModifiers::NONE) | (KeyCode::Char(' '), KeyModifiers::NONE) => {
                Some(Message::ToggleGroup)
            }
            (KeyCode::Char('E'), _) => Some(Message::ExpandAll),
            (KeyCode::Char('C'), _) => Some(Message::CollapseAll),
            (KeyCode::Char('s'), KeyModifiers::NONE) => Some(Message::ToggleSort),
            (KeyCode::Char('e'), KeyModifiers::NONE) => Some(Message::ExportCsv),
            (KeyCode::Char('c'), KeyModifiers::NONE) => Some(Message::CopyRow),
            (KeyCode::Char('y'), KeyModifiers::NONE) => Some(Message::CopyCell),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn maps_core_bindings() {
        let controller = Controller::new(&GmvConfig::default());
        assert_eq!(
            controller.handle_key(key(KeyCode::Char('q'))),
            Some(Message::Quit)
        );
        assert_eq!(
            controller.handle_key(key(KeyCode::Char('/'))),
            Some(Message::Search)
        );
        assert_eq!(
            controller.handle_key(key(KeyCode::Char('s'))),
            Some(Message::ToggleSort)
        );
        assert_eq!(
            controller.handle_key(key(KeyCode::Char('n'))),
            Some(Message::NextPage)
        );
        assert_eq!(
            controller.handle_key(key(KeyCode::Enter)),
            Some(Message::ToggleGroup)
        );
        assert_eq!(controller.handle_key(key(KeyCode::F(5))), None);
    }
}
