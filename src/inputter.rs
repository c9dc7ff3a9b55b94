//! Line editor for the search box. Unlike a commit-on-enter prompt, every
//! edit is observable through `get()` so the match view can filter live
//! while the user types; Esc restores whatever query was active before.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Default)]
pub struct QueryInput {
    text: String,
    previous: String,
    cursor: usize, // char position, not bytes
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug)]
pub struct InputResult {
    pub text: String,
    pub cursor: usize,
    pub finished: bool,
    pub canceled: bool,
}

impl QueryInput {
    /// Open the editor seeded with the active query, remembering it for a
    /// possible cancel.
    pub fn begin(&mut self, current: &str) {
        self.previous = current.to_string();
        self.text = current.to_string();
        self.cursor = self.text.chars().count();
        self.finished = false;
        self.canceled = false;
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            text: self.text.clone(),
            cursor: self.cursor,
            finished: self.finished,
            canceled: self.canceled,
        }
    }

    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.enter(),
            (KeyCode::Esc, KeyModifiers::NONE) => self.escape(),
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Delete, KeyModifiers::NONE) => self.delete(),
            (KeyCode::Left, KeyModifiers::NONE) => self.left(),
            (KeyCode::Right, KeyModifiers::NONE) => self.right(),
            (KeyCode::Home, KeyModifiers::NONE) => self.home(),
            (KeyCode::End, KeyModifiers::NONE) => self.end(),
            (code, _) => self.key(code),
        }
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.text = self.previous.clone();
        self.cursor = self.text.chars().count();
        self.finished = true;
        self.canceled = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.cursor > 0 {
            self.cursor -= 1;
            let pos = self.byte_pos(self.cursor);
            self.text.remove(pos);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.cursor < self.text.chars().count() {
            let pos = self.byte_pos(self.cursor);
            self.text.remove(pos);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.cursor = self.cursor.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.cursor < self.text.chars().count() {
            self.cursor += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.cursor = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.cursor = self.text.chars().count();
        self.get()
    }

    fn key(&mut self, code: KeyCode) -> InputResult {
        if let Some(chr) = code.as_char() {
            let pos = self.byte_pos(self.cursor);
            self.text.insert(pos, chr);
            self.cursor += 1;
        }
        self.get()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut QueryInput, code: KeyCode) -> InputResult {
        input.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn typing_updates_text_live() {
        let mut input = QueryInput::default();
        input.begin("");
        press(&mut input, KeyCode::Char('j'));
        let r = press(&mut input, KeyCode::Char('a'));
        assert_eq!(r.text, "ja");
        assert!(!r.finished);
    }

    #[test]
    fn backspace_removes_before_cursor() {
        let mut input = QueryInput::default();
        input.begin("jane");
        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.get().text, "jae");
    }

    #[test]
    fn escape_restores_previous_query() {
        let mut input = QueryInput::default();
        input.begin("jane");
        press(&mut input, KeyCode::Backspace);
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.get().text, "ja");
        let r = press(&mut input, KeyCode::Esc);
        assert!(r.canceled);
        assert_eq!(r.text, "jane");
    }

    #[test]
    fn enter_commits() {
        let mut input = QueryInput::default();
        input.begin("");
        press(&mut input, KeyCode::Char('x'));
        let r = press(&mut input, KeyCode::Enter);
        assert!(r.finished);
        assert!(!r.canceled);
        assert_eq!(r.text, "x");
    }

    #[test]
    fn insertion_is_char_safe() {
        let mut input = QueryInput::default();
        input.begin("Nyõro");
        press(&mut input, KeyCode::Home);
        press(&mut input, KeyCode::Right);
        press(&mut input, KeyCode::Char('a'));
        assert_eq!(input.get().text, "Nayõro");
    }
}
