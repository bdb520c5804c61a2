//! Text-input editing helpers (cursor movement, insertion, deletion) and the
//! per-persona draft stash.
//!
//! `cursor` is a byte offset into `input` and always sits on a char boundary.

use crate::persona::Persona;

use super::App;

impl App {
    /// Insert a character at the cursor and step past it.
    pub(crate) fn insert_char(&mut self, ch: char) {
        self.input.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    /// Delete the character before the cursor.
    pub(crate) fn backspace(&mut self) {
        if let Some(width) = self.char_before_cursor() {
            self.cursor -= width;
            self.input.remove(self.cursor);
        }
    }

    /// Delete the character at the cursor.
    pub(crate) fn delete(&mut self) {
        if self.char_after_cursor().is_some() {
            self.input.remove(self.cursor);
        }
    }

    pub(crate) fn move_cursor_left(&mut self) {
        if let Some(width) = self.char_before_cursor() {
            self.cursor -= width;
        }
    }

    pub(crate) fn move_cursor_right(&mut self) {
        if let Some(width) = self.char_after_cursor() {
            self.cursor += width;
        }
    }

    pub(crate) fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn move_cursor_end(&mut self) {
        self.cursor = self.input.len();
    }

    /// Take the current line, leaving an empty input behind.
    pub(crate) fn take_input(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.input)
    }

    /// Park the current draft under `from` and restore the draft of `to`.
    pub(crate) fn swap_draft(&mut self, from: Persona, to: Persona) {
        if from == to {
            return;
        }
        let draft = std::mem::take(&mut self.input);
        if draft.is_empty() {
            self.drafts.remove(&from);
        } else {
            self.drafts.insert(from, draft);
        }
        self.input = self.drafts.remove(&to).unwrap_or_default();
        self.cursor = self.input.len();
    }

    /// Byte length of the character left of the cursor.
    fn char_before_cursor(&self) -> Option<usize> {
        self.input[..self.cursor].chars().next_back().map(char::len_utf8)
    }

    /// Byte length of the character under the cursor.
    fn char_after_cursor(&self) -> Option<usize> {
        self.input[self.cursor..].chars().next().map(char::len_utf8)
    }
}
