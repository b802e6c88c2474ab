//! The in-place text buffer used while writing or editing a text stroke.
//! Positions are char indices, matching the caret helpers in `geometry`.

use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    text: String,
    caret: usize,
}

#[derive(Debug, Clone)]
pub struct TextEditor {
    text: String,
    caret: usize,
    anchor: Option<usize>,
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    depth: usize,
}

fn byte_at(text: &str, idx: usize) -> usize {
    text.char_indices().nth(idx).map(|(i, _)| i).unwrap_or(text.len())
}

impl TextEditor {
    pub fn new(text: &str, depth: usize) -> Self {
        Self {
            text: text.to_string(),
            caret: text.chars().count(),
            anchor: None,
            undo: VecDeque::new(),
            redo: Vec::new(),
            depth: depth.max(1),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Ordered `(start, end)` of the selected range, if non-empty.
    pub fn selection(&self) -> Option<(usize, usize)> {
        let anchor = self.anchor?;
        (anchor != self.caret).then(|| (anchor.min(self.caret), anchor.max(self.caret)))
    }

    pub fn selected_text(&self) -> Option<&str> {
        let (s, e) = self.selection()?;
        Some(&self.text[byte_at(&self.text, s)..byte_at(&self.text, e)])
    }

    pub fn set_caret(&mut self, pos: usize, extend: bool) {
        let pos = pos.min(self.len());
        if extend {
            self.anchor.get_or_insert(self.caret);
        } else {
            self.anchor = None;
        }
        self.caret = pos;
    }

    pub fn select_all(&mut self) {
        self.anchor = Some(0);
        self.caret = self.len();
    }

    fn snapshot(&mut self) {
        if self.undo.len() == self.depth {
            self.undo.pop_front();
        }
        self.undo.push_back(Snapshot {
            text: self.text.clone(),
            caret: self.caret,
        });
        self.redo.clear();
    }

    fn replace_range(&mut self, start: usize, end: usize, with: &str) {
        let (bs, be) = (byte_at(&self.text, start), byte_at(&self.text, end));
        self.text.replace_range(bs..be, with);
        self.caret = start + with.chars().count();
        self.anchor = None;
    }

    /// Inserts `s` at the caret, replacing the selection. Control characters
    /// other than newline are dropped.
    pub fn insert(&mut self, s: &str) {
        let clean: String = s
            .chars()
            .filter(|c| *c == '\n' || !c.is_control())
            .collect();
        if clean.is_empty() && self.selection().is_none() {
            return;
        }
        self.snapshot();
        let (start, end) = self.selection().unwrap_or((self.caret, self.caret));
        self.replace_range(start, end, &clean);
    }

    pub fn newline(&mut self) {
        self.insert("\n");
    }

    /// Deletes the selection or the char before the caret (`word`: the word).
    pub fn backspace(&mut self, word: bool) {
        if let Some((s, e)) = self.selection() {
            self.snapshot();
            self.replace_range(s, e, "");
        } else if self.caret > 0 {
            let start = if word { self.word_left_of(self.caret) } else { self.caret - 1 };
            self.snapshot();
            self.replace_range(start, self.caret, "");
        }
    }

    pub fn delete(&mut self, word: bool) {
        if let Some((s, e)) = self.selection() {
            self.snapshot();
            self.replace_range(s, e, "");
        } else if self.caret < self.len() {
            let end = if word { self.word_right_of(self.caret) } else { self.caret + 1 };
            self.snapshot();
            let start = self.caret;
            self.replace_range(start, end, "");
        }
    }

    pub fn move_left(&mut self, word: bool, extend: bool) {
        let target = match (self.selection(), extend, word) {
            (Some((s, _)), false, false) => s,
            (_, _, true) => self.word_left_of(self.caret),
            _ => self.caret.saturating_sub(1),
        };
        self.set_caret(target, extend);
    }

    pub fn move_right(&mut self, word: bool, extend: bool) {
        let target = match (self.selection(), extend, word) {
            (Some((_, e)), false, false) => e,
            (_, _, true) => self.word_right_of(self.caret),
            _ => self.caret + 1,
        };
        self.set_caret(target, extend);
    }

    fn line_bounds(&self, pos: usize) -> (usize, usize) {
        let chars: Vec<char> = self.text.chars().collect();
        let start = chars[..pos].iter().rposition(|c| *c == '\n').map_or(0, |i| i + 1);
        let end = chars[pos..]
            .iter()
            .position(|c| *c == '\n')
            .map_or(chars.len(), |i| pos + i);
        (start, end)
    }

    pub fn line_start(&mut self, extend: bool) {
        let (start, _) = self.line_bounds(self.caret);
        self.set_caret(start, extend);
    }

    pub fn line_end(&mut self, extend: bool) {
        let (_, end) = self.line_bounds(self.caret);
        self.set_caret(end, extend);
    }

    /// Moves one line up keeping the column where the target line allows.
    pub fn move_up(&mut self, extend: bool) {
        let (start, _) = self.line_bounds(self.caret);
        if start == 0 {
            self.set_caret(0, extend);
            return;
        }
        let col = self.caret - start;
        let (prev_start, prev_end) = self.line_bounds(start - 1);
        self.set_caret((prev_start + col).min(prev_end), extend);
    }

    pub fn move_down(&mut self, extend: bool) {
        let (start, end) = self.line_bounds(self.caret);
        if end >= self.len() {
            let len = self.len();
            self.set_caret(len, extend);
            return;
        }
        let col = self.caret - start;
        let (next_start, next_end) = self.line_bounds(end + 1);
        self.set_caret((next_start + col).min(next_end), extend);
    }

    fn word_left_of(&self, pos: usize) -> usize {
        let chars: Vec<char> = self.text.chars().collect();
        let mut i = pos;
        while i > 0 && chars[i - 1].is_whitespace() {
            i -= 1;
        }
        while i > 0 && !chars[i - 1].is_whitespace() {
            i -= 1;
        }
        i
    }

    fn word_right_of(&self, pos: usize) -> usize {
        let chars: Vec<char> = self.text.chars().collect();
        let mut i = pos;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        i
    }

    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.undo.pop_back() else {
            return false;
        };
        let current = Snapshot {
            text: std::mem::replace(&mut self.text, prev.text),
            caret: self.caret,
        };
        self.redo.push(current);
        self.caret = prev.caret;
        self.anchor = None;
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let current = Snapshot {
            text: std::mem::replace(&mut self.text, next.text),
            caret: self.caret,
        };
        self.undo.push_back(current);
        self.caret = next.caret;
        self.anchor = None;
        true
    }
}
