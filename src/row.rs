//! # Row
//!
//! A `Row` owns one line of the buffer: the raw bytes (`chars`) and the
//! rendered mirror (`render`), in which every tab is expanded with spaces up
//! to the next tab stop. `render` is regenerated after every mutation of
//! `chars`, so drawing and column arithmetic never have to re-expand tabs.

/// One line of text and its visual expansion. `chars` never contains `\n` or
/// `\r`; line terminators belong to the file, not to the row.
pub(crate) struct Row {
    /// The raw bytes of the row.
    pub(crate) chars: Vec<u8>,
    /// The rendered bytes of the row. Identical to `chars`, except that each
    /// tab advances the render column to the next multiple of the tab stop.
    pub(crate) render: Vec<u8>,
}

impl Row {
    pub(crate) fn new(chars: Vec<u8>, tab_stop: usize) -> Self {
        let mut row = Self { chars, render: Vec::new() };
        row.update_render(tab_stop);
        row
    }

    /// Recompute `render` from `chars`.
    pub(crate) fn update_render(&mut self, tab_stop: usize) {
        self.render.clear();
        for &c in &self.chars {
            if c == b'\t' {
                self.render.push(b' ');
                while self.render.len() % tab_stop != 0 {
                    self.render.push(b' ');
                }
            } else {
                self.render.push(c);
            }
        }
    }

    /// Translate an index into `chars` to the corresponding render column.
    pub(crate) fn cx_to_rx(&self, cx: usize, tab_stop: usize) -> usize {
        let mut rx = 0;
        for &c in self.chars.iter().take(cx) {
            if c == b'\t' {
                rx += (tab_stop - 1) - (rx % tab_stop);
            }
            rx += 1;
        }
        rx
    }

    /// Translate a render column back to an index into `chars`. Columns in
    /// the middle of a tab expansion map to the tab itself; columns past the
    /// end of the row map to `chars.len()`.
    pub(crate) fn rx_to_cx(&self, rx: usize, tab_stop: usize) -> usize {
        let mut cur_rx = 0;
        for (cx, &c) in self.chars.iter().enumerate() {
            if c == b'\t' {
                cur_rx += (tab_stop - 1) - (cur_rx % tab_stop);
            }
            cur_rx += 1;
            if cur_rx > rx {
                return cx;
            }
        }
        self.chars.len()
    }

    /// Insert a byte at `at`, clamped to the end of the row.
    pub(crate) fn insert_char(&mut self, at: usize, c: u8, tab_stop: usize) {
        self.chars.insert(at.min(self.chars.len()), c);
        self.update_render(tab_stop);
    }

    /// Delete the byte at `at`. Out-of-range positions are ignored.
    pub(crate) fn delete_char(&mut self, at: usize, tab_stop: usize) {
        if at < self.chars.len() {
            self.chars.remove(at);
            self.update_render(tab_stop);
        }
    }

    /// Append raw bytes to the end of the row.
    pub(crate) fn append(&mut self, s: &[u8], tab_stop: usize) {
        self.chars.extend_from_slice(s);
        self.update_render(tab_stop);
    }

    /// Split the row at `at`, keeping the head and returning the tail.
    pub(crate) fn split_off(&mut self, at: usize, tab_stop: usize) -> Vec<u8> {
        let tail = self.chars.split_off(at);
        self.update_render(tab_stop);
        tail
    }
}
