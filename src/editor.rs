#![allow(clippy::wildcard_imports)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::iter::repeat;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Instant;

use log::debug;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::row::Row;
use crate::{Config, Error, ansi_escape::*, sys, terminal};

const fn ctrl_key(key: u8) -> u8 { key & 0x1f }
const EXIT: u8 = ctrl_key(b'Q');
const DELETE_BIS: u8 = ctrl_key(b'H');
const REFRESH_SCREEN: u8 = ctrl_key(b'L');
const SAVE: u8 = ctrl_key(b'S');
const FIND: u8 = ctrl_key(b'F');
const TOGGLE_WRAP: u8 = ctrl_key(b'W');
const BACKSPACE: u8 = 127;

const HELP_MESSAGE: &str = "^S save | ^Q quit | ^F find | ^W toggle wrap";

/// Maximum display width of the file name in the status bar; longer names are
/// ellipsized.
const MAX_FILE_NAME_WIDTH: usize = 20;

/// `set_status!` sets a formatted status message for the editor.
/// Example usage: `set_status!(editor, "{} written to {}", file_size, file_name)`
macro_rules! set_status { ($editor:expr, $($arg:expr),*) => ($editor.status_msg = Some(StatusMessage::new(format!($($arg),*)))) }

/// Enum of input keys
enum Key {
    Arrow(AKey),
    Page(PageKey),
    Home,
    End,
    Delete,
    Escape,
    Char(u8),
}

/// Enum of arrow keys
enum AKey {
    Left,
    Right,
    Up,
    Down,
}

/// Enum of page keys
enum PageKey {
    Up,
    Down,
}

/// Describes the cursor position and the screen offset
#[derive(Default, Clone)]
struct CursorState {
    /// x position (byte index into the row)
    x: usize,
    /// y position (row number, 0-indexed)
    y: usize,
    /// Row offset
    roff: usize,
    /// Column offset
    coff: usize,
}

impl CursorState {
    fn move_to_next_line(&mut self) { (self.x, self.y) = (0, self.y + 1); }

    /// Scroll the terminal window vertically and horizontally (i.e. adjusting
    /// the row offset and the column offset) so that the cursor can be shown.
    fn scroll(&mut self, rx: usize, screen_rows: usize, screen_cols: usize) {
        self.roff = self.roff.clamp(self.y.saturating_sub(screen_rows.saturating_sub(1)), self.y);
        self.coff = self.coff.clamp(rx.saturating_sub(screen_cols.saturating_sub(1)), rx);
    }
}

/// Direction and progress of an incremental search.
#[derive(Clone, Copy)]
struct FindState {
    /// The row that produced the previous match, if any.
    last_match: Option<usize>,
    /// Whether the next match is looked for below or above the previous one.
    forward: bool,
}

impl Default for FindState {
    fn default() -> Self { Self { last_match: None, forward: true } }
}

/// The `Editor` struct, contains the state and configuration of the text
/// editor.
#[derive(Default)]
pub struct Editor {
    /// If not `None`, the current prompt mode (SaveAs, ConfirmOverwrite,
    /// Find). If `None`, we are in regular edition mode.
    prompt_mode: Option<PromptMode>,
    /// The current state of the cursor.
    cursor: CursorState,
    /// The width of the terminal.
    window_width: usize,
    /// The number of rows that can be used for the editor, excluding the
    /// status bar and the message bar.
    screen_rows: usize,
    /// The number of columns that can be used for the editor, excluding the
    /// line-number gutter.
    screen_cols: usize,
    /// The rows of the buffer.
    rows: Vec<Row>,
    /// Render width of the widest row seen so far, maintained by the row
    /// mutators. Bounds horizontal scrolling.
    max_render_width: usize,
    /// Whether the document has been modified since it was opened or last
    /// saved.
    dirty: bool,
    /// Whether rows are soft-wrapped instead of scrolled horizontally.
    wrap_mode: bool,
    /// The configuration for the editor.
    config: Config,
    /// The number of warnings remaining before quitting with unsaved changes.
    /// Defaults to `config.quit_times`, then decreases to 0.
    quit_times: usize,
    /// The file name. If None, the user will be prompted for a file name the
    /// first time they try to save.
    file_name: Option<String>,
    /// The current status message being shown.
    status_msg: Option<StatusMessage>,
    /// The original terminal mode. It will be restored when the `Editor`
    /// instance is dropped.
    orig_term_mode: Option<sys::TermMode>,
}

/// Describes a status message, shown at the bottom of the screen.
struct StatusMessage {
    /// The message to display.
    msg: String,
    /// The `Instant` the status message was first displayed.
    time: Instant,
}

impl StatusMessage {
    /// Create a new status message and set time to the current date/time.
    fn new(msg: String) -> Self { Self { msg, time: Instant::now() } }
}

/// Pretty-format a size in bytes.
fn format_size(n: u64) -> String {
    if n < 1024 {
        return format!("{n}B");
    }
    // i is the largest value such that 1024 ^ i < n
    // To find i we compute the smallest b such that n <= 1024 ^ b and subtract 1 from it
    let i = (64 - n.leading_zeros() + 9) / 10 - 1;
    // Compute the size with two decimal places (rounded down) as the last two digits of q
    // This avoid float formatting reducing the binary size
    let q = 100 * n / (1024 << ((i - 1) * 10));
    format!("{}.{:02}{}B", q / 100, q % 100, b" kMGTPEZ"[i as usize] as char)
}

/// `slice_find` returns the index of `needle` in slice `s` if `needle` is a
/// subslice of `s`, otherwise returns `None`.
fn slice_find<T: PartialEq>(s: &[T], needle: &[T]) -> Option<usize> {
    (0..(s.len() + 1).saturating_sub(needle.len())).find(|&i| s[i..].starts_with(needle))
}

/// Shorten `name` to at most `max` display columns, appending `...` when a
/// truncation happens.
fn ellipsize(name: &str, max: usize) -> String {
    if UnicodeWidthStr::width(name) <= max {
        return name.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for c in name.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(1);
        if width + w > max.saturating_sub(3) {
            break;
        }
        out.push(c);
        width += w;
    }
    out + "..."
}

impl Editor {
    /// Initialize the text editor.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an error occurs when enabling termios raw mode or
    /// when obtaining the terminal window size.
    pub fn new(config: Config) -> Result<Self, Error> {
        let mut editor = Self::default();
        (editor.quit_times, editor.config) = (config.quit_times, config);

        // Enable raw mode and store the original (non-raw) terminal mode.
        editor.orig_term_mode = Some(sys::enable_raw_mode()?);
        editor.update_window_size()?;

        set_status!(editor, "{}", HELP_MESSAGE);

        Ok(editor)
    }

    /// Return the current row if the cursor points to an existing row, `None`
    /// otherwise.
    fn current_row(&self) -> Option<&Row> { self.rows.get(self.cursor.y) }

    /// Return the position of the cursor in render columns (as opposed to
    /// `self.cursor.x`, which indexes the raw bytes of the row).
    fn rx(&self) -> usize {
        self.current_row().map_or(0, |r| r.cx_to_rx(self.cursor.x, self.config.tab_stop))
    }

    /// Move the cursor following an arrow key (← → ↑ ↓).
    fn move_cursor(&mut self, key: &AKey) {
        match (key, self.current_row()) {
            (AKey::Left, _) if self.cursor.x > 0 => self.cursor.x -= 1,
            // ← at the beginning of the line: move to the end of the previous
            // line. The x position will be clamped after this `match`, so we
            // can set it to the maximum possible value here.
            (AKey::Left, _) if self.cursor.y > 0 => {
                self.cursor.y -= 1;
                self.cursor.x = usize::MAX;
            }
            (AKey::Right, Some(row)) if self.cursor.x < row.chars.len() => self.cursor.x += 1,
            (AKey::Right, Some(_)) => self.cursor.move_to_next_line(),
            (AKey::Up, _) if self.cursor.y > 0 => self.cursor.y -= 1,
            (AKey::Down, Some(_)) => self.cursor.y += 1,
            _ => (),
        }
        self.update_cursor_x_position();
    }

    /// Update the cursor x position. If the cursor y position has changed, the
    /// current position might be illegal (x is further right than the last
    /// character of the row). If that is the case, clamp `self.cursor.x`.
    fn update_cursor_x_position(&mut self) {
        self.cursor.x = self.cursor.x.min(self.current_row().map_or(0, |row| row.chars.len()));
    }

    /// Run a loop to obtain the key that was pressed. When bytes are
    /// received, we match them to a corresponding `Key`. In particular, we
    /// handle ANSI escape sequences to return `Key::Delete`, `Key::Home` etc.
    /// At most three bytes are examined after an ESC; any partial,
    /// unrecognized or timed-out sequence degrades to `Key::Escape`.
    fn loop_until_keypress(&mut self) -> Result<Key, Error> {
        loop {
            let mut bytes = io::stdin().bytes();
            // Match on the next byte received or, if the first byte is <ESC>
            // ('\x1b'), on the next few bytes.
            match bytes.next().transpose()? {
                Some(b'\x1b') => {
                    return Ok(match bytes.next().transpose()? {
                        Some(b @ (b'[' | b'O')) => match (b, bytes.next().transpose()?) {
                            (b'[', Some(b'A')) => Key::Arrow(AKey::Up),
                            (b'[', Some(b'B')) => Key::Arrow(AKey::Down),
                            (b'[', Some(b'C')) => Key::Arrow(AKey::Right),
                            (b'[', Some(b'D')) => Key::Arrow(AKey::Left),
                            (b'[' | b'O', Some(b'H')) => Key::Home,
                            (b'[' | b'O', Some(b'F')) => Key::End,
                            (b'[', Some(c @ b'0'..=b'8')) => match bytes.next().transpose()? {
                                Some(b'~') if c == b'1' || c == b'7' => Key::Home,
                                Some(b'~') if c == b'4' || c == b'8' => Key::End,
                                Some(b'~') if c == b'3' => Key::Delete,
                                Some(b'~') if c == b'5' => Key::Page(PageKey::Up),
                                Some(b'~') if c == b'6' => Key::Page(PageKey::Down),
                                _ => Key::Escape,
                            },
                            _ => Key::Escape,
                        },
                        _ => Key::Escape,
                    });
                }
                Some(a) => return Ok(Key::Char(a)),
                None => continue,
            }
        }
    }

    /// Update the `screen_rows`, `window_width` and `screen_cols` attributes.
    /// Two terminal rows are reserved for the status bar and the message bar,
    /// and `gutter_width` columns for the line numbers.
    fn update_window_size(&mut self) -> Result<(), Error> {
        let wsize = sys::get_window_size().or_else(|_| terminal::get_window_size_using_cursor())?;
        (self.screen_rows, self.window_width) = (wsize.0.saturating_sub(2), wsize.1);
        self.screen_cols = self.window_width.saturating_sub(self.config.gutter_width);
        Ok(())
    }

    /// Insert a row at index `at` and keep `max_render_width` up to date.
    fn insert_row(&mut self, at: usize, chars: Vec<u8>) {
        let row = Row::new(chars, self.config.tab_stop);
        self.max_render_width = self.max_render_width.max(row.render.len());
        self.rows.insert(at, row);
        self.dirty = true;
    }

    /// Refresh `max_render_width` after the row at `y` has grown.
    fn note_row_width(&mut self, y: usize) {
        self.max_render_width = self.max_render_width.max(self.rows[y].render.len());
    }

    /// Insert a byte at the current cursor position. If the cursor sits on
    /// the virtual row past the end of the buffer, materialize a new row
    /// first.
    fn insert_char(&mut self, c: u8) {
        if self.cursor.y == self.rows.len() {
            self.insert_row(self.cursor.y, Vec::new());
        }
        let tab_stop = self.config.tab_stop;
        self.rows[self.cursor.y].insert_char(self.cursor.x, c, tab_stop);
        self.note_row_width(self.cursor.y);
        (self.cursor.x, self.dirty) = (self.cursor.x + 1, true);
    }

    /// Insert a new line at the current cursor position and move the cursor
    /// to the start of the new line. If the cursor is in the middle of a row,
    /// split off that row.
    fn insert_new_line(&mut self) {
        if self.cursor.x == 0 {
            self.insert_row(self.cursor.y, Vec::new());
        } else {
            // The current row must exist, since x = 0 whenever the cursor is
            // on the virtual row.
            let tail = self.rows[self.cursor.y].split_off(self.cursor.x, self.config.tab_stop);
            self.insert_row(self.cursor.y + 1, tail);
        }
        self.cursor.move_to_next_line();
        self.dirty = true;
    }

    /// Delete the character left of the cursor. At the start of a row, merge
    /// the row into the previous one. At the very start of the buffer, or on
    /// the virtual row past the end, this is a no-op.
    fn delete_char(&mut self) {
        if self.cursor.y == self.rows.len() || (self.cursor.x == 0 && self.cursor.y == 0) {
            return;
        }
        if self.cursor.x > 0 {
            let tab_stop = self.config.tab_stop;
            self.rows[self.cursor.y].delete_char(self.cursor.x - 1, tab_stop);
            (self.cursor.x, self.dirty) = (self.cursor.x - 1, true);
        } else {
            let tab_stop = self.config.tab_stop;
            let row = self.rows.remove(self.cursor.y);
            let previous_row = &mut self.rows[self.cursor.y - 1];
            self.cursor.x = previous_row.chars.len();
            previous_row.append(&row.chars, tab_stop);
            self.cursor.y -= 1;
            self.note_row_width(self.cursor.y);
            self.dirty = true;
        }
    }

    /// Load a file into the buffer, one row per line, stripping any trailing
    /// carriage returns. The buffer is clean afterwards.
    fn load(&mut self, path: &Path) -> Result<(), Error> {
        let ft = fs::metadata(path)?.file_type();
        if !(ft.is_file() || ft.is_symlink()) {
            return Err(io::Error::new(ErrorKind::InvalidInput, "Invalid input file type").into());
        }
        for line in BufReader::new(File::open(path)?).split(b'\n') {
            let mut line = line?;
            while line.last() == Some(&b'\r') {
                line.pop();
            }
            let at = self.rows.len();
            self.insert_row(at, line);
        }
        debug!("loaded {} rows from {}", self.rows.len(), path.display());
        self.dirty = false;
        Ok(())
    }

    /// Flatten the buffer: every row followed by a newline, including the
    /// last one.
    fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::new();
        for row in &self.rows {
            data.extend_from_slice(&row.chars);
            data.push(b'\n');
        }
        data
    }

    /// Save the text to a file, given its name: create it with mode 0644 if
    /// needed, truncate it to the exact serialized length and write the
    /// flattened buffer. Returns the number of bytes written.
    fn save(&self, file_name: &str) -> Result<usize, io::Error> {
        let data = self.serialize();
        let mut file =
            OpenOptions::new().write(true).create(true).mode(0o644).open(file_name)?;
        file.set_len(data.len() as u64)?;
        file.write_all(&data)?;
        file.sync_all()?;
        Ok(data.len())
    }

    /// Save the text to a file and handle all errors. Errors and success
    /// messages will be printed to the status bar. Return whether the file
    /// was successfully saved.
    fn save_and_handle_io_errors(&mut self, file_name: &str) -> bool {
        let saved = self.save(file_name);
        match saved.as_ref() {
            Ok(w) => set_status!(self, "{} written to {}", format_size(*w as u64), file_name),
            Err(err) => set_status!(self, "Can't save! I/O error: {}", err),
        }
        // Dirtiness is cleared only by a successful save.
        self.dirty &= saved.is_err();
        saved.is_ok()
    }

    /// Handle Ctrl-S: prompt for a file name if there is none, otherwise try
    /// to save under the current name.
    fn request_save(&mut self) -> Option<PromptMode> {
        match self.file_name.clone() {
            Some(file_name) => self.save_to(file_name),
            None => Some(PromptMode::SaveAs(String::new())),
        }
    }

    /// Save under `file_name`, asking for confirmation first when a file with
    /// that name already exists on disk.
    fn save_to(&mut self, file_name: String) -> Option<PromptMode> {
        if Path::new(&file_name).exists() {
            return Some(PromptMode::ConfirmOverwrite(file_name));
        }
        self.save_and_handle_io_errors(&file_name);
        self.file_name = Some(file_name);
        None
    }

    /// The overwrite prompt was answered with `y`: commit the save.
    fn overwrite_confirmed(&mut self, file_name: String) {
        self.save_and_handle_io_errors(&file_name);
        self.file_name = Some(file_name);
    }

    /// The overwrite prompt was declined: drop the target file name and keep
    /// the buffer (and its dirtiness) untouched.
    fn overwrite_declined(&mut self) {
        self.file_name = None;
        set_status!(self, "Save aborted");
    }

    /// Process a key that has been pressed, when not in prompt mode. Returns
    /// whether the program should exit, and optionally the prompt mode to
    /// switch to.
    fn process_keypress(&mut self, key: &Key) -> (bool, Option<PromptMode>) {
        // This won't be mutated, unless key is Key::Char(EXIT)
        let mut quit_times = self.config.quit_times;
        let mut prompt_mode = None;

        match key {
            Key::Arrow(arrow) => self.move_cursor(arrow),
            Key::Page(PageKey::Up) => {
                self.cursor.y = self.cursor.y.saturating_sub(self.screen_rows);
                self.update_cursor_x_position();
            }
            Key::Page(PageKey::Down) => {
                self.cursor.y = (self.cursor.y + self.screen_rows).min(self.rows.len());
                self.update_cursor_x_position();
            }
            Key::Home => self.cursor.x = 0,
            // On the virtual row past the end of the buffer, End is a no-op.
            Key::End => self.cursor.x = self.current_row().map_or(0, |row| row.chars.len()),
            Key::Char(b'\r') => self.insert_new_line(),
            Key::Char(BACKSPACE | DELETE_BIS) => self.delete_char(),
            Key::Delete => {
                self.move_cursor(&AKey::Right);
                self.delete_char();
            }
            Key::Escape | Key::Char(REFRESH_SCREEN) => (),
            Key::Char(EXIT) => {
                if self.dirty && self.quit_times > 0 {
                    set_status!(
                        self,
                        "WARNING! File has unsaved changes. Press Ctrl-Q {} more time{} to quit.",
                        self.quit_times,
                        if self.quit_times > 1 { "s" } else { "" }
                    );
                    quit_times = self.quit_times - 1;
                } else {
                    return (true, None);
                }
            }
            Key::Char(SAVE) => prompt_mode = self.request_save(),
            Key::Char(FIND) => {
                prompt_mode =
                    Some(PromptMode::Find(String::new(), self.cursor.clone(), FindState::default()));
            }
            Key::Char(TOGGLE_WRAP) => {
                self.wrap_mode = !self.wrap_mode;
                set_status!(self, "Wrap mode {}", if self.wrap_mode { "on" } else { "off" });
            }
            Key::Char(c) if !c.is_ascii_control() => self.insert_char(*c),
            Key::Char(_) => (),
        }
        self.quit_times = quit_times;
        (false, prompt_mode)
    }

    /// Look for the next match of `query`, starting from the state of the
    /// previous search. Rows are visited at most once per call, wrapping
    /// around the buffer; within the row that produced the previous match the
    /// scan is bounded by the previous match column, so several matches on
    /// one row are visited in turn. On a hit the cursor moves to the match
    /// and the matching row index is returned.
    fn find_next(&mut self, query: &[u8], state: &FindState) -> Option<usize> {
        if query.is_empty() || self.rows.is_empty() {
            return None;
        }
        let count = self.rows.len();
        let tab_stop = self.config.tab_stop;
        // Render column of the cursor; on the last-match row the cursor sits
        // on the previous match, so this bounds the in-row scan.
        let cursor_rx = self.rx();
        let dir: isize = if state.forward { 1 } else { -1 };
        let mut current = state.last_match.map_or(-1, |y| y as isize);
        if current == -1 && state.forward {
            current = 0;
        }
        for _ in 0..count {
            current = current.rem_euclid(count as isize);
            let y = current as usize;
            let render = &self.rows[y].render;
            let hit = if state.forward {
                let start = if state.last_match == Some(y) { cursor_rx + 1 } else { 0 };
                (start <= render.len())
                    .then(|| slice_find(&render[start..], query).map(|rx| rx + start))
                    .flatten()
            } else {
                let bound = if state.last_match == Some(y) { cursor_rx } else { render.len() };
                (0..bound.min(render.len()))
                    .rev()
                    .find(|&rx| render[rx..].starts_with(query))
            };
            if let Some(rx) = hit {
                self.cursor.y = y;
                self.cursor.x = self.rows[y].rx_to_cx(rx, tab_stop);
                // Reset the column offset; scroll() will bring the match back
                // into view.
                self.cursor.coff = 0;
                return Some(y);
            }
            current += dir;
        }
        None
    }

    /// Number of screen lines the row at `y` occupies in wrap mode.
    fn wrapped_lines(&self, y: usize) -> usize {
        let width = self.screen_cols.max(1);
        self.rows.get(y).map_or(1, |row| row.render.len().div_ceil(width).max(1))
    }

    /// Emit the line-number gutter: colored background, right-aligned line
    /// number (blank for rows past the end of the buffer and for wrap
    /// continuation lines), one trailing space.
    fn draw_gutter(&self, buffer: &mut Vec<u8>, line_num: Option<usize>) -> Result<(), Error> {
        let (r, g, b) = self.config.gutter_bg;
        write!(buffer, "\x1b[48;2;{r};{g};{b}m")?;
        let num_width = self.config.gutter_width - 1;
        match line_num {
            Some(n) => write!(buffer, "{n:>num_width$} ")?,
            None => buffer.extend(repeat(b' ').take(self.config.gutter_width)),
        }
        buffer.extend_from_slice(RESET_BG.as_bytes());
        Ok(())
    }

    /// Center the welcome banner on an empty buffer, with a `~` in the first
    /// column like any other row past the end.
    fn draw_welcome(&self, buffer: &mut Vec<u8>) {
        let welcome = concat!("tte editor -- version ", env!("CARGO_PKG_VERSION"));
        let len = welcome.len().min(self.screen_cols);
        let mut padding = (self.screen_cols - len) / 2;
        if padding > 0 {
            buffer.push(b'~');
            padding -= 1;
        }
        buffer.extend(repeat(b' ').take(padding));
        buffer.extend_from_slice(&welcome.as_bytes()[..len]);
    }

    /// Draw the visible rows into the frame buffer: the gutter, then either
    /// the row slice under the current offsets, a `~` for rows past the end,
    /// or the welcome banner on the middle row of an empty buffer.
    fn draw_rows(&self, buffer: &mut Vec<u8>) -> Result<(), Error> {
        if self.wrap_mode {
            return self.draw_rows_wrapped(buffer);
        }
        for i in 0..self.screen_rows {
            match self.rows.get(self.cursor.roff + i) {
                Some(row) => {
                    self.draw_gutter(buffer, Some(self.cursor.roff + i + 1))?;
                    buffer.extend_from_slice(CLEAR_LINE_RIGHT_OF_CURSOR.as_bytes());
                    let start = self.cursor.coff.min(row.render.len());
                    let end = (self.cursor.coff + self.screen_cols).min(row.render.len());
                    buffer.extend_from_slice(&row.render[start..end]);
                }
                None => {
                    self.draw_gutter(buffer, None)?;
                    buffer.extend_from_slice(CLEAR_LINE_RIGHT_OF_CURSOR.as_bytes());
                    if self.rows.is_empty() && i == self.screen_rows / 2 {
                        self.draw_welcome(buffer);
                    } else {
                        buffer.push(b'~');
                    }
                }
            }
            buffer.extend_from_slice(b"\r\n");
        }
        Ok(())
    }

    /// Draw rows in soft-wrap mode: each row is emitted in
    /// `screen_cols`-wide chunks, one screen line per chunk. Never emits more
    /// than `screen_rows` lines; a wrapped row that would overflow the bottom
    /// of the viewport is truncated.
    fn draw_rows_wrapped(&self, buffer: &mut Vec<u8>) -> Result<(), Error> {
        let width = self.screen_cols.max(1);
        let mut lines = 0;
        let mut y = self.cursor.roff;
        while lines < self.screen_rows {
            if let Some(row) = self.rows.get(y) {
                let mut start = 0;
                while lines < self.screen_rows {
                    let end = (start + width).min(row.render.len());
                    self.draw_gutter(buffer, (start == 0).then_some(y + 1))?;
                    buffer.extend_from_slice(CLEAR_LINE_RIGHT_OF_CURSOR.as_bytes());
                    buffer.extend_from_slice(&row.render[start..end]);
                    buffer.extend_from_slice(b"\r\n");
                    lines += 1;
                    start = end;
                    if start >= row.render.len() {
                        break;
                    }
                }
            } else {
                self.draw_gutter(buffer, None)?;
                buffer.extend_from_slice(CLEAR_LINE_RIGHT_OF_CURSOR.as_bytes());
                if self.rows.is_empty() && lines == self.screen_rows / 2 {
                    self.draw_welcome(buffer);
                } else {
                    buffer.push(b'~');
                }
                buffer.extend_from_slice(b"\r\n");
                lines += 1;
            }
            y += 1;
        }
        Ok(())
    }

    /// Draw the status bar: dirty flag and (ellipsized) file name on the
    /// left, `<line:column ` on the right, the whole line in reverse video.
    fn draw_status_bar(&self, buffer: &mut Vec<u8>) -> Result<(), Error> {
        let (dirty_flag, name) = match self.file_name.as_deref() {
            Some(name) => {
                (if self.dirty { '*' } else { ' ' }, ellipsize(name, MAX_FILE_NAME_WIDTH))
            }
            None => (' ', "[NO Name]".to_string()),
        };
        let left: String = format!("{dirty_flag}{name}").chars().take(self.window_width).collect();
        let right = format!("<{}:{} ", self.cursor.y + 1, self.rx() + 1);
        let rw = self.window_width.saturating_sub(UnicodeWidthStr::width(left.as_str()));
        write!(buffer, "{REVERSE_VIDEO}{left}{right:>rw$.rw$}{RESET_FMT}\r\n")?;
        Ok(())
    }

    /// Draw the message bar: a leading space then the status message, shown
    /// only while it is less than `message_dur` old.
    fn draw_message_bar(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(CLEAR_LINE_RIGHT_OF_CURSOR.as_bytes());
        let message_dur = self.config.message_dur;
        if let Some(sm) = self.status_msg.as_ref().filter(|sm| sm.time.elapsed() < message_dur) {
            buffer.push(b' ');
            let msg: String = sm.msg.chars().take(self.window_width.saturating_sub(1)).collect();
            buffer.extend_from_slice(msg.as_bytes());
        }
    }

    /// Compute the 1-based screen coordinates at which to place the terminal
    /// cursor for the current frame.
    fn cursor_screen_position(&self, rx: usize) -> (usize, usize) {
        if self.prompt_mode.is_some() {
            // While prompting, the cursor sits at the end of the prompt line
            // in the message bar.
            let col =
                self.status_msg.as_ref().map_or(1, |sm| UnicodeWidthStr::width(sm.msg.as_str()) + 2);
            return (self.screen_rows + 2, col);
        }
        if self.wrap_mode {
            let width = self.screen_cols.max(1);
            let mut line = rx / width;
            for y in self.cursor.roff..self.cursor.y {
                line += self.wrapped_lines(y);
            }
            let row = line.min(self.screen_rows.saturating_sub(1)) + 1;
            return (row, rx % width + 1 + self.config.gutter_width);
        }
        (
            self.cursor.y - self.cursor.roff + 1,
            rx - self.cursor.coff + 1 + self.config.gutter_width,
        )
    }

    /// Refresh the screen: update the offsets, stage one frame in the append
    /// buffer (hide cursor, home, rows, status bar, message bar, cursor
    /// position, show cursor) and emit it in a single write.
    fn refresh_screen(&mut self) -> Result<(), Error> {
        let rx = self.rx();
        self.cursor.coff = self.cursor.coff.min(self.max_render_width);
        self.cursor.scroll(rx, self.screen_rows, self.screen_cols);
        let mut buffer = Vec::new();
        write!(buffer, "{HIDE_CURSOR}{MOVE_CURSOR_TO_START}")?;
        self.draw_rows(&mut buffer)?;
        self.draw_status_bar(&mut buffer)?;
        self.draw_message_bar(&mut buffer);
        let (cursor_row, cursor_col) = self.cursor_screen_position(rx);
        write!(buffer, "\x1b[{cursor_row};{cursor_col}H{SHOW_CURSOR}")?;
        let mut stdout = io::stdout();
        stdout.write_all(&buffer)?;
        stdout.flush().map_err(Error::from)
    }

    /// If `file_name` is not None, load the file. Then run the text editor.
    ///
    /// # Errors
    ///
    /// Will return `Err` if any error occurs.
    pub fn run(&mut self, file_name: Option<&str>) -> Result<(), Error> {
        if let Some(path) = file_name {
            self.load(Path::new(path))?;
            self.file_name = Some(path.to_string());
        }
        loop {
            if let Some(mode) = self.prompt_mode.as_ref() {
                set_status!(self, "{}", mode.status_msg());
            }
            self.refresh_screen()?;
            let key = self.loop_until_keypress()?;
            debug!("cursor=({}, {}) dirty={}", self.cursor.x, self.cursor.y, self.dirty);
            self.prompt_mode = match self.prompt_mode.take() {
                // process_keypress returns (should_quit, prompt_mode)
                None => match self.process_keypress(&key) {
                    (true, _) => return Ok(()),
                    (false, prompt_mode) => prompt_mode,
                },
                Some(prompt_mode) => prompt_mode.process_keypress(self, &key),
            };
        }
    }
}

impl Drop for Editor {
    /// When the editor is dropped, restore the original terminal mode. Safe
    /// to run more than once: the mode is restored only the first time.
    fn drop(&mut self) {
        if let Some(orig_term_mode) = self.orig_term_mode.take() {
            sys::set_term_mode(&orig_term_mode).expect("Could not restore original terminal mode.");
        }
        if !std::thread::panicking() {
            print!("{CLEAR_SCREEN}{MOVE_CURSOR_TO_START}");
            io::stdout().flush().expect("Could not flush stdout");
        }
    }
}

/// The prompt mode.
enum PromptMode {
    /// SaveAs(prompt buffer)
    SaveAs(String),
    /// ConfirmOverwrite(target file name): single-key `y`/`Y` confirmation
    /// before replacing a file that already exists on disk.
    ConfirmOverwrite(String),
    /// Find(prompt buffer, saved cursor state, search state)
    Find(String, CursorState, FindState),
}

impl PromptMode {
    /// Return the status message to print for the selected `PromptMode`.
    fn status_msg(&self) -> String {
        match self {
            Self::SaveAs(buffer) => format!("Save as (ESC to cancel): {buffer}"),
            Self::ConfirmOverwrite(file_name) => {
                format!("File {file_name} exists. Overwrite? (y/n)")
            }
            Self::Find(buffer, ..) => format!("Search (Use ESC/Arrows/Enter): {buffer}"),
        }
    }

    /// Process a keypress event for the selected `PromptMode`.
    fn process_keypress(self, ed: &mut Editor, key: &Key) -> Option<Self> {
        ed.status_msg = None;
        match self {
            Self::SaveAs(b) => match process_prompt_keypress(b, key) {
                PromptState::Active(b) => return Some(Self::SaveAs(b)),
                PromptState::Cancelled => set_status!(ed, "Save aborted"),
                PromptState::Completed(file_name) => return ed.save_to(file_name),
            },
            Self::ConfirmOverwrite(file_name) => match key {
                Key::Char(b'y' | b'Y') => ed.overwrite_confirmed(file_name),
                _ => ed.overwrite_declined(),
            },
            Self::Find(b, saved_cursor, state) => match process_prompt_keypress(b, key) {
                PromptState::Active(query) => {
                    let state = match key {
                        Key::Arrow(AKey::Right | AKey::Down) => FindState { forward: true, ..state },
                        Key::Arrow(AKey::Left | AKey::Up) => FindState { forward: false, ..state },
                        // Any other key (including the query edits) restarts
                        // the search from the top of the buffer.
                        _ => FindState::default(),
                    };
                    let last_match = ed.find_next(query.as_bytes(), &state);
                    return Some(Self::Find(query, saved_cursor, FindState { last_match, ..state }));
                }
                // The prompt was cancelled. Restore the pre-search position.
                PromptState::Cancelled => ed.cursor = saved_cursor,
                // The cursor already sits on the match, nothing left to do.
                PromptState::Completed(_) => (),
            },
        }
        None
    }
}

/// The state of the prompt after processing a keypress event.
enum PromptState {
    /// Active contains the current buffer
    Active(String),
    /// Completed contains the final string
    Completed(String),
    Cancelled,
}

/// Process a prompt keypress event and return the new state for the prompt.
/// Enter accepts a non-empty buffer, ESC (or Ctrl-Q) cancels,
/// Backspace/Ctrl-H/Delete shrink the buffer, and printable bytes below 128
/// are appended.
fn process_prompt_keypress(mut buffer: String, key: &Key) -> PromptState {
    match key {
        Key::Char(b'\r') if !buffer.is_empty() => return PromptState::Completed(buffer),
        Key::Escape | Key::Char(EXIT) => return PromptState::Cancelled,
        Key::Char(BACKSPACE | DELETE_BIS) | Key::Delete => _ = buffer.pop(),
        Key::Char(c @ 0..=127) if !c.is_ascii_control() => buffer.push(*c as char),
        // No-op
        _ => (),
    }
    PromptState::Active(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an in-memory editor (no terminal) holding the given lines.
    fn editor_with_rows(lines: &[&[u8]]) -> Editor {
        let mut editor = Editor::default();
        for line in lines {
            let at = editor.rows.len();
            editor.insert_row(at, line.to_vec());
        }
        editor.dirty = false;
        editor
    }

    #[test]
    fn format_size_output() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1024), "1.00kB");
        assert_eq!(format_size(1536), "1.50kB");
        // round down!
        assert_eq!(format_size(21 * 1024 - 11), "20.98kB");
        assert_eq!(format_size(1024 * 1024 - 1), "1023.99kB");
        assert_eq!(format_size(1024 * 1024), "1.00MB");
        assert_eq!(format_size(100 * 1024 * 1024 * 1024), "100.00GB");
    }

    #[test]
    fn ellipsize_bounds_display_width() {
        assert_eq!(ellipsize("short.txt", 20), "short.txt");
        assert_eq!(ellipsize("a_very_long_file_name_indeed.txt", 20), "a_very_long_file_...");
    }

    #[test]
    fn insert_at_virtual_row_materializes_row() {
        let mut editor = Editor::default();
        let editor_cursor_x_before = editor.cursor.x;

        editor.insert_char(b'X');
        editor.insert_char(b'Y');
        editor.insert_char(b'Z');

        assert_eq!(editor.cursor.x, editor_cursor_x_before + 3);
        assert_eq!(editor.rows.len(), 1);
        assert_eq!(editor.rows[0].chars, b"XYZ");
        assert!(editor.dirty);
    }

    #[test]
    fn split_and_join_row() {
        let mut editor = editor_with_rows(&[b"hello world"]);
        (editor.cursor.x, editor.cursor.y) = (6, 0);

        editor.insert_new_line();
        assert_eq!(editor.rows.len(), 2);
        assert_eq!(editor.rows[0].chars, b"hello ");
        assert_eq!(editor.rows[1].chars, b"world");
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 1));
        assert!(editor.dirty);

        editor.delete_char();
        assert_eq!(editor.rows.len(), 1);
        assert_eq!(editor.rows[0].chars, b"hello world");
        assert_eq!((editor.cursor.x, editor.cursor.y), (6, 0));
    }

    #[test]
    fn newline_at_column_zero_inserts_row_above() {
        let mut editor = editor_with_rows(&[b"abc"]);
        editor.insert_new_line();
        assert_eq!(editor.rows.len(), 2);
        assert_eq!(editor.rows[0].chars, b"");
        assert_eq!(editor.rows[1].chars, b"abc");
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 1));
    }

    #[test]
    fn delete_at_buffer_boundaries_is_noop() {
        let mut editor = editor_with_rows(&[b"ab"]);
        editor.delete_char();
        assert_eq!(editor.rows[0].chars, b"ab");
        assert!(!editor.dirty);

        // Virtual row past the end of the buffer.
        editor.cursor.y = 1;
        editor.delete_char();
        assert_eq!(editor.rows.len(), 1);
        assert!(!editor.dirty);
    }

    #[test]
    fn move_cursor_wraps_between_rows() {
        let mut editor = editor_with_rows(&[b"ab", b"cd"]);

        editor.cursor.y = 1;
        editor.move_cursor(&AKey::Left);
        assert_eq!((editor.cursor.x, editor.cursor.y), (2, 0));

        editor.move_cursor(&AKey::Right);
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 1));

        // Right at the end of the last row moves onto the virtual row; another
        // Right is ignored there.
        (editor.cursor.x, editor.cursor.y) = (2, 1);
        editor.move_cursor(&AKey::Right);
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 2));
        editor.move_cursor(&AKey::Right);
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 2));
        editor.move_cursor(&AKey::Down);
        assert_eq!(editor.cursor.y, 2);
    }

    #[test]
    fn vertical_moves_snap_x_to_row_length() {
        let mut editor = editor_with_rows(&[b"abcd", b"x"]);
        editor.cursor.x = 4;
        editor.move_cursor(&AKey::Down);
        assert_eq!((editor.cursor.x, editor.cursor.y), (1, 1));
    }

    #[test]
    fn end_key_is_noop_on_virtual_row() {
        let mut editor = editor_with_rows(&[b"ab"]);
        editor.cursor.y = 1;
        let (quit, _) = editor.process_keypress(&Key::End);
        assert!(!quit);
        assert_eq!(editor.cursor.x, 0);
    }

    #[test]
    fn page_keys_jump_by_screen_and_clamp() {
        let mut editor = editor_with_rows(&vec![&b"x"[..]; 25]);
        editor.screen_rows = 10;
        editor.process_keypress(&Key::Page(PageKey::Down));
        assert_eq!(editor.cursor.y, 10);
        editor.process_keypress(&Key::Page(PageKey::Down));
        editor.process_keypress(&Key::Page(PageKey::Down));
        assert_eq!(editor.cursor.y, 25);
        for _ in 0..4 {
            editor.process_keypress(&Key::Page(PageKey::Up));
        }
        assert_eq!(editor.cursor.y, 0);
    }

    #[test]
    fn dirty_quit_requires_three_warnings() {
        let mut editor = Editor::default();
        editor.quit_times = editor.config.quit_times;
        editor.insert_char(b'x');
        assert!(editor.dirty);

        for remaining in [2, 1, 0] {
            let (quit, _) = editor.process_keypress(&Key::Char(EXIT));
            assert!(!quit);
            assert!(editor.status_msg.is_some());
            assert_eq!(editor.quit_times, remaining);
        }
        let (quit, _) = editor.process_keypress(&Key::Char(EXIT));
        assert!(quit);
    }

    #[test]
    fn quit_counter_resets_on_other_keys() {
        let mut editor = Editor::default();
        editor.quit_times = editor.config.quit_times;
        editor.insert_char(b'x');
        editor.process_keypress(&Key::Char(EXIT));
        editor.process_keypress(&Key::Char(EXIT));
        assert_eq!(editor.quit_times, 1);
        editor.process_keypress(&Key::Arrow(AKey::Left));
        assert_eq!(editor.quit_times, editor.config.quit_times);
    }

    #[test]
    fn clean_buffer_quits_immediately() {
        let mut editor = editor_with_rows(&[b"ab"]);
        editor.quit_times = editor.config.quit_times;
        let (quit, _) = editor.process_keypress(&Key::Char(EXIT));
        assert!(quit);
    }

    #[test]
    fn scroll_keeps_cursor_visible() {
        let mut editor = editor_with_rows(&vec![&b"0123456789012345678901234"[..]; 40]);
        (editor.screen_rows, editor.screen_cols) = (5, 10);

        (editor.cursor.x, editor.cursor.y) = (20, 25);
        let rx = editor.rx();
        editor.cursor.scroll(rx, editor.screen_rows, editor.screen_cols);
        assert!(editor.cursor.roff <= 25 && 25 < editor.cursor.roff + 5);
        assert!(editor.cursor.coff <= rx && rx < editor.cursor.coff + 10);

        (editor.cursor.x, editor.cursor.y) = (0, 2);
        editor.cursor.scroll(editor.rx(), 5, 10);
        assert_eq!(editor.cursor.roff, 2);
        assert_eq!(editor.cursor.coff, 0);
    }

    #[test]
    fn forward_search_wraps_around() {
        let mut editor = editor_with_rows(&[b"foo", b"bar", b"foo"]);

        let state = FindState::default();
        let last_match = editor.find_next(b"foo", &state);
        assert_eq!(last_match, Some(0));
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 0));

        let state = FindState { last_match, forward: true };
        let last_match = editor.find_next(b"foo", &state);
        assert_eq!(last_match, Some(2));
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 2));

        let state = FindState { last_match, forward: true };
        assert_eq!(editor.find_next(b"foo", &state), Some(0));
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 0));
    }

    #[test]
    fn backward_search_finds_previous_match() {
        let mut editor = editor_with_rows(&[b"foo", b"bar", b"foo"]);
        (editor.cursor.x, editor.cursor.y) = (0, 2);

        let state = FindState { last_match: Some(2), forward: false };
        assert_eq!(editor.find_next(b"foo", &state), Some(0));
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 0));
    }

    #[test]
    fn search_visits_multiple_matches_per_row() {
        let mut editor = editor_with_rows(&[b"foofoo"]);

        let state = FindState::default();
        let last_match = editor.find_next(b"foo", &state);
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 0));

        let state = FindState { last_match, forward: true };
        let last_match = editor.find_next(b"foo", &state);
        assert_eq!(last_match, Some(0));
        assert_eq!((editor.cursor.x, editor.cursor.y), (3, 0));

        // The only row was already scanned past its last match: no hit, the
        // cursor stays put.
        let state = FindState { last_match, forward: true };
        assert_eq!(editor.find_next(b"foo", &state), None);
        assert_eq!((editor.cursor.x, editor.cursor.y), (3, 0));
    }

    #[test]
    fn search_matches_rendered_tabs() {
        let mut editor = editor_with_rows(&[b"a\tfoo"]);
        let state = FindState::default();
        assert_eq!(editor.find_next(b"foo", &state), Some(0));
        // The match starts at render column 4, which is byte 2 of the row.
        assert_eq!((editor.cursor.x, editor.cursor.y), (2, 0));
    }

    #[test]
    fn escape_restores_cursor_after_search() {
        let mut editor = editor_with_rows(&[b"foo", b"bar", b"foo"]);
        (editor.cursor.x, editor.cursor.y) = (1, 1);

        let mut mode = PromptMode::Find(String::new(), editor.cursor.clone(), FindState::default());
        for key in [Key::Char(b'f'), Key::Char(b'o'), Key::Char(b'o')] {
            mode = mode.process_keypress(&mut editor, &key).unwrap();
        }
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 0));

        assert!(mode.process_keypress(&mut editor, &Key::Escape).is_none());
        assert_eq!((editor.cursor.x, editor.cursor.y), (1, 1));
    }

    #[test]
    fn search_direction_follows_arrow_keys() {
        let mut editor = editor_with_rows(&[b"foo", b"bar", b"foo"]);
        let mut mode = PromptMode::Find(String::new(), editor.cursor.clone(), FindState::default());
        for key in [Key::Char(b'f'), Key::Char(b'o'), Key::Char(b'o')] {
            mode = mode.process_keypress(&mut editor, &key).unwrap();
        }
        mode = mode.process_keypress(&mut editor, &Key::Arrow(AKey::Down)).unwrap();
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 2));
        mode = mode.process_keypress(&mut editor, &Key::Arrow(AKey::Up)).unwrap();
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 0));
        // Enter accepts in place.
        assert!(mode.process_keypress(&mut editor, &Key::Char(b'\r')).is_none());
        assert_eq!((editor.cursor.x, editor.cursor.y), (0, 0));
    }

    #[test]
    fn load_splits_lines_and_strips_carriage_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, b"one\r\ntwo\nlast\n").unwrap();

        let mut editor = Editor::default();
        editor.load(&path).unwrap();
        assert_eq!(editor.rows.len(), 3);
        assert_eq!(editor.rows[0].chars, b"one");
        assert_eq!(editor.rows[1].chars, b"two");
        assert_eq!(editor.rows[2].chars, b"last");
        assert!(!editor.dirty);
    }

    #[test]
    fn load_of_missing_file_fails() {
        let mut editor = Editor::default();
        assert!(editor.load(Path::new("/nonexistent/file.txt")).is_err());
    }

    #[test]
    fn save_writes_rows_with_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut editor = editor_with_rows(&[b"hello", b"world"]);
        editor.dirty = true;
        editor.file_name = Some(path.to_string_lossy().into_owned());

        assert!(editor.request_save().is_none());
        assert_eq!(fs::read(&path).unwrap(), b"hello\nworld\n");
        assert!(!editor.dirty);
    }

    #[test]
    fn open_save_round_trip_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let (src, dst) = (dir.path().join("src.txt"), dir.path().join("dst.txt"));
        fs::write(&src, b"a\n\tb\n\n").unwrap();

        let mut editor = Editor::default();
        editor.load(&src).unwrap();
        editor.file_name = Some(dst.to_string_lossy().into_owned());
        assert!(editor.request_save().is_none());
        assert_eq!(fs::read(&dst).unwrap(), fs::read(&src).unwrap());
    }

    #[test]
    fn saving_twice_writes_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut editor = editor_with_rows(&[b"same", b"bytes"]);
        editor.file_name = Some(path.to_string_lossy().into_owned());

        assert!(editor.request_save().is_none());
        let first = fs::read(&path).unwrap();

        // The file now exists, so saving again requires a confirmation.
        let mode = editor.request_save().unwrap();
        assert!(mode.process_keypress(&mut editor, &Key::Char(b'y')).is_none());
        assert_eq!(fs::read(&path).unwrap(), first);
        assert!(!editor.dirty);
    }

    #[test]
    fn declined_overwrite_leaves_file_and_dirty_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, b"original\n").unwrap();

        let mut editor = editor_with_rows(&[b"changed"]);
        editor.dirty = true;
        editor.file_name = Some(path.to_string_lossy().into_owned());

        let mode = editor.request_save().unwrap();
        assert!(matches!(mode, PromptMode::ConfirmOverwrite(_)));
        assert!(mode.process_keypress(&mut editor, &Key::Char(b'n')).is_none());

        assert_eq!(fs::read(&path).unwrap(), b"original\n");
        assert!(editor.dirty);
        assert!(editor.file_name.is_none());
        assert!(editor.status_msg.as_ref().unwrap().msg.contains("Save aborted"));
    }

    #[test]
    fn save_as_prompt_collects_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompted.txt");
        let mut editor = editor_with_rows(&[b"data"]);
        editor.dirty = true;

        let mut mode = editor.request_save().unwrap();
        assert!(matches!(mode, PromptMode::SaveAs(_)));
        for b in path.to_string_lossy().bytes() {
            mode = mode.process_keypress(&mut editor, &Key::Char(b)).unwrap();
        }
        assert!(mode.process_keypress(&mut editor, &Key::Char(b'\r')).is_none());

        assert_eq!(fs::read(&path).unwrap(), b"data\n");
        assert_eq!(editor.file_name.as_deref(), Some(&*path.to_string_lossy()));
        assert!(!editor.dirty);
    }

    #[test]
    fn prompt_backspace_and_cancel() {
        let state = process_prompt_keypress("ab".to_string(), &Key::Char(BACKSPACE));
        assert!(matches!(state, PromptState::Active(ref b) if b == "a"));
        // Enter on an empty buffer keeps the prompt open.
        let state = process_prompt_keypress(String::new(), &Key::Char(b'\r'));
        assert!(matches!(state, PromptState::Active(_)));
        let state = process_prompt_keypress("ab".to_string(), &Key::Escape);
        assert!(matches!(state, PromptState::Cancelled));
        // Control bytes are not appended.
        let state = process_prompt_keypress(String::new(), &Key::Char(0x01));
        assert!(matches!(state, PromptState::Active(ref b) if b.is_empty()));
    }

    #[test]
    fn wrapped_line_counts() {
        let mut editor = editor_with_rows(&[b"", b"0123456789", b"01234567890"]);
        editor.screen_cols = 10;
        assert_eq!(editor.wrapped_lines(0), 1);
        assert_eq!(editor.wrapped_lines(1), 1);
        assert_eq!(editor.wrapped_lines(2), 2);
        // Rows past the end of the buffer occupy a single `~` line.
        assert_eq!(editor.wrapped_lines(99), 1);
    }

    #[test]
    fn wrap_mode_never_overflows_screen_rows() {
        let long = [b'x'; 100];
        let mut editor = editor_with_rows(&[&long[..], b"next"]);
        (editor.screen_rows, editor.screen_cols, editor.window_width) = (3, 10, 15);
        editor.wrap_mode = true;

        let mut frame = Vec::new();
        editor.draw_rows(&mut frame).unwrap();
        let lines = frame.iter().filter(|&&b| b == b'\n').count();
        assert_eq!(lines, 3);
    }

    #[test]
    fn status_bar_without_filename() {
        let mut editor = Editor::default();
        editor.window_width = 40;
        let mut frame = Vec::new();
        editor.draw_status_bar(&mut frame).unwrap();
        let bar = String::from_utf8(frame).unwrap();
        assert!(bar.contains(" [NO Name]"));
        assert!(bar.contains("<1:1 "));
    }

    #[test]
    fn status_bar_marks_dirty_named_buffer() {
        let mut editor = editor_with_rows(&[b"x"]);
        editor.window_width = 40;
        editor.file_name = Some("notes.txt".to_string());
        editor.dirty = true;
        (editor.cursor.x, editor.cursor.y) = (1, 0);
        let mut frame = Vec::new();
        editor.draw_status_bar(&mut frame).unwrap();
        let bar = String::from_utf8(frame).unwrap();
        assert!(bar.contains("*notes.txt"));
        assert!(bar.contains("<1:2 "));
    }

    #[test]
    fn message_bar_shows_recent_message() {
        let mut editor = Editor::default();
        editor.window_width = 80;
        set_status!(editor, "hello there");
        let mut frame = Vec::new();
        editor.draw_message_bar(&mut frame);
        assert!(String::from_utf8(frame).unwrap().contains(" hello there"));
    }

    #[test]
    fn tab_row_maps_cursor_columns() {
        let editor = {
            let mut ed = editor_with_rows(&[b"A\tB"]);
            ed.cursor.x = 2;
            ed
        };
        assert_eq!(editor.rows[0].render, b"A   B");
        assert_eq!(editor.rx(), 4);
    }
}
