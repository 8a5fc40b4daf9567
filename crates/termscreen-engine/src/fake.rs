//! A scriptable in-memory engine for tests.
//!
//! `FakeEngine` implements [`TerminalEngine`] over a plain cell grid. It is
//! not a VT interpreter: `feed_bytes` understands printable text, CR/LF, BEL
//! and the OSC introducers, which is enough to drive the session layer
//! end-to-end. Tests that need finer control script the engine directly
//! through the painting and event-emission helpers; clones share the same
//! underlying grid, so a test can keep a handle after handing the engine to
//! a session.

use std::sync::{Arc, Mutex};

use tracing::debug;
use unicode_width::UnicodeWidthChar;

use termscreen_core::{Cell, CellAttributes, Color, DamageRegion, Dimensions, Position};

use crate::adapter::{CellRun, TerminalEngine};
use crate::events::{EngineCallbacks, TermProp};
use crate::input::{KeyCode, Modifiers};

/// Upper bound on cell-run length, in UTF-16 units.
const RUN_LIMIT: usize = 256;

/// Internal marker for the trailing column of a wide cell. Never crosses the
/// engine boundary: cell runs and scrollback pushes skip it.
const PLACEHOLDER: char = '\0';

#[derive(Debug)]
enum ParseState {
    Ground,
    Escape,
    Osc { buf: String, esc: bool },
}

struct Inner {
    dims: Dimensions,
    scrollback_capacity: usize,
    cells: Vec<Cell>,
    cursor: Position,
    reported_cursor: Position,
    cursor_visible: bool,
    default_fg: Color,
    default_bg: Color,
    palette: [Color; 16],
    callbacks: Option<Arc<dyn EngineCallbacks>>,
    parse: ParseState,
    touched: Option<DamageRegion>,
    cursor_moved: bool,
    last_base: Option<usize>,
}

/// Scriptable in-memory terminal engine.
#[derive(Clone)]
pub struct FakeEngine {
    inner: Arc<Mutex<Inner>>,
}

impl FakeEngine {
    /// Create an engine with a blank grid of the given size.
    pub fn new(rows: u16, cols: u16) -> Self {
        let dims = Dimensions::new(rows, cols);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                dims,
                scrollback_capacity: 1000,
                cells: vec![Cell::default(); dims.cell_count()],
                cursor: Position::origin(),
                reported_cursor: Position::origin(),
                cursor_visible: true,
                default_fg: Color::WHITE,
                default_bg: Color::BLACK,
                palette: [Color::BLACK; 16],
                callbacks: None,
                parse: ParseState::Ground,
                touched: None,
                cursor_moved: false,
                last_base: None,
            })),
        }
    }

    /// Paint text at a position without raising events, using default colors.
    pub fn paint_text(&self, row: u16, col: u16, text: &str) {
        let mut inner = self.inner.lock().unwrap();
        let (fg, bg) = (inner.default_fg, inner.default_bg);
        inner.paint(row, col, text, fg, bg, CellAttributes::default());
    }

    /// Paint styled text at a position without raising events.
    pub fn paint_styled(
        &self,
        row: u16,
        col: u16,
        text: &str,
        fg: Color,
        bg: Color,
        attrs: CellAttributes,
    ) {
        self.inner
            .lock()
            .unwrap()
            .paint(row, col, text, fg, bg, attrs);
    }

    /// Move the cursor and raise the corresponding event.
    pub fn move_cursor_to(&self, row: u16, col: u16) {
        let mut inner = self.inner.lock().unwrap();
        let old = inner.reported_cursor;
        inner.cursor = Position::new(row, col);
        inner.reported_cursor = inner.cursor;
        let visible = inner.cursor_visible;
        if let Some(cb) = inner.callbacks.clone() {
            cb.on_move_cursor(Position::new(row, col), old, visible);
        }
    }

    /// Raise a damage event for a region.
    pub fn emit_damage(&self, region: DamageRegion) {
        let inner = self.inner.lock().unwrap();
        if let Some(cb) = inner.callbacks.clone() {
            cb.on_damage(region);
        }
    }

    /// Raise a property-change event.
    pub fn emit_prop(&self, prop: TermProp) {
        let inner = self.inner.lock().unwrap();
        if let Some(cb) = inner.callbacks.clone() {
            cb.on_term_prop(prop);
        }
    }

    /// Raise a bell event.
    pub fn emit_bell(&self) {
        let inner = self.inner.lock().unwrap();
        if let Some(cb) = inner.callbacks.clone() {
            cb.on_bell();
        }
    }

    /// Raise an output event with raw transport bytes.
    pub fn emit_output(&self, data: &[u8]) {
        let inner = self.inner.lock().unwrap();
        if let Some(cb) = inner.callbacks.clone() {
            cb.on_output(data);
        }
    }

    /// Push a line of text into scrollback via the callback path.
    pub fn push_scrollback_text(&self, text: &str) {
        let inner = self.inner.lock().unwrap();
        let (fg, bg) = (inner.default_fg, inner.default_bg);
        let cells: Vec<Cell> = text
            .chars()
            .map(|ch| {
                let mut cell = Cell::blank(fg, bg);
                cell.ch = ch;
                cell.width = match UnicodeWidthChar::width(ch) {
                    Some(2) => 2,
                    _ => 1,
                };
                cell
            })
            .collect();
        if let Some(cb) = inner.callbacks.clone() {
            cb.on_scrollback_push(cells);
        }
    }

    /// Current grid dimensions.
    pub fn dimensions(&self) -> Dimensions {
        self.inner.lock().unwrap().dims
    }

    /// Scrollback capacity from the most recent resize.
    pub fn scrollback_capacity(&self) -> usize {
        self.inner.lock().unwrap().scrollback_capacity
    }

    /// Read back a palette slot (index 0..=15).
    pub fn palette_color(&self, index: u8) -> Option<Color> {
        self.inner
            .lock()
            .unwrap()
            .palette
            .get(index as usize)
            .copied()
    }

    /// Current default foreground and background colors.
    pub fn default_colors(&self) -> (Color, Color) {
        let inner = self.inner.lock().unwrap();
        (inner.default_fg, inner.default_bg)
    }

    /// The grid as plain text, for assertions.
    pub fn screen_text(&self) -> String {
        let inner = self.inner.lock().unwrap();
        let mut out = String::new();
        for row in 0..inner.dims.rows {
            if row > 0 {
                out.push('\n');
            }
            for col in 0..inner.dims.cols {
                let cell = &inner.cells[inner.idx(row, col)];
                if cell.ch != PLACEHOLDER {
                    out.push(cell.ch);
                }
            }
        }
        out.lines()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Inner {
    fn idx(&self, row: u16, col: u16) -> usize {
        row as usize * self.dims.cols as usize + col as usize
    }

    fn touch(&mut self, row: u16, start_col: u16, end_col: u16) {
        let region = DamageRegion::new(row, row + 1, start_col, end_col);
        self.touched = Some(match self.touched {
            Some(t) => t.union(&region),
            None => region,
        });
    }

    /// Emit accumulated paint damage and cursor movement.
    fn flush_paint(&mut self) {
        let Some(cb) = self.callbacks.clone() else {
            self.touched = None;
            self.cursor_moved = false;
            return;
        };
        if let Some(region) = self.touched.take() {
            cb.on_damage(region);
        }
        if self.cursor_moved {
            let old = self.reported_cursor;
            self.reported_cursor = self.cursor;
            self.cursor_moved = false;
            cb.on_move_cursor(self.cursor, old, self.cursor_visible);
        }
    }

    /// Attach a combining mark to the nearest base cell at or before `col`.
    fn attach_combining(&mut self, row: u16, col: u16, ch: char) {
        let mut back = col;
        while back > 0 {
            back -= 1;
            let idx = self.idx(row, back);
            if self.cells[idx].ch != PLACEHOLDER {
                self.cells[idx].combining.push(ch);
                return;
            }
        }
    }

    fn write_cell(&mut self, row: u16, col: u16, ch: char, width: u16, fg: Color, bg: Color, attrs: CellAttributes) {
        let idx = self.idx(row, col);
        self.cells[idx] = Cell {
            ch,
            combining: Vec::new(),
            fg,
            bg,
            attrs,
            width: width as u8,
        };
        if width == 2 {
            let pad = self.idx(row, col + 1);
            self.cells[pad] = Cell {
                ch: PLACEHOLDER,
                combining: Vec::new(),
                fg,
                bg,
                attrs,
                width: 0,
            };
        }
    }

    fn paint(
        &mut self,
        row: u16,
        mut col: u16,
        text: &str,
        fg: Color,
        bg: Color,
        attrs: CellAttributes,
    ) {
        if row >= self.dims.rows {
            return;
        }
        for ch in text.chars() {
            let width = match UnicodeWidthChar::width(ch) {
                Some(0) => {
                    self.attach_combining(row, col, ch);
                    continue;
                }
                Some(2) => 2u16,
                _ => 1u16,
            };
            if col + width > self.dims.cols {
                break;
            }
            self.write_cell(row, col, ch, width, fg, bg, attrs);
            col += width;
        }
    }

    fn put_char(&mut self, ch: char) {
        let width = match UnicodeWidthChar::width(ch) {
            Some(0) => {
                if let Some(idx) = self.last_base {
                    self.cells[idx].combining.push(ch);
                }
                return;
            }
            Some(2) => 2u16,
            _ => 1u16,
        };
        if self.cursor.col + width > self.dims.cols {
            self.newline();
        }
        let (row, col) = (self.cursor.row, self.cursor.col);
        let (fg, bg) = (self.default_fg, self.default_bg);
        self.write_cell(row, col, ch, width, fg, bg, CellAttributes::default());
        self.last_base = Some(self.idx(row, col));
        self.touch(row, col, col + width);
        self.cursor.col += width;
        self.cursor_moved = true;
    }

    /// Line feed with implicit carriage return.
    fn newline(&mut self) {
        self.cursor.col = 0;
        if self.cursor.row + 1 == self.dims.rows {
            self.scroll_up();
        } else {
            self.cursor.row += 1;
        }
        self.cursor_moved = true;
        self.last_base = None;
    }

    fn scroll_up(&mut self) {
        let cols = self.dims.cols as usize;
        let evicted: Vec<Cell> = self.cells[..cols]
            .iter()
            .filter(|c| c.ch != PLACEHOLDER)
            .cloned()
            .collect();
        if let Some(cb) = self.callbacks.clone() {
            cb.on_scrollback_push(evicted);
        }
        self.cells.rotate_left(cols);
        let blank = Cell::blank(self.default_fg, self.default_bg);
        let len = self.cells.len();
        for cell in &mut self.cells[len - cols..] {
            *cell = blank.clone();
        }
        self.touched = Some(DamageRegion::full(self.dims));
    }

    fn dispatch_osc(&mut self, buf: &str) {
        // Paint state must be visible before the OSC is interpreted: segment
        // columns refer to the cursor position the text advanced it to.
        self.flush_paint();
        let (number, payload) = match buf.split_once(';') {
            Some((n, p)) => (n, p),
            None => (buf, ""),
        };
        let Ok(command) = number.parse::<u16>() else {
            debug!("ignoring malformed OSC: {buf:?}");
            return;
        };
        if let Some(cb) = self.callbacks.clone() {
            cb.on_osc(command, payload);
        }
    }

    fn feed_char(&mut self, ch: char) {
        let state = std::mem::replace(&mut self.parse, ParseState::Ground);
        match state {
            ParseState::Ground => match ch {
                '\u{1b}' => self.parse = ParseState::Escape,
                '\u{07}' => {
                    self.flush_paint();
                    if let Some(cb) = self.callbacks.clone() {
                        cb.on_bell();
                    }
                }
                '\r' => {
                    self.cursor.col = 0;
                    self.cursor_moved = true;
                    self.last_base = None;
                }
                '\n' => self.newline(),
                c if !c.is_control() => self.put_char(c),
                _ => {}
            },
            ParseState::Escape => {
                if ch == ']' {
                    self.parse = ParseState::Osc {
                        buf: String::new(),
                        esc: false,
                    };
                }
                // Any other escape sequence is ignored by the fake
            }
            ParseState::Osc { mut buf, esc } => {
                if esc {
                    if ch == '\\' {
                        // ST terminator
                        self.dispatch_osc(&buf);
                    } else {
                        buf.push('\u{1b}');
                        buf.push(ch);
                        self.parse = ParseState::Osc { buf, esc: false };
                    }
                } else if ch == '\u{1b}' {
                    self.parse = ParseState::Osc { buf, esc: true };
                } else if ch == '\u{07}' {
                    // BEL terminator
                    self.dispatch_osc(&buf);
                } else {
                    buf.push(ch);
                    self.parse = ParseState::Osc { buf, esc: false };
                }
            }
        }
    }
}

impl TerminalEngine for FakeEngine {
    fn set_callbacks(&mut self, callbacks: Arc<dyn EngineCallbacks>) {
        self.inner.lock().unwrap().callbacks = Some(callbacks);
    }

    fn feed_bytes(&mut self, data: &[u8]) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let text = String::from_utf8_lossy(data);
        for ch in text.chars() {
            inner.feed_char(ch);
        }
        inner.flush_paint();
        data.len()
    }

    fn resize(&mut self, rows: u16, cols: u16, scrollback_capacity: usize) {
        let mut inner = self.inner.lock().unwrap();
        let new_dims = Dimensions::new(rows, cols);
        let mut new_cells = vec![Cell::default(); new_dims.cell_count()];

        let copy_rows = inner.dims.rows.min(rows);
        let copy_cols = inner.dims.cols.min(cols);
        for row in 0..copy_rows {
            for col in 0..copy_cols {
                let old_idx = inner.idx(row, col);
                let new_idx = row as usize * cols as usize + col as usize;
                new_cells[new_idx] = inner.cells[old_idx].clone();
            }
        }

        inner.cells = new_cells;
        inner.dims = new_dims;
        inner.scrollback_capacity = scrollback_capacity;
        if rows > 0 {
            inner.cursor.row = inner.cursor.row.min(rows - 1);
        }
        if cols > 0 {
            inner.cursor.col = inner.cursor.col.min(cols - 1);
        }
        inner.last_base = None;
        inner.touched = Some(DamageRegion::full(new_dims));
        inner.cursor_moved = true;
        inner.flush_paint();
    }

    fn dispatch_key(&mut self, modifiers: Modifiers, key: KeyCode) -> bool {
        let bytes: &[u8] = match key {
            KeyCode::Enter => b"\r",
            KeyCode::Tab => b"\t",
            KeyCode::Backspace => &[0x7f],
            KeyCode::Escape => &[0x1b],
            KeyCode::Up => b"\x1b[A",
            KeyCode::Down => b"\x1b[B",
            KeyCode::Right => b"\x1b[C",
            KeyCode::Left => b"\x1b[D",
            KeyCode::Home => b"\x1b[H",
            KeyCode::End => b"\x1b[F",
            KeyCode::Insert => b"\x1b[2~",
            KeyCode::Delete => b"\x1b[3~",
            KeyCode::PageUp => b"\x1b[5~",
            KeyCode::PageDown => b"\x1b[6~",
            KeyCode::Function(n) => match n {
                1 => b"\x1bOP",
                2 => b"\x1bOQ",
                3 => b"\x1bOR",
                4 => b"\x1bOS",
                5 => b"\x1b[15~",
                6 => b"\x1b[17~",
                7 => b"\x1b[18~",
                8 => b"\x1b[19~",
                9 => b"\x1b[20~",
                10 => b"\x1b[21~",
                11 => b"\x1b[23~",
                12 => b"\x1b[24~",
                _ => return false,
            },
        };
        let mut out = Vec::with_capacity(bytes.len() + 1);
        if modifiers.contains(Modifiers::ALT) {
            out.push(0x1b);
        }
        out.extend_from_slice(bytes);
        let inner = self.inner.lock().unwrap();
        if let Some(cb) = inner.callbacks.clone() {
            cb.on_output(&out);
        }
        true
    }

    fn dispatch_character(&mut self, modifiers: Modifiers, ch: char) -> bool {
        let mut out = Vec::new();
        if modifiers.contains(Modifiers::ALT) {
            out.push(0x1b);
        }
        if modifiers.contains(Modifiers::CTRL) && ch.is_ascii_alphabetic() {
            out.push(ch.to_ascii_uppercase() as u8 & 0x1f);
        } else {
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
        let inner = self.inner.lock().unwrap();
        if let Some(cb) = inner.callbacks.clone() {
            cb.on_output(&out);
        }
        true
    }

    fn cell_run(&self, row: u16, col: u16) -> Option<CellRun> {
        let inner = self.inner.lock().unwrap();
        if row >= inner.dims.rows || col >= inner.dims.cols {
            return None;
        }

        let first = &inner.cells[inner.idx(row, col)];
        let (fg, bg, attrs) = (first.fg, first.bg, first.attrs);
        let mut chars: Vec<u16> = Vec::new();
        let mut buf = [0u16; 2];

        for c in col..inner.dims.cols {
            let cell = &inner.cells[inner.idx(row, c)];
            if cell.ch == PLACEHOLDER {
                // Trailing column of a wide cell already emitted
                continue;
            }
            if c > col && (cell.fg != fg || cell.bg != bg || cell.attrs != attrs) {
                break;
            }
            let mut units: Vec<u16> = Vec::new();
            units.extend_from_slice(cell.ch.encode_utf16(&mut buf));
            for comb in &cell.combining {
                units.extend_from_slice(comb.encode_utf16(&mut buf));
            }
            if chars.len() + units.len() > RUN_LIMIT {
                break;
            }
            chars.extend_from_slice(&units);
        }

        Some(CellRun {
            chars,
            fg,
            bg,
            attrs,
        })
    }

    fn set_palette_color(&mut self, index: u8, color: Color) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(slot) = inner.palette.get_mut(index as usize) {
            *slot = color;
        }
    }

    fn set_default_colors(&mut self, fg: Color, bg: Color) {
        let mut inner = self.inner.lock().unwrap();
        inner.default_fg = fg;
        inner.default_bg = bg;
    }
}
