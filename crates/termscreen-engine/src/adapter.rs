//! The `TerminalEngine` trait - the opaque boundary to the VT interpreter.

use std::sync::Arc;

use termscreen_core::{CellAttributes, Color};

use crate::events::EngineCallbacks;
use crate::input::{KeyCode, Modifiers};

/// A maximal horizontal span of cells sharing identical style attributes,
/// returned by [`TerminalEngine::cell_run`].
///
/// `chars` is the run's character content as UTF-16 code units, capped at
/// 256 units per query. Wide characters appear once; the grid columns their
/// placeholders occupy are already accounted for by the character's display
/// width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRun {
    /// Character content, UTF-16 code units
    pub chars: Vec<u16>,
    /// Foreground color, resolved to RGB
    pub fg: Color,
    /// Background color, resolved to RGB
    pub bg: Color,
    /// Style attributes shared by every cell in the run
    pub attrs: CellAttributes,
}

impl CellRun {
    /// Number of UTF-16 units in the run.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Check whether the run carries no characters.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// The terminal-emulation engine, consumed as an opaque collaborator.
///
/// Implementations interpret VT/ANSI escape sequences internally and expose
/// the resulting screen state through cell-run queries. Engines raise
/// [`EngineCallbacks`] events *synchronously on the caller's stack while
/// holding their own non-reentrant lock*: a callback must never call back
/// into the engine, or the engine's lock deadlocks. The session layer
/// guarantees this by deferring all re-queries to a separate flush task.
pub trait TerminalEngine: Send {
    /// Install the callback sink events are raised through.
    fn set_callbacks(&mut self, callbacks: Arc<dyn EngineCallbacks>);

    /// Feed transport bytes into the interpreter. Returns bytes consumed.
    fn feed_bytes(&mut self, data: &[u8]) -> usize;

    /// Resize the grid. The engine reports the redraw as damage events.
    fn resize(&mut self, rows: u16, cols: u16, scrollback_capacity: usize);

    /// Dispatch a named key. Escape bytes for the transport come back via
    /// [`EngineCallbacks::on_output`]. Returns whether the key was handled.
    fn dispatch_key(&mut self, modifiers: Modifiers, key: KeyCode) -> bool;

    /// Dispatch a character keypress. Returns whether it was handled.
    fn dispatch_character(&mut self, modifiers: Modifiers, ch: char) -> bool;

    /// Query the style-uniform cell run starting at (row, col).
    ///
    /// Returns `None` when the engine has nothing useful at that position
    /// (out-of-range coordinates, or a torn-down interpreter).
    fn cell_run(&self, row: u16, col: u16) -> Option<CellRun>;

    /// Set one of the 16 ANSI palette colors (index 0..=15).
    fn set_palette_color(&mut self, index: u8, color: Color);

    /// Set the default foreground and background colors.
    fn set_default_colors(&mut self, fg: Color, bg: Color);
}
