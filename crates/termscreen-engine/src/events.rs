//! Events raised by the emulation engine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use termscreen_core::{Cell, DamageRegion, Position};

/// A terminal property change reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TermProp {
    /// Window title
    Title(String),
    /// Cursor visibility
    CursorVisible(bool),
    /// Cursor blink state
    CursorBlink(bool),
    /// Cursor shape code (1 = block, 2 = underline, 3 = left bar)
    CursorShape(u8),
    /// Alternate screen active
    AltScreen(bool),
}

/// Callback sink for engine events.
///
/// Every method is invoked synchronously from inside the engine while the
/// engine's own non-reentrant lock is held. Implementations must return
/// quickly and must never call back into the engine; they may take their own
/// locks for short, non-blocking critical sections.
pub trait EngineCallbacks: Send + Sync {
    /// A rectangular screen area changed.
    fn on_damage(&self, region: DamageRegion);

    /// The cursor moved or changed visibility.
    fn on_move_cursor(&self, position: Position, old_position: Position, visible: bool);

    /// A terminal property changed.
    fn on_term_prop(&self, prop: TermProp);

    /// The bell rang.
    fn on_bell(&self);

    /// A line scrolled off the top of the grid. Cells arrive fully resolved,
    /// wide-cell placeholders already dropped.
    fn on_scrollback_push(&self, cells: Vec<Cell>);

    /// The engine produced bytes the host must forward to the transport
    /// (responses to key dispatch and queries).
    fn on_output(&self, data: &[u8]);

    /// An OSC sequence the engine does not handle natively.
    ///
    /// Returns whether the sequence was consumed; on `false` the engine may
    /// apply its own fallback handling.
    fn on_osc(&self, command: u16, payload: &str) -> bool;
}
