//! Immutable, versioned terminal snapshots.

use std::sync::Arc;
use std::time::SystemTime;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cell::Color;
use crate::geometry::{Dimensions, Position};
use crate::line::Line;

/// Cursor visual style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CursorShape {
    /// Block cursor (fills entire cell)
    Block,
    /// Underline cursor (bottom of cell)
    Underline,
    /// Bar cursor (vertical line at left)
    BarLeft,
}

impl CursorShape {
    /// Map an engine cursor-shape property value (1 = block, 2 = underline,
    /// 3 = left bar). Unknown values fall back to a block cursor.
    pub fn from_engine_code(code: u8) -> Self {
        match code {
            2 => CursorShape::Underline,
            3 => CursorShape::BarLeft,
            _ => CursorShape::Block,
        }
    }
}

/// Cursor state carried in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CursorState {
    /// Current position
    pub position: Position,
    /// Visibility
    pub visible: bool,
    /// Visual style
    pub shape: CursorShape,
    /// Whether the cursor blinks
    pub blink: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            position: Position::origin(),
            visible: true,
            shape: CursorShape::Block,
            blink: true,
        }
    }
}

/// An immutable point-in-time view of the full terminal state.
///
/// Snapshots are superseded, never mutated; `sequence` strictly increases
/// per emission so consumers reading the latest value can detect and discard
/// stale ones.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Visible grid rows, top to bottom
    pub lines: Vec<Arc<Line>>,
    /// Scrollback rows, oldest first
    pub scrollback: Arc<Vec<Arc<Line>>>,
    /// Cursor state
    pub cursor: CursorState,
    /// Window title
    pub title: String,
    /// Grid dimensions
    pub dimensions: Dimensions,
    /// When the snapshot was assembled
    pub timestamp: SystemTime,
    /// Strictly increasing emission counter
    pub sequence: u64,
}

impl Snapshot {
    /// A blank snapshot for a grid of the given size (sequence 0).
    pub fn empty(dimensions: Dimensions) -> Self {
        let blank = Arc::new(Line::blank(dimensions.cols, Color::WHITE, Color::BLACK, 0));
        Self {
            lines: vec![blank; dimensions.rows as usize],
            scrollback: Arc::new(Vec::new()),
            cursor: CursorState::default(),
            title: String::new(),
            dimensions,
            timestamp: SystemTime::UNIX_EPOCH,
            sequence: 0,
        }
    }

    /// Get a visible row by index.
    pub fn line(&self, row: u16) -> Option<&Arc<Line>> {
        self.lines.get(row as usize)
    }

    /// Visible grid as plain text, one row per line, trailing spaces trimmed.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
