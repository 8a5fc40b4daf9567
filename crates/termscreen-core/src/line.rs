//! Line and semantic-segment types.
//!
//! A `Line` is one row of reconstructed grid content plus the semantic
//! segments (prompt, command input, completion markers, annotations) that
//! shell integration attached to it. Lines are immutable: any change
//! produces a replacement line with a fresh modification stamp.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, Color};

/// Classification of a semantic span within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Ordinary screen content
    Default,
    /// Shell prompt text
    Prompt,
    /// Text the user typed at the prompt
    CommandInput,
    /// Output produced by a running command
    CommandOutput,
    /// Zero-width marker recording a command's exit code
    CommandFinished,
    /// Full-row annotation attached by the shell
    Annotation,
}

/// A labeled span of a line's columns.
///
/// `end_col` is exclusive; a `CommandFinished` marker has
/// `start_col == end_col`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSegment {
    /// First column covered by the segment
    pub start_col: u16,
    /// One past the last covered column
    pub end_col: u16,
    /// What the span represents
    pub kind: SegmentKind,
    /// Extra payload (exit code for `CommandFinished`, text for `Annotation`)
    pub metadata: Option<String>,
    /// Command-execution group this segment belongs to
    pub prompt_id: Option<u32>,
}

impl SemanticSegment {
    /// Create a segment spanning `[start_col, end_col)`.
    pub fn new(start_col: u16, end_col: u16, kind: SegmentKind) -> Self {
        Self {
            start_col,
            end_col: end_col.max(start_col),
            kind,
            metadata: None,
            prompt_id: None,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Attach a prompt id.
    pub fn with_prompt_id(mut self, prompt_id: u32) -> Self {
        self.prompt_id = Some(prompt_id);
        self
    }
}

/// A semantic segment waiting for its target row's content to materialize.
///
/// Segments are queued at OSC-parse time and merged into lines only after
/// reconstruction, because their columns refer to screen positions that must
/// already contain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSegment {
    /// Target row on the visible grid
    pub row: u16,
    /// The segment to merge
    pub segment: SemanticSegment,
}

/// One row of the terminal: cells, a modification stamp, and semantic
/// segments sorted by start column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Cell content, wide cells counted once
    pub cells: Vec<Cell>,
    /// Monotonically increasing stamp assigned when the line was built
    pub last_modified: u64,
    /// Semantic segments, sorted by `start_col`
    pub segments: Vec<SemanticSegment>,
}

impl Line {
    /// Create a line from cells with no segments.
    pub fn new(cells: Vec<Cell>, last_modified: u64) -> Self {
        Self {
            cells,
            last_modified,
            segments: Vec::new(),
        }
    }

    /// Create a blank line of `cols` cells in the given default colors.
    pub fn blank(cols: u16, fg: Color, bg: Color, last_modified: u64) -> Self {
        Self::new(vec![Cell::blank(fg, bg); cols as usize], last_modified)
    }

    /// Number of grid columns the line's cells occupy.
    pub fn column_count(&self) -> u16 {
        self.cells.iter().map(|c| c.width as u16).sum()
    }

    /// Replacement line with `segment` merged in, keeping segments sorted by
    /// start column. Equal start columns keep insertion order, so a
    /// later-added segment wins ties.
    pub fn with_segment(&self, segment: SemanticSegment) -> Line {
        let mut segments = self.segments.clone();
        segments.push(segment);
        segments.sort_by_key(|s| s.start_col);
        Line {
            cells: self.cells.clone(),
            last_modified: self.last_modified,
            segments,
        }
    }

    /// The line's text, combining characters included.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.cells.len());
        for cell in &self.cells {
            cell.push_text(&mut out);
        }
        out
    }

    /// Prompt id of the first segment carrying one.
    ///
    /// When several command blocks share one physical row this reports the
    /// earliest block's id.
    pub fn prompt_id(&self) -> Option<u32> {
        self.segments.iter().find_map(|s| s.prompt_id)
    }

    /// Compare cell content and segments, ignoring the modification stamp.
    pub fn content_eq(&self, other: &Line) -> bool {
        self.cells == other.cells && self.segments == other.segments
    }
}
