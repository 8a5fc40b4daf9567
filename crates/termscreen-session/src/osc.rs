//! OSC sub-protocol interpreter.
//!
//! Parses the Operating System Command sequences the engine does not handle
//! natively: OSC 52 clipboard writes, OSC 133 shell-integration markers, and
//! the OSC 1337 annotation/cursor-shape extension. Everything else passes
//! through untouched.
//!
//! The interpreter keeps two fields of state across calls (the running
//! prompt counter and the column where the in-progress segment began); both
//! are only ever touched under the accumulator's lock, so parsing never
//! races with itself.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::trace;

use termscreen_core::{
    CursorShape, PendingSegment, Position, SegmentKind, SemanticSegment,
};

/// An action produced by OSC interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OscAction {
    /// Attach a semantic segment to a row once its content materializes
    AddSegment(PendingSegment),
    /// Write decoded text to the host clipboard
    ClipboardCopy {
        /// Selection target ("c", "p", ... - empty means default clipboard)
        selection: String,
        /// Decoded UTF-8 payload
        text: String,
    },
    /// Change the cursor shape
    SetCursorShape(CursorShape),
}

/// Per-session OSC state machine.
#[derive(Debug, Default)]
pub struct OscInterpreter {
    /// Monotonic prompt counter, incremented on each prompt start
    prompt_id: u32,
    /// Column where the in-progress segment began
    segment_start_col: u16,
}

impl OscInterpreter {
    /// Create a fresh interpreter (prompt counter at 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a command number belongs to this interpreter.
    pub fn handles(command: u16) -> bool {
        matches!(command, 52 | 133 | 1337)
    }

    /// Interpret one OSC sequence at the given cursor position.
    ///
    /// Malformed payloads and unknown commands produce no actions; they are
    /// never errors.
    pub fn parse(
        &mut self,
        command: u16,
        payload: &str,
        cursor: Position,
        cols: u16,
    ) -> Vec<OscAction> {
        match command {
            52 => Self::parse_clipboard(payload),
            133 => self.parse_shell_integration(payload, cursor),
            1337 => self.parse_extension(payload, cursor, cols),
            _ => Vec::new(),
        }
    }

    /// OSC 52: `selection;base64data`.
    fn parse_clipboard(payload: &str) -> Vec<OscAction> {
        let Some((selection, data)) = payload.split_once(';') else {
            return Vec::new();
        };
        // Read requests are never honored: answering one would leak the
        // clipboard to whatever wrote the sequence.
        if data == "?" {
            return Vec::new();
        }
        let Ok(decoded) = BASE64.decode(data) else {
            trace!("discarding OSC 52 payload with invalid base64");
            return Vec::new();
        };
        let Ok(text) = String::from_utf8(decoded) else {
            trace!("discarding OSC 52 payload with non-UTF-8 content");
            return Vec::new();
        };
        vec![OscAction::ClipboardCopy {
            selection: selection.to_string(),
            text,
        }]
    }

    /// OSC 133: shell integration prompt/command boundaries.
    fn parse_shell_integration(&mut self, payload: &str, cursor: Position) -> Vec<OscAction> {
        match payload {
            "A" => {
                // Prompt start: open a segment, emit nothing yet
                self.prompt_id += 1;
                self.segment_start_col = cursor.col;
                Vec::new()
            }
            "B" => {
                // Prompt end / command input starts
                let mut actions = Vec::new();
                if self.segment_start_col < cursor.col {
                    actions.push(self.segment_action(
                        cursor.row,
                        self.segment_start_col,
                        cursor.col,
                        SegmentKind::Prompt,
                        None,
                    ));
                }
                self.segment_start_col = cursor.col;
                actions
            }
            "C" => {
                // Command output starts; the open segment is the typed input
                let mut actions = Vec::new();
                if self.segment_start_col < cursor.col {
                    actions.push(self.segment_action(
                        cursor.row,
                        self.segment_start_col,
                        cursor.col,
                        SegmentKind::CommandInput,
                        None,
                    ));
                }
                actions
            }
            d if d.starts_with('D') => {
                // Command finished; exit code follows "D;" when present
                let exit_code = d.get(2..).filter(|s| !s.is_empty()).unwrap_or("0");
                vec![self.segment_action(
                    cursor.row,
                    cursor.col,
                    cursor.col,
                    SegmentKind::CommandFinished,
                    Some(exit_code.to_string()),
                )]
            }
            _ => Vec::new(),
        }
    }

    /// OSC 1337 extension: annotations and cursor-shape hints.
    fn parse_extension(&mut self, payload: &str, cursor: Position, cols: u16) -> Vec<OscAction> {
        if let Some(text) = payload.strip_prefix("AddAnnotation=") {
            return vec![self.segment_action(
                cursor.row,
                0,
                cols,
                SegmentKind::Annotation,
                Some(text.to_string()),
            )];
        }
        if let Some(value) = payload.strip_prefix("SetCursorShape=") {
            let shape = match value {
                "1" => CursorShape::BarLeft,
                "2" => CursorShape::Underline,
                // "0" and anything unrecognized
                _ => CursorShape::Block,
            };
            return vec![OscAction::SetCursorShape(shape)];
        }
        Vec::new()
    }

    fn segment_action(
        &self,
        row: u16,
        start_col: u16,
        end_col: u16,
        kind: SegmentKind,
        metadata: Option<String>,
    ) -> OscAction {
        let mut segment =
            SemanticSegment::new(start_col, end_col, kind).with_prompt_id(self.prompt_id);
        segment.metadata = metadata;
        OscAction::AddSegment(PendingSegment { row, segment })
    }
}
