//! The cross-context flush task.
//!
//! This is the single point where control crosses from "inside an engine
//! callback" to "safe to re-query the engine". Callbacks only enqueue state
//! and post a flush signal; the task here drains one batch at a time, so the
//! engine's non-reentrant lock is always free by the time cell queries run.
//! Events that arrive while a flush is in progress start a fresh batch for
//! the next one.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use termscreen_core::{CursorShape, CursorState, Dimensions, Line, SessionId};
use termscreen_engine::{TermProp, TerminalEngine};

use crate::accumulator::{Accumulator, FlushSignal};
use crate::publisher::SnapshotPublisher;
use crate::reconstruct::reconstruct_line;

/// The engine slot shared between the session facade and the flush task.
/// `None` after teardown.
pub(crate) type SharedEngine = Arc<Mutex<Option<Box<dyn TerminalEngine>>>>;

/// Single-consumer worker turning batched damage into published snapshots.
pub(crate) struct FlushWorker {
    engine: SharedEngine,
    accumulator: Arc<Accumulator>,
    rx: mpsc::UnboundedReceiver<FlushSignal>,
    publisher: SnapshotPublisher,
    /// Copy-on-write row cache; slots are replaced wholesale
    lines: Vec<Arc<Line>>,
    dims: Dimensions,
    cursor: CursorState,
    title: String,
    id: SessionId,
}

impl FlushWorker {
    pub(crate) fn new(
        engine: SharedEngine,
        accumulator: Arc<Accumulator>,
        rx: mpsc::UnboundedReceiver<FlushSignal>,
        publisher: SnapshotPublisher,
        dims: Dimensions,
        id: SessionId,
    ) -> Self {
        let blank = Arc::new(Line::blank(
            dims.cols,
            termscreen_core::Color::WHITE,
            termscreen_core::Color::BLACK,
            0,
        ));
        Self {
            engine,
            accumulator,
            rx,
            publisher,
            lines: vec![blank; dims.rows as usize],
            dims,
            cursor: CursorState::default(),
            title: String::new(),
            id,
        }
    }

    /// Drain flush signals until shutdown. One flush at a time, FIFO.
    pub(crate) async fn run(mut self) {
        while let Some(signal) = self.rx.recv().await {
            match signal {
                FlushSignal::Flush => self.flush(),
                FlushSignal::Shutdown => break,
            }
        }
        debug!(id = %self.id, "flush task exiting");
    }

    /// Process one batch: apply properties, reconstruct damaged rows, merge
    /// pending segments, publish.
    fn flush(&mut self) {
        let batch = self.accumulator.take_batch();

        if batch.dims != self.dims {
            // Resize arrived as full-screen damage; rebuild the row cache
            self.dims = batch.dims;
            let blank = Arc::new(Line::blank(
                batch.dims.cols,
                batch.default_fg,
                batch.default_bg,
                self.accumulator.next_stamp(),
            ));
            self.lines = vec![blank; batch.dims.rows as usize];
        }

        // Cursor movement first; explicit property changes override it
        self.cursor.position = batch.cursor_position;
        self.cursor.visible = batch.cursor_visible;
        for prop in batch.props {
            match prop {
                TermProp::Title(title) => self.title = title,
                TermProp::CursorVisible(visible) => self.cursor.visible = visible,
                TermProp::CursorBlink(blink) => self.cursor.blink = blink,
                TermProp::CursorShape(code) => {
                    self.cursor.shape = CursorShape::from_engine_code(code)
                }
                TermProp::AltScreen(_) => {}
            }
        }
        if let Some(shape) = batch.osc_cursor_shape {
            self.cursor.shape = shape;
        }
        if self.dims.rows > 0 {
            self.cursor.position.row = self.cursor.position.row.min(self.dims.rows - 1);
        }
        if self.dims.cols > 0 {
            self.cursor.position.col = self.cursor.position.col.min(self.dims.cols);
        }

        // Reconstruct each damaged row once, whole-row, left to right
        let mut rows: BTreeSet<u16> = BTreeSet::new();
        for region in &batch.damage {
            rows.extend(region.clamp_to(self.dims).rows());
        }
        if !rows.is_empty() {
            let guard = self.engine.lock().unwrap();
            match guard.as_ref() {
                Some(engine) => {
                    for row in rows {
                        let stamp = self.accumulator.next_stamp();
                        // Segments survive content refreshes; a prompt marker
                        // must not vanish because the user kept typing on the
                        // row. They drop only when their row leaves the grid.
                        let segments = self.lines[row as usize].segments.clone();
                        let mut line = reconstruct_line(
                            engine.as_ref(),
                            row,
                            self.dims,
                            batch.default_fg,
                            batch.default_bg,
                            stamp,
                        );
                        line.segments = segments;
                        self.lines[row as usize] = Arc::new(line);
                    }
                }
                // Engine torn down: previous cached rows stay untouched
                None => trace!(id = %self.id, "skipping reconstruction, engine gone"),
            }
        }

        // Segments merge only after row content has materialized
        for pending in batch.segments {
            let row = pending.row as usize;
            if row >= self.lines.len() {
                // The row scrolled away since the OSC was parsed; expected
                trace!(id = %self.id, row = pending.row, "dropping stale segment");
                continue;
            }
            let mut updated = self.lines[row].with_segment(pending.segment);
            updated.last_modified = self.accumulator.next_stamp();
            self.lines[row] = Arc::new(updated);
        }

        let sequence = self.publisher.publish(
            self.lines.clone(),
            batch.scrollback,
            self.cursor,
            self.title.clone(),
            self.dims,
        );
        debug!(id = %self.id, sequence, "snapshot published");
    }
}
