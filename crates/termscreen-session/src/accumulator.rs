//! Damage accumulation on the engine's callback context.
//!
//! The accumulator is the single place engine events enter the session. It
//! is a mailbox: callbacks append to pending state under one coarse lock and
//! post at most one flush message per batch; the flush task drains the
//! mailbox on its own context. The lock is held only for short, non-blocking
//! sections and never across an engine call, which is what keeps the
//! engine's non-reentrant internal lock safe.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::trace;

use termscreen_core::{
    Cell, Color, CursorShape, DamageRegion, Dimensions, Line, PendingSegment, Position,
    SessionConfig, SessionId,
};
use termscreen_engine::{EngineCallbacks, TermProp};

use crate::osc::{OscAction, OscInterpreter};
use crate::session::HostEvent;

/// Message posted to the flush task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlushSignal {
    /// Pending state is waiting to be drained
    Flush,
    /// The session is closing; drain and exit
    Shutdown,
}

/// Everything guarded by the accumulator's lock.
struct PendingState {
    dims: Dimensions,
    max_pending_damage: usize,
    damage: Vec<DamageRegion>,
    cursor_position: Position,
    cursor_visible: bool,
    props: Vec<TermProp>,
    osc_cursor_shape: Option<CursorShape>,
    segments: Vec<PendingSegment>,
    scrollback: VecDeque<Arc<Line>>,
    scrollback_capacity: usize,
    scrollback_dirty: bool,
    default_fg: Color,
    default_bg: Color,
    flush_scheduled: bool,
    osc: OscInterpreter,
}

/// A consistent batch of pending state, taken at the start of a flush.
pub(crate) struct FlushBatch {
    pub damage: Vec<DamageRegion>,
    pub cursor_position: Position,
    pub cursor_visible: bool,
    pub props: Vec<TermProp>,
    pub osc_cursor_shape: Option<CursorShape>,
    pub segments: Vec<PendingSegment>,
    /// `Some` only when scrollback changed since the previous batch
    pub scrollback: Option<Vec<Arc<Line>>>,
    pub dims: Dimensions,
    pub default_fg: Color,
    pub default_bg: Color,
}

/// Collects and coalesces engine events between flushes.
pub(crate) struct Accumulator {
    state: Mutex<PendingState>,
    stamp: AtomicU64,
    flush_tx: mpsc::UnboundedSender<FlushSignal>,
    host_tx: mpsc::UnboundedSender<HostEvent>,
    id: SessionId,
}

impl Accumulator {
    pub(crate) fn new(
        config: &SessionConfig,
        flush_tx: mpsc::UnboundedSender<FlushSignal>,
        host_tx: mpsc::UnboundedSender<HostEvent>,
        id: SessionId,
    ) -> Self {
        Self {
            state: Mutex::new(PendingState {
                dims: config.dimensions(),
                max_pending_damage: config.max_pending_damage,
                damage: Vec::new(),
                cursor_position: Position::origin(),
                cursor_visible: true,
                props: Vec::new(),
                osc_cursor_shape: None,
                segments: Vec::new(),
                scrollback: VecDeque::new(),
                scrollback_capacity: config.scrollback_capacity,
                scrollback_dirty: false,
                default_fg: Color::WHITE,
                default_bg: Color::BLACK,
                flush_scheduled: false,
                osc: OscInterpreter::new(),
            }),
            stamp: AtomicU64::new(0),
            flush_tx,
            host_tx,
            id,
        }
    }

    /// Next line-modification stamp.
    pub(crate) fn next_stamp(&self) -> u64 {
        self.stamp.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a damaged region, coalescing with pending ones.
    pub(crate) fn record_damage(&self, region: DamageRegion) {
        let mut state = self.state.lock().unwrap();
        Self::record_damage_locked(&mut state, region);
        self.schedule_locked(&mut state);
    }

    fn record_damage_locked(state: &mut PendingState, region: DamageRegion) {
        let mut region = region.clamp_to(state.dims);
        if region.is_empty() {
            return;
        }
        // Merge every pending region whose row range overlaps or touches;
        // each merge can create new row adjacency, so restart the scan.
        let mut i = 0;
        while i < state.damage.len() {
            if state.damage[i].rows_overlap(&region) {
                region = region.union(&state.damage.swap_remove(i));
                i = 0;
            } else {
                i += 1;
            }
        }
        state.damage.push(region);
        // Bounded memory: past the cap the whole screen is cheaper
        if state.damage.len() > state.max_pending_damage {
            state.damage.clear();
            state.damage.push(DamageRegion::full(state.dims));
        }
    }

    /// Change the grid dimensions and damage the entire grid.
    ///
    /// Resize funnels through the same batching path as ordinary damage, so
    /// a resize racing with in-flight damage coalesces instead of getting
    /// lost.
    pub(crate) fn set_dimensions(&self, dims: Dimensions) {
        let mut state = self.state.lock().unwrap();
        state.dims = dims;
        state.damage.clear();
        state.damage.push(DamageRegion::full(dims));
        self.schedule_locked(&mut state);
    }

    /// Damage the entire grid (palette or default-color change).
    pub(crate) fn invalidate_all(&self) {
        let mut state = self.state.lock().unwrap();
        let full = DamageRegion::full(state.dims);
        Self::record_damage_locked(&mut state, full);
        self.schedule_locked(&mut state);
    }

    /// Update the default colors used for blank fill.
    pub(crate) fn set_default_colors(&self, fg: Color, bg: Color) {
        let mut state = self.state.lock().unwrap();
        state.default_fg = fg;
        state.default_bg = bg;
        let full = DamageRegion::full(state.dims);
        Self::record_damage_locked(&mut state, full);
        self.schedule_locked(&mut state);
    }

    /// Ask the flush task to exit once pending work is drained.
    pub(crate) fn shutdown(&self) {
        let _ = self.flush_tx.send(FlushSignal::Shutdown);
    }

    /// Take all pending state as one consistent batch and clear the
    /// scheduling flag, so events arriving from here on start a new batch.
    pub(crate) fn take_batch(&self) -> FlushBatch {
        let mut state = self.state.lock().unwrap();
        state.flush_scheduled = false;
        let scrollback = if state.scrollback_dirty {
            state.scrollback_dirty = false;
            Some(state.scrollback.iter().cloned().collect())
        } else {
            None
        };
        FlushBatch {
            damage: std::mem::take(&mut state.damage),
            cursor_position: state.cursor_position,
            cursor_visible: state.cursor_visible,
            props: std::mem::take(&mut state.props),
            osc_cursor_shape: state.osc_cursor_shape.take(),
            segments: std::mem::take(&mut state.segments),
            scrollback,
            dims: state.dims,
            default_fg: state.default_fg,
            default_bg: state.default_bg,
        }
    }

    /// Number of pending damage regions (test instrumentation).
    #[cfg(test)]
    fn pending_damage(&self) -> Vec<DamageRegion> {
        self.state.lock().unwrap().damage.clone()
    }

    fn schedule_locked(&self, state: &mut PendingState) {
        if !state.flush_scheduled {
            state.flush_scheduled = true;
            let _ = self.flush_tx.send(FlushSignal::Flush);
        }
    }
}

impl EngineCallbacks for Accumulator {
    fn on_damage(&self, region: DamageRegion) {
        self.record_damage(region);
    }

    fn on_move_cursor(&self, position: Position, _old_position: Position, visible: bool) {
        let mut state = self.state.lock().unwrap();
        state.cursor_position = position;
        state.cursor_visible = visible;
        self.schedule_locked(&mut state);
    }

    fn on_term_prop(&self, prop: TermProp) {
        let mut state = self.state.lock().unwrap();
        state.props.push(prop);
        self.schedule_locked(&mut state);
    }

    fn on_bell(&self) {
        let _ = self.host_tx.send(HostEvent::Bell);
    }

    fn on_scrollback_push(&self, cells: Vec<Cell>) {
        let line = Arc::new(Line::new(cells, self.next_stamp()));
        let mut state = self.state.lock().unwrap();
        state.scrollback.push_back(line);
        while state.scrollback.len() > state.scrollback_capacity {
            state.scrollback.pop_front();
        }
        state.scrollback_dirty = true;
        self.schedule_locked(&mut state);
    }

    fn on_output(&self, data: &[u8]) {
        let _ = self.host_tx.send(HostEvent::Output(data.to_vec()));
    }

    fn on_osc(&self, command: u16, payload: &str) -> bool {
        if !OscInterpreter::handles(command) {
            trace!(id = %self.id, command, "unhandled OSC command");
            return false;
        }
        let mut state = self.state.lock().unwrap();
        let cursor = state.cursor_position;
        let cols = state.dims.cols;
        let actions = state.osc.parse(command, payload, cursor, cols);
        let mut schedule = false;
        for action in actions {
            match action {
                OscAction::AddSegment(pending) => {
                    state.segments.push(pending);
                    schedule = true;
                }
                OscAction::SetCursorShape(shape) => {
                    state.osc_cursor_shape = Some(shape);
                    schedule = true;
                }
                OscAction::ClipboardCopy { selection, text } => {
                    let _ = self.host_tx.send(HostEvent::ClipboardCopy { selection, text });
                }
            }
        }
        if schedule {
            self.schedule_locked(&mut state);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn accumulator() -> (
        Arc<Accumulator>,
        mpsc::UnboundedReceiver<FlushSignal>,
        mpsc::UnboundedReceiver<HostEvent>,
    ) {
        let (flush_tx, flush_rx) = mpsc::unbounded_channel();
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let config = SessionConfig::new(24, 80);
        let acc = Arc::new(Accumulator::new(
            &config,
            flush_tx,
            host_tx,
            SessionId::new(),
        ));
        (acc, flush_rx, host_rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<FlushSignal>) -> usize {
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    #[test]
    fn test_first_event_schedules_exactly_one_flush() {
        let (acc, mut flush_rx, _host_rx) = accumulator();

        acc.on_damage(DamageRegion::new(0, 1, 0, 10));
        acc.on_damage(DamageRegion::new(3, 4, 0, 10));
        acc.on_move_cursor(Position::new(1, 2), Position::origin(), true);
        acc.on_term_prop(TermProp::Title("shell".to_string()));

        assert_eq!(drain(&mut flush_rx), 1);

        // After a batch is taken, the next event schedules again
        let _ = acc.take_batch();
        acc.on_damage(DamageRegion::new(0, 1, 0, 1));
        assert_eq!(drain(&mut flush_rx), 1);
    }

    #[test]
    fn test_damage_coalesces_overlapping_rows() {
        let (acc, _flush_rx, _host_rx) = accumulator();

        acc.on_damage(DamageRegion::new(0, 2, 0, 10));
        acc.on_damage(DamageRegion::new(1, 3, 20, 30));

        let pending = acc.pending_damage();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0], DamageRegion::new(0, 3, 0, 30));
    }

    #[test]
    fn test_disjoint_rows_stay_separate() {
        let (acc, _flush_rx, _host_rx) = accumulator();

        acc.on_damage(DamageRegion::new(0, 1, 0, 10));
        acc.on_damage(DamageRegion::new(10, 11, 0, 10));

        assert_eq!(acc.pending_damage().len(), 2);
    }

    #[test]
    fn test_damage_collapses_past_cap() {
        let (acc, _flush_rx, _host_rx) = accumulator();

        // 24-row grid cannot hold 101 disjoint row ranges, so grow the grid
        acc.set_dimensions(Dimensions::new(500, 80));
        let _ = acc.take_batch();

        for row in 0..250u16 {
            acc.on_damage(DamageRegion::new(row * 2, row * 2 + 1, 0, 1));
        }

        let pending = acc.pending_damage();
        assert_eq!(pending, vec![DamageRegion::full(Dimensions::new(500, 80))]);
    }

    #[test]
    fn test_damage_clamped_to_grid() {
        let (acc, _flush_rx, _host_rx) = accumulator();

        acc.on_damage(DamageRegion::new(20, 100, 70, 300));
        let pending = acc.pending_damage();
        assert_eq!(pending, vec![DamageRegion::new(20, 24, 70, 80)]);

        // Fully out-of-range damage is dropped
        acc.on_damage(DamageRegion::new(50, 60, 0, 10));
        assert_eq!(acc.pending_damage().len(), 1);
    }

    #[test]
    fn test_take_batch_clears_pending() {
        let (acc, _flush_rx, _host_rx) = accumulator();

        acc.on_damage(DamageRegion::new(0, 1, 0, 10));
        acc.on_term_prop(TermProp::CursorBlink(false));
        acc.on_move_cursor(Position::new(3, 4), Position::origin(), false);

        let batch = acc.take_batch();
        assert_eq!(batch.damage.len(), 1);
        assert_eq!(batch.props, vec![TermProp::CursorBlink(false)]);
        assert_eq!(batch.cursor_position, Position::new(3, 4));
        assert!(!batch.cursor_visible);

        let empty = acc.take_batch();
        assert!(empty.damage.is_empty());
        assert!(empty.props.is_empty());
        // Cursor state persists across batches
        assert_eq!(empty.cursor_position, Position::new(3, 4));
    }

    #[test]
    fn test_scrollback_eviction_fifo() {
        let (flush_tx, _flush_rx) = mpsc::unbounded_channel();
        let (host_tx, _host_rx) = mpsc::unbounded_channel();
        let config = SessionConfig {
            scrollback_capacity: 3,
            ..SessionConfig::new(24, 80)
        };
        let acc = Accumulator::new(&config, flush_tx, host_tx, SessionId::new());

        for i in 0..4u8 {
            let cells = vec![Cell::new(char::from(b'a' + i))];
            acc.on_scrollback_push(cells);
        }

        let batch = acc.take_batch();
        let scrollback = batch.scrollback.expect("scrollback should be dirty");
        let texts: Vec<String> = scrollback.iter().map(|l| l.text()).collect();
        // Oldest ("a") evicted, order preserved
        assert_eq!(texts, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_scrollback_dirty_flag_resets() {
        let (acc, _flush_rx, _host_rx) = accumulator();

        acc.on_scrollback_push(vec![Cell::new('x')]);
        assert!(acc.take_batch().scrollback.is_some());
        // Unchanged since the last batch
        assert!(acc.take_batch().scrollback.is_none());
    }

    #[test]
    fn test_bell_and_output_forwarded_immediately() {
        let (acc, mut flush_rx, mut host_rx) = accumulator();

        acc.on_bell();
        acc.on_output(b"\x1b[A");

        assert!(matches!(host_rx.try_recv(), Ok(HostEvent::Bell)));
        assert!(matches!(host_rx.try_recv(), Ok(HostEvent::Output(b)) if b == b"\x1b[A"));
        // Neither schedules a flush
        assert_eq!(drain(&mut flush_rx), 0);
    }

    #[test]
    fn test_osc_uses_current_cursor() {
        let (acc, _flush_rx, _host_rx) = accumulator();

        acc.on_move_cursor(Position::new(5, 0), Position::origin(), true);
        assert!(acc.on_osc(133, "A"));
        acc.on_move_cursor(Position::new(5, 10), Position::origin(), true);
        assert!(acc.on_osc(133, "B"));

        let batch = acc.take_batch();
        assert_eq!(batch.segments.len(), 1);
        assert_eq!(batch.segments[0].row, 5);
        assert_eq!(batch.segments[0].segment.start_col, 0);
        assert_eq!(batch.segments[0].segment.end_col, 10);
    }

    #[test]
    fn test_osc_clipboard_goes_to_host() {
        let (acc, _flush_rx, mut host_rx) = accumulator();

        assert!(acc.on_osc(52, "c;SGVsbG8="));
        match host_rx.try_recv() {
            Ok(HostEvent::ClipboardCopy { selection, text }) => {
                assert_eq!(selection, "c");
                assert_eq!(text, "Hello");
            }
            other => panic!("expected clipboard event, got {other:?}"),
        }
    }

    #[test]
    fn test_osc_unknown_command_not_handled() {
        let (acc, mut flush_rx, _host_rx) = accumulator();
        assert!(!acc.on_osc(7, "file:///home"));
        assert_eq!(drain(&mut flush_rx), 0);
    }

    fn arbitrary_region() -> impl Strategy<Value = DamageRegion> {
        (0u16..30, 0u16..30, 0u16..90, 0u16..90)
            .prop_map(|(r1, r2, c1, c2)| DamageRegion::new(r1.min(r2), r1.max(r2), c1.min(c2), c1.max(c2)))
    }

    proptest! {
        /// The pending list never exceeds the cap, and every damaged cell
        /// stays covered by the coalesced set.
        #[test]
        fn damage_union_is_covered_and_bounded(regions in prop::collection::vec(arbitrary_region(), 1..200)) {
            let (acc, _flush_rx, _host_rx) = accumulator();

            for region in &regions {
                acc.on_damage(*region);
            }

            let pending = acc.pending_damage();
            prop_assert!(pending.len() <= 100);

            let dims = Dimensions::new(24, 80);
            for region in &regions {
                let clamped = region.clamp_to(dims);
                for row in clamped.rows() {
                    for col in clamped.start_col..clamped.end_col {
                        let pos = termscreen_core::Position::new(row, col);
                        prop_assert!(
                            pending.iter().any(|p| p.contains(pos)),
                            "cell ({row},{col}) lost from damage set"
                        );
                    }
                }
            }
        }
    }
}
