//! Versioned snapshot publication.
//!
//! Snapshots go out over a `watch` channel: consumers always see the latest
//! value, may miss intermediate versions, and never observe sequence numbers
//! out of order.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::watch;

use termscreen_core::{CursorState, Dimensions, Line, Snapshot};

/// Read side of the snapshot stream.
pub type SnapshotReceiver = watch::Receiver<Arc<Snapshot>>;

/// Assembles and publishes immutable snapshots, one per flush.
pub(crate) struct SnapshotPublisher {
    tx: watch::Sender<Arc<Snapshot>>,
    sequence: u64,
    /// Scrollback is shared across snapshots until it actually changes
    scrollback: Arc<Vec<Arc<Line>>>,
}

impl SnapshotPublisher {
    /// Create a publisher whose initial value is a blank snapshot
    /// (sequence 0).
    pub(crate) fn new(dimensions: Dimensions) -> (Self, SnapshotReceiver) {
        let (tx, rx) = watch::channel(Arc::new(Snapshot::empty(dimensions)));
        (
            Self {
                tx,
                sequence: 0,
                scrollback: Arc::new(Vec::new()),
            },
            rx,
        )
    }

    /// Publish a snapshot. `scrollback_update` is `Some` only when the
    /// scrollback changed since the previous publish; otherwise the prior
    /// collection is reused without copying.
    pub(crate) fn publish(
        &mut self,
        lines: Vec<Arc<Line>>,
        scrollback_update: Option<Vec<Arc<Line>>>,
        cursor: CursorState,
        title: String,
        dimensions: Dimensions,
    ) -> u64 {
        if let Some(update) = scrollback_update {
            self.scrollback = Arc::new(update);
        }
        self.sequence += 1;
        let snapshot = Arc::new(Snapshot {
            lines,
            scrollback: Arc::clone(&self.scrollback),
            cursor,
            title,
            dimensions,
            timestamp: SystemTime::now(),
            sequence: self.sequence,
        });
        // send_replace publishes even when no consumer is currently attached
        self.tx.send_replace(snapshot);
        self.sequence
    }
}
