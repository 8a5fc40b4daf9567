//! The terminal session facade.
//!
//! `TerminalSession` wires an emulation engine to the accumulator and flush
//! task and exposes the operations a host UI drives: feeding transport
//! bytes, resizing, key dispatch and color control. Screen state comes back
//! as a read-only snapshot stream; transport-bound bytes, bell and
//! clipboard writes come back as host events.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info};

use termscreen_core::{
    Color, DamageRegion, Dimensions, Error, Result, SessionConfig, SessionId,
};
use termscreen_engine::{KeyCode, Modifiers, TerminalEngine};

use crate::accumulator::Accumulator;
use crate::flush::{FlushWorker, SharedEngine};
use crate::publisher::{SnapshotPublisher, SnapshotReceiver};

/// Events the host must act on outside the snapshot stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Bytes to forward to the underlying transport (PTY, SSH channel, ...)
    Output(Vec<u8>),
    /// The bell rang
    Bell,
    /// A program requested a clipboard write via OSC 52
    ClipboardCopy {
        /// Selection target ("c", "p", ... - empty means default clipboard)
        selection: String,
        /// Decoded text to place on the clipboard
        text: String,
    },
}

/// A single terminal session around one emulation engine.
///
/// After [`close`](TerminalSession::close) the engine is torn down and every
/// operation returns [`Error::EngineUnavailable`]; the host decides whether
/// to start a replacement session. Dropping the session closes it.
pub struct TerminalSession {
    id: SessionId,
    engine: SharedEngine,
    accumulator: Arc<Accumulator>,
    snapshots: SnapshotReceiver,
    scrollback_capacity: usize,
}

impl TerminalSession {
    /// Start a session around `engine`.
    ///
    /// Must be called inside a tokio runtime: the flush task is spawned on
    /// it. Returns the session handle, the snapshot stream, and the host
    /// event stream.
    pub fn start(
        mut engine: Box<dyn TerminalEngine>,
        config: &SessionConfig,
    ) -> Result<(Self, SnapshotReceiver, mpsc::UnboundedReceiver<HostEvent>)> {
        config.validate()?;

        let id = SessionId::new();
        let (flush_tx, flush_rx) = mpsc::unbounded_channel();
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let accumulator = Arc::new(Accumulator::new(config, flush_tx, host_tx, id));

        engine.set_callbacks(accumulator.clone());
        engine.resize(config.rows, config.cols, config.scrollback_capacity);
        let engine: SharedEngine = Arc::new(Mutex::new(Some(engine)));

        // First flush paints whatever the engine already holds
        accumulator.record_damage(DamageRegion::full(config.dimensions()));

        let (publisher, snapshots) = SnapshotPublisher::new(config.dimensions());
        let worker = FlushWorker::new(
            Arc::clone(&engine),
            Arc::clone(&accumulator),
            flush_rx,
            publisher,
            config.dimensions(),
            id,
        );
        tokio::spawn(worker.run());

        info!(
            id = %id,
            rows = config.rows,
            cols = config.cols,
            scrollback = config.scrollback_capacity,
            "session started"
        );

        let session = Self {
            id,
            engine,
            accumulator,
            snapshots: snapshots.clone(),
            scrollback_capacity: config.scrollback_capacity,
        };
        Ok((session, snapshots, host_rx))
    }

    /// The session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// A fresh handle on the snapshot stream.
    pub fn snapshots(&self) -> SnapshotReceiver {
        self.snapshots.clone()
    }

    /// Check whether the engine is still attached.
    pub fn is_open(&self) -> bool {
        self.engine.lock().unwrap().is_some()
    }

    /// Feed transport bytes into the engine. Returns bytes consumed.
    pub fn write_input(&self, data: &[u8]) -> Result<usize> {
        self.with_engine(|engine| engine.feed_bytes(data))
    }

    /// Resize the grid. The redraw funnels through the normal damage path,
    /// so a resize racing with in-flight damage coalesces instead of getting
    /// lost.
    pub fn resize(&self, rows: u16, cols: u16) -> Result<()> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        let mut guard = self.engine.lock().unwrap();
        let engine = guard.as_mut().ok_or(Error::EngineUnavailable)?;
        engine.resize(rows, cols, self.scrollback_capacity);
        // Dimensions change while the engine lock is held, so no event can
        // observe a half-applied resize
        self.accumulator.set_dimensions(Dimensions::new(rows, cols));
        info!(id = %self.id, rows, cols, "session resized");
        Ok(())
    }

    /// Dispatch a named key. Escape bytes come back via
    /// [`HostEvent::Output`].
    pub fn dispatch_key(&self, modifiers: Modifiers, key: KeyCode) -> Result<bool> {
        self.with_engine(|engine| engine.dispatch_key(modifiers, key))
    }

    /// Dispatch a character keypress.
    pub fn dispatch_character(&self, modifiers: Modifiers, ch: char) -> Result<bool> {
        self.with_engine(|engine| engine.dispatch_character(modifiers, ch))
    }

    /// Replace the 16 ANSI palette colors and repaint.
    pub fn set_ansi_palette(&self, colors: &[Color; 16]) -> Result<()> {
        self.with_engine(|engine| {
            for (index, color) in colors.iter().enumerate() {
                engine.set_palette_color(index as u8, *color);
            }
        })?;
        self.accumulator.invalidate_all();
        Ok(())
    }

    /// Replace the default foreground/background colors and repaint.
    pub fn set_default_colors(&self, fg: Color, bg: Color) -> Result<()> {
        self.with_engine(|engine| engine.set_default_colors(fg, bg))?;
        self.accumulator.set_default_colors(fg, bg);
        Ok(())
    }

    /// Apply a full color scheme: 16 palette colors plus defaults.
    pub fn apply_color_scheme(&self, colors: &[Color; 16], fg: Color, bg: Color) -> Result<()> {
        self.with_engine(|engine| {
            for (index, color) in colors.iter().enumerate() {
                engine.set_palette_color(index as u8, *color);
            }
            engine.set_default_colors(fg, bg);
        })?;
        self.accumulator.set_default_colors(fg, bg);
        Ok(())
    }

    /// Tear the engine down. Pending flushes still drain; afterwards every
    /// operation reports [`Error::EngineUnavailable`]. Idempotent.
    pub fn close(&self) {
        let engine = self.engine.lock().unwrap().take();
        if engine.is_some() {
            self.accumulator.shutdown();
            info!(id = %self.id, "session closed");
        } else {
            debug!(id = %self.id, "close on already-closed session");
        }
    }

    fn with_engine<T>(&self, f: impl FnOnce(&mut dyn TerminalEngine) -> T) -> Result<T> {
        let mut guard = self.engine.lock().unwrap();
        match guard.as_mut() {
            Some(engine) => Ok(f(engine.as_mut())),
            None => Err(Error::EngineUnavailable),
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termscreen_engine::FakeEngine;

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let fake = FakeEngine::new(5, 20);
        let (session, _snapshots, _host_rx) =
            TerminalSession::start(Box::new(fake), &SessionConfig::new(5, 20)).unwrap();

        assert!(session.is_open());
        assert!(session.write_input(b"ok").is_ok());

        session.close();
        assert!(!session.is_open());
        assert!(matches!(
            session.write_input(b"x"),
            Err(Error::EngineUnavailable)
        ));
        assert!(matches!(
            session.resize(10, 10),
            Err(Error::EngineUnavailable)
        ));
        assert!(matches!(
            session.dispatch_key(Modifiers::NONE, KeyCode::Enter),
            Err(Error::EngineUnavailable)
        ));
        assert!(matches!(
            session.dispatch_character(Modifiers::NONE, 'a'),
            Err(Error::EngineUnavailable)
        ));
        assert!(matches!(
            session.set_default_colors(Color::WHITE, Color::BLACK),
            Err(Error::EngineUnavailable)
        ));

        // Closing twice is fine
        session.close();
    }

    #[tokio::test]
    async fn test_invalid_resize_rejected() {
        let fake = FakeEngine::new(5, 20);
        let (session, _snapshots, _host_rx) =
            TerminalSession::start(Box::new(fake), &SessionConfig::new(5, 20)).unwrap();

        assert!(matches!(
            session.resize(0, 20),
            Err(Error::InvalidDimensions { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let fake = FakeEngine::new(5, 20);
        let config = SessionConfig::new(0, 0);
        assert!(TerminalSession::start(Box::new(fake), &config).is_err());
    }
}
