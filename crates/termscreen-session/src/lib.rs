//! # termscreen-session
//!
//! The session layer that runs around the emulation engine.
//!
//! This crate provides:
//! - Damage accumulation and coalescing on the engine's callback context
//! - The cross-context flush scheduler that makes engine re-queries safe
//! - Per-row line reconstruction from cell-run queries
//! - The OSC interpreter for shell integration, clipboard and annotations
//! - Semantic-segment merging and immutable snapshot publishing
//! - The `TerminalSession` facade the host drives
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on termscreen-core and
//! termscreen-engine. Engine events enter through the accumulator, are
//! batched under one coarse lock, and are turned into published snapshots by
//! a single flush task. Data flows one direction: engine → accumulator →
//! scheduler → reconstructor → segment merge → publisher → consumer.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accumulator;
pub mod flush;
pub mod osc;
pub mod publisher;
pub mod reconstruct;
pub mod session;

// Re-export commonly used types
pub use osc::{OscAction, OscInterpreter};
pub use publisher::SnapshotReceiver;
pub use session::{HostEvent, TerminalSession};
