//! # termscreen-engine
//!
//! The emulation-engine boundary for termscreen.
//!
//! This crate provides:
//! - The `TerminalEngine` trait the surrounding session layer drives
//! - The `EngineCallbacks` trait engines raise screen events through
//! - Engine property and keyboard input types
//! - `FakeEngine`, a scriptable in-memory engine used by the test suites
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on termscreen-core and
//! defines the seam between an opaque VT/ANSI interpreter and the session
//! layer. The interpreter itself lives outside this workspace; anything that
//! can answer cell-run queries and raise damage events can sit behind the
//! trait.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod events;
pub mod fake;
pub mod input;

// Re-export commonly used types
pub use adapter::{CellRun, TerminalEngine};
pub use events::{EngineCallbacks, TermProp};
pub use fake::FakeEngine;
pub use input::{KeyCode, Modifiers};
