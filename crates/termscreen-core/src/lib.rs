//! # termscreen-core
//!
//! Core types for the termscreen workspace.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other termscreen crates. It provides:
//!
//! - Geometry types (Position, Dimensions, DamageRegion)
//! - Cell and color types for the terminal grid
//! - Line and semantic-segment types
//! - Snapshot and cursor types handed to consumers
//! - Session identity and configuration
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other termscreen crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export all modules
pub mod cell;
pub mod config;
pub mod error;
pub mod geometry;
pub mod line;
pub mod session;
pub mod snapshot;

// Re-export commonly used types
pub use cell::{Cell, CellAttributes, Color};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use geometry::{DamageRegion, Dimensions, Position};
pub use line::{Line, PendingSegment, SegmentKind, SemanticSegment};
pub use session::SessionId;
pub use snapshot::{CursorShape, CursorState, Snapshot};
