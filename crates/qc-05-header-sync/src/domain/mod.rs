//! # Domain Layer for Header Sync
//!
//! Pure types with no I/O. This is the innermost layer of the hexagonal
//! architecture.
//!
//! ## Contents
//!
//! - **entities**: Wire and index types (`BlockHeader`, `HeaderRecord`, `PeerId`)
//! - **value_objects**: Per-peer state and the missing-ancestor window
//! - **errors**: `HeaderSyncError`, `HeaderRejection`
//! - **invariants**: Window and request-prefix checks

mod entities;
mod errors;
mod invariants;
mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use value_objects::*;
