//! # Adapters Module
//!
//! In-process implementations of the outbound ports.

pub mod admission;
pub mod in_flight;
pub mod memory_chain;
pub mod recording;

pub use admission::TransitCapAdmission;
pub use in_flight::MemoryInFlightIndex;
pub use memory_chain::{block_proof, target_from_compact, MemoryChainIndex};
pub use recording::{MisbehaviorReport, RecordingMisbehavior, RecordingNetwork};
