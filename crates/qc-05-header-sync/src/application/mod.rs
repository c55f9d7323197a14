//! # Application Module
//!
//! Application services orchestrating the algorithms and outbound ports.

pub mod processor;

pub use processor::{ChainState, HeaderProcessor};
