//! # Algorithms Module
//!
//! Pure header-processing steps, each operating on port traits.
//!
//! - `header_acceptor`: batch acceptance with parent continuity
//! - `ancestor_walk`: missing-ancestor discovery and the work gate
//! - `download`: window-to-request selection
//! - `availability`: per-peer best known header

pub mod ancestor_walk;
pub mod availability;
pub mod download;
pub mod header_acceptor;

pub use ancestor_walk::{find_missing_blocks, has_equal_or_more_work};
pub use availability::{process_block_availability, update_block_availability};
pub use download::{select_downloads, DownloadRequest};
pub use header_acceptor::accept_headers;
