//! Invariants for missing-block windows and direct-fetch requests.

use std::collections::HashSet;

use super::{Hash, MissingAncestorWindow};

/// INVARIANT: a hash never appears twice in a missing-ancestor window.
pub fn invariant_window_unique(window: &MissingAncestorWindow) -> bool {
    let mut seen = HashSet::with_capacity(window.len());
    window.iter().all(|hash| seen.insert(*hash))
}

/// INVARIANT: a window never holds more than the transit cap.
pub fn invariant_window_bounded(window: &MissingAncestorWindow, transit_cap: usize) -> bool {
    window.len() <= transit_cap
}

/// INVARIANT: requested hashes form an unbroken prefix of the window.
///
/// The window is ordered from the connect point towards the tip; a request
/// for position `k + 1` without position `k` would force out-of-order
/// assembly.
pub fn invariant_requested_prefix(window: &[Hash], requested: &[Hash]) -> bool {
    requested.len() <= window.len() && window[..requested.len()] == *requested
}

/// Window violation.
#[derive(Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    DuplicateInWindow,
    WindowOverCapacity,
    RequestNotPrefix,
}

/// Check window and request invariants together.
pub fn check_all_invariants(
    window: &MissingAncestorWindow,
    requested: &[Hash],
    transit_cap: usize,
) -> Result<(), InvariantViolation> {
    if !invariant_window_unique(window) {
        return Err(InvariantViolation::DuplicateInWindow);
    }

    if !invariant_window_bounded(window, transit_cap) {
        return Err(InvariantViolation::WindowOverCapacity);
    }

    if !invariant_requested_prefix(&window.to_vec(), requested) {
        return Err(InvariantViolation::RequestNotPrefix);
    }

    Ok(())
}
