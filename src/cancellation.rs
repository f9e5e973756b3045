//! Extraction request guard: CancellationToken + generation counter.
//! A new request for a surface cancels the in-flight one and advances the
//! generation, so a late completion can never clobber a newer result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// One in-flight-request slot. Each surface owns exactly one; starting a
/// request cancels whatever was running and issues a fresh guard.
pub struct RequestSlot {
    current_token: RwLock<CancellationToken>,
    generation: Arc<AtomicU64>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self {
            current_token: RwLock::new(CancellationToken::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cancel the current request, advance the generation, and return the
    /// guard for the new request.
    pub fn begin(&self) -> RequestGuard {
        let mut token_guard = self.current_token.write();
        token_guard.cancel();
        let root = CancellationToken::new();
        let child = root.child_token();
        *token_guard = root;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RequestGuard {
            generation: Arc::clone(&self.generation),
            my_generation: generation,
            token: child,
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cancel the current request without starting a new one.
    pub fn cancel_all(&self) {
        self.current_token.read().cancel();
    }
}

impl Default for RequestSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Checked by a request before writing its result. Stale once the slot has
/// advanced past `my_generation`.
#[derive(Clone)]
pub struct RequestGuard {
    generation: Arc<AtomicU64>,
    my_generation: u64,
    token: CancellationToken,
}

impl RequestGuard {
    /// True while this request is still the newest for its surface.
    #[inline]
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.my_generation
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True while the request should keep running: not cancelled and still
    /// the newest.
    #[inline]
    pub fn should_continue(&self) -> bool {
        !self.is_cancelled() && self.is_current()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.my_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_guard_is_current_and_uncancelled() {
        let slot = RequestSlot::new();
        let guard = slot.begin();
        assert!(guard.is_current());
        assert!(!guard.is_cancelled());
        assert!(guard.should_continue());
        assert_eq!(guard.generation(), slot.current_generation());
    }

    #[test]
    fn new_request_supersedes_and_cancels_the_old_one() {
        let slot = RequestSlot::new();
        let first = slot.begin();
        let second = slot.begin();

        assert!(!first.is_current());
        assert!(first.is_cancelled());
        assert!(!first.should_continue());

        assert!(second.is_current());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn cancel_all_stops_current_without_advancing() {
        let slot = RequestSlot::new();
        let guard = slot.begin();
        let generation = slot.current_generation();

        slot.cancel_all();
        assert!(guard.is_cancelled());
        assert!(guard.is_current());
        assert_eq!(slot.current_generation(), generation);
    }

    #[test]
    fn generations_increase_monotonically() {
        let slot = RequestSlot::new();
        let g1 = slot.begin().generation();
        let g2 = slot.begin().generation();
        let g3 = slot.begin().generation();
        assert!(g1 < g2 && g2 < g3);
    }
}
