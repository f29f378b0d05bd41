//! Memoized subtree sum with lock-free invalidation and repair.
//!
//! Each internal node owns one [`SumCache`]. Its state lives in a single
//! atomic word so that invalidation, validation and the end of a repair are
//! each one read-modify-write:
//!
//! ```text
//!   63                                   2   1   0
//!  ┌──────────────────────────────────────┬───┬───┐
//!  │                epoch                 │ B │ V │
//!  └──────────────────────────────────────┴───┴───┘
//!   V = cache valid, B = a repairer is storing the sum
//! ```
//!
//! # Protocol
//!
//! - **Invalidate** clears `V` and bumps the epoch.
//! - **Read** loads the state (Acquire). If `V` is set the memoized sum is
//!   loaded (Acquire) and returned.
//! - **Repair** keeps the invalid state it observed as a [`Ticket`],
//!   recomputes the sum from the children, claims `B` with a CAS from the
//!   ticket, stores the sum (Release), then clears `B` and sets `V` only if
//!   the epoch is still the ticket's epoch.
//!
//! So the sum is always written before the flag that publishes it, and an
//! invalidation that lands while a repair is running is never overwritten by
//! a stale "valid". A repairer that loses the claim, or whose epoch moved,
//! still returns the sum it computed; it just does not memoize it.
//!
//! All writes to the state word are RMWs, which keeps every earlier Release
//! in the release sequence seen by a later Acquire load.

use std::sync::atomic::{AtomicU64, Ordering};

const VALID: u64 = 1;
const BUSY: u64 = 1 << 1;
const FLAGS: u64 = VALID | BUSY;
const EPOCH_ONE: u64 = 1 << 2;

/// The invalid state a repairer observed before recomputing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

impl Ticket {
    #[inline]
    fn epoch(self) -> u64 {
        self.0 & !FLAGS
    }
}

/// Outcome of [`SumCache::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// The cache is valid and holds this sum.
    Hit(u64),
    /// The cache is invalid; recompute and hand the ticket to `publish`.
    Miss(Ticket),
}

/// Validity flag, repair claim, epoch and memoized sum of one node.
pub(crate) struct SumCache {
    state: AtomicU64,
    sum: AtomicU64,
}

impl SumCache {
    /// A fresh cache is valid and holds zero, the sum of no children.
    pub(crate) const fn new() -> Self {
        SumCache {
            state: AtomicU64::new(VALID),
            sum: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        self.state.load(Ordering::Acquire) & VALID != 0
    }

    /// The memoized sum, meaningful only while the cache is valid.
    #[inline]
    pub(crate) fn cached_sum(&self) -> u64 {
        self.sum.load(Ordering::Acquire)
    }

    /// Clears the valid flag and starts a new epoch.
    #[inline]
    pub(crate) fn invalidate(&self) {
        // The closure always returns Some, so this cannot fail.
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                Some((s & !VALID).wrapping_add(EPOCH_ONE))
            });
    }

    /// Sets the valid flag without recomputing anything.
    #[inline]
    pub(crate) fn validate(&self) {
        self.state.fetch_or(VALID, Ordering::AcqRel);
    }

    /// Returns the memoized sum if valid, or a ticket for a repair.
    #[inline]
    pub(crate) fn lookup(&self) -> Lookup {
        let state = self.state.load(Ordering::Acquire);
        if state & VALID != 0 {
            Lookup::Hit(self.sum.load(Ordering::Acquire))
        } else {
            Lookup::Miss(Ticket(state))
        }
    }

    /// Tries to memoize `sum`, computed after `ticket` was observed.
    ///
    /// Returns `true` if the cache ended up valid holding `sum`. Returns
    /// `false` if another repairer held the claim, or if the cache was
    /// invalidated or repaired since the ticket was taken.
    pub(crate) fn publish(&self, ticket: Ticket, sum: u64) -> bool {
        if ticket.0 & BUSY != 0 {
            return false;
        }

        if self
            .state
            .compare_exchange(
                ticket.0,
                ticket.0 | BUSY,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_err()
        {
            return false;
        }

        self.sum.store(sum, Ordering::Release);

        let mut validated = false;
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                validated = s & !FLAGS == ticket.epoch();
                if validated {
                    Some((s & !BUSY) | VALID)
                } else {
                    Some(s & !BUSY)
                }
            });
        validated
    }
}

impl Default for SumCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SumCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.load(Ordering::Acquire);
        f.debug_struct("SumCache")
            .field("valid", &(state & VALID != 0))
            .field("busy", &(state & BUSY != 0))
            .field("epoch", &(state >> 2))
            .field("sum", &self.sum.load(Ordering::Acquire))
            .finish()
    }
}
