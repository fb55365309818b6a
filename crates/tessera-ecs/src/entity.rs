//! Entity identifiers.
//!
//! An [`EntityId`] is an opaque 64-bit handle. Ids come from a process-wide
//! counter, so they are unique for the lifetime of the process and strictly
//! increasing in allocation order. An entity carries no data of its own; each
//! system keeps its own table keyed by the id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Next raw value handed out by [`EntityId::next`]. Zero is never allocated.
static NEXT_ENTITY: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A process-unique entity identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocate the next unused identifier.
    ///
    /// Safe to call from any thread; every call returns a value greater than
    /// all previously returned ones.
    #[inline]
    pub fn next() -> Self {
        Self(NEXT_ENTITY.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    ///
    /// The caller is responsible for only passing values that came from
    /// [`to_raw`](Self::to_raw); nothing stops two handles aliasing otherwise.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
