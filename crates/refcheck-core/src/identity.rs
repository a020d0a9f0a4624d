//! Stable integer handles for records that have no persistence id yet.
//!
//! List rendering and removal need a key that survives re-renders. Saved
//! references have server ids; unsaved ones get a [`Handle`] from a
//! [`HandleRegistry`] at the moment they are created.
//!
//! # Two association modes
//!
//! - **Weak**: [`HandleRegistry::handle_of`] keys on an `Arc` allocation and
//!   holds only a `Weak` to it. Entries whose owner has been dropped are
//!   pruned, so memory tracks the number of live keys, not the number of
//!   handles ever issued.
//! - **Permanent**: [`Tag`] is a `Copy` token with no allocation to observe,
//!   so [`HandleRegistry::handle_of_tag`] keeps its entries for as long as the
//!   registry lives. A registry belongs to one editing session, which bounds
//!   the retained set to the tags minted during that session.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Number of weak entries inserted between sweeps of dead entries.
const PRUNE_INTERVAL: usize = 64;

static NEXT_TAG_SERIAL: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Session-unique integer handle. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u64);

impl Handle {
    /// Largest handle accepted from outside the session. Raw form input
    /// carries handles as signed ids, so nothing above this can round-trip.
    pub const MAX: Self = Self(u64::MAX >> 1);

    /// Wrap a raw handle value, e.g. one echoed back through a form field.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

/// Placeholder token for a record that exists only in the editing session.
///
/// Two tags created with the same label are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    serial: u64,
    label: &'static str,
}

impl Tag {
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            serial: NEXT_TAG_SERIAL.fetch_add(1, Ordering::Relaxed),
            label,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        self.label
    }
}

// ---------------------------------------------------------------------------
// HandleRegistry
// ---------------------------------------------------------------------------

struct WeakEntry {
    key: Weak<dyn Any + Send + Sync>,
    handle: Handle,
}

impl WeakEntry {
    fn is_live(&self) -> bool {
        self.key.strong_count() > 0
    }
}

/// Assigns handles in call order, starting at 1.
///
/// Confined to a single editing session; all methods take `&mut self`.
#[derive(Default)]
pub struct HandleRegistry {
    last: u64,
    weak: HashMap<usize, WeakEntry>,
    permanent: HashMap<Tag, Handle>,
    inserts_since_prune: usize,
}

impl HandleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the allocation behind `value`.
    ///
    /// Repeated calls with clones of the same `Arc` return the same handle.
    /// Value-equal values in different allocations get different handles.
    pub fn handle_of<T: Any + Send + Sync>(&mut self, value: &Arc<T>) -> Handle {
        let addr = Arc::as_ptr(value).cast::<()>() as usize;

        if let Some(entry) = self.weak.get(&addr) {
            // A dead entry at this address belonged to a freed allocation
            // that the allocator has since reused.
            if entry.is_live() {
                return entry.handle;
            }
        }

        let handle = self.next_handle();
        let erased: Arc<dyn Any + Send + Sync> = value.clone();
        self.weak.insert(
            addr,
            WeakEntry {
                key: Arc::downgrade(&erased),
                handle,
            },
        );

        self.inserts_since_prune += 1;
        if self.inserts_since_prune >= PRUNE_INTERVAL {
            self.prune();
        }
        handle
    }

    /// Handle for a placeholder tag. Entries are kept for the registry's
    /// lifetime.
    pub fn handle_of_tag(&mut self, tag: Tag) -> Handle {
        if let Some(handle) = self.permanent.get(&tag) {
            return *handle;
        }
        let handle = self.next_handle();
        self.permanent.insert(tag, handle);
        tracing::trace!(label = tag.label(), %handle, "minted tag handle");
        handle
    }

    /// Create a fresh tag and return its handle.
    pub fn mint(&mut self, label: &'static str) -> Handle {
        self.handle_of_tag(Tag::new(label))
    }

    /// Record a handle that arrived from outside (e.g. a hidden form field)
    /// so later mints never hand it out again.
    ///
    /// Handles above [`Handle::MAX`] are ignored. Mints count up from at
    /// most `Handle::MAX` and cannot reach them within a session.
    pub fn observe(&mut self, handle: Handle) {
        if handle > Handle::MAX {
            tracing::warn!(%handle, "ignoring out-of-range handle");
            return;
        }
        if handle.0 > self.last {
            self.last = handle.0;
        }
    }

    /// Drop weak entries whose owners are gone.
    pub fn prune(&mut self) {
        self.weak.retain(|_, entry| entry.is_live());
        self.inserts_since_prune = 0;
    }

    /// Number of weak entries currently tracked (live or not yet pruned).
    #[must_use]
    pub fn weak_len(&self) -> usize {
        self.weak.len()
    }

    /// Number of permanently retained tag entries.
    #[must_use]
    pub fn permanent_len(&self) -> usize {
        self.permanent.len()
    }

    const fn next_handle(&mut self) -> Handle {
        // `last` is at most `Handle::MAX` plus the mints of one session.
        self.last = self.last.saturating_add(1);
        Handle(self.last)
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("last", &self.last)
            .field("weak", &self.weak.len())
            .field("permanent", &self.permanent.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
