//! Startup reconciliation of a local and a remote [`Snapshot`].
//!
//! Every collection is merged as a union by identifier. What happens when
//! both sides hold the same identifier is declared per entity kind through
//! [`Reconcile::COLLISION`]:
//!
//! | Kind | Policy |
//! |---|---|
//! | [`WishlistItem`] | [`Collision::LocalWins`] |
//! | [`CosmeticProduct`] | [`Collision::LocalWins`] |
//! | [`Message`] | [`Collision::StickyRead`] |
//!
//! Wishlist entries and products are edit-mostly, so a stale remote copy
//! must not undo a local edit; a concurrent remote-only edit to the same
//! identifier is lost. Messages are append-mostly and their read flag is
//! monotonic, so "read on either side" is kept.

use std::collections::HashMap;

use crate::types::{CosmeticProduct, Message, Snapshot, WishlistItem};

/// Rule applied when a local and a remote record share an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    /// Keep the local record as-is.
    LocalWins,
    /// Keep the local record, but it is read if either side is read.
    StickyRead,
}

impl Collision {
    fn resolve<T: Reconcile>(self, local: &T, remote: &T) -> T {
        match self {
            Self::LocalWins => local.clone(),
            Self::StickyRead => {
                let mut merged = local.clone();
                if remote.is_read() {
                    merged.mark_read();
                }
                merged
            }
        }
    }
}

/// An entity kind that can be merged by identifier.
pub trait Reconcile: Clone {
    /// Collision policy for this kind.
    const COLLISION: Collision;

    /// Identifier used as the merge key.
    fn key(&self) -> &str;

    /// Read flag consulted by [`Collision::StickyRead`].
    ///
    /// Required so that no kind can declare `StickyRead` without wiring its
    /// flag. Kinds without one return `false`.
    fn is_read(&self) -> bool;

    /// Set the read flag for [`Collision::StickyRead`]. A no-op for kinds
    /// without one.
    fn mark_read(&mut self);
}

impl Reconcile for WishlistItem {
    const COLLISION: Collision = Collision::LocalWins;

    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn is_read(&self) -> bool {
        false
    }

    fn mark_read(&mut self) {}
}

impl Reconcile for CosmeticProduct {
    const COLLISION: Collision = Collision::LocalWins;

    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn is_read(&self) -> bool {
        false
    }

    fn mark_read(&mut self) {}
}

impl Reconcile for Message {
    const COLLISION: Collision = Collision::StickyRead;

    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn is_read(&self) -> bool {
        Self::is_read(self)
    }

    fn mark_read(&mut self) {
        Self::mark_read(self);
    }
}

/// Union two collections by identifier.
///
/// The mapping is seeded from `remote`, then every `local` record is applied
/// under `T::COLLISION`. Output keeps first-insertion order: remote records
/// first, then local-only records in local order. Duplicate identifiers
/// within one side collapse onto a single entry.
#[must_use]
pub fn merge_by_id<T: Reconcile>(local: &[T], remote: &[T]) -> Vec<T> {
    let mut slots: HashMap<&str, usize> = HashMap::with_capacity(local.len() + remote.len());
    let mut merged: Vec<T> = Vec::with_capacity(local.len() + remote.len());

    for item in remote {
        if let Some(existing) = slots.get(item.key()).and_then(|&i| merged.get_mut(i)) {
            *existing = item.clone();
        } else {
            slots.insert(item.key(), merged.len());
            merged.push(item.clone());
        }
    }

    for item in local {
        if let Some(existing) = slots.get(item.key()).and_then(|&i| merged.get_mut(i)) {
            *existing = T::COLLISION.resolve(item, existing);
        } else {
            slots.insert(item.key(), merged.len());
            merged.push(item.clone());
        }
    }

    merged
}

/// Merge a local and a remote snapshot into one.
///
/// Never fails. Messages come out newest first; `last_updated` is set to
/// `now_ms` rather than inherited from either input.
#[must_use]
pub fn reconcile(local: &Snapshot, remote: &Snapshot, now_ms: i64) -> Snapshot {
    let mut mailbox = merge_by_id(&local.mailbox, &remote.mailbox);
    mailbox.sort_by(|a, b| b.date.cmp(&a.date));

    Snapshot {
        wishlist: merge_by_id(&local.wishlist, &remote.wishlist),
        makeup: merge_by_id(&local.makeup, &remote.makeup),
        mailbox,
        last_updated: now_ms,
    }
}
