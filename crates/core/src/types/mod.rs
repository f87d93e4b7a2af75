//! Core types for Libertad Hub.
//!
//! This module provides the persisted entity records and type-safe wrappers
//! around the domain's identifiers and closed sets.

pub mod cosmetic;
pub mod id;
pub mod lenient;
pub mod message;
pub mod snapshot;
pub mod status;
pub mod wishlist;

pub use cosmetic::{CosmeticProduct, Expiry, ExpiryStatus, NewCosmetic};
pub use id::*;
pub use message::Message;
pub use snapshot::{DecodedSnapshot, Snapshot, SnapshotCounts, migrate_legacy_messages, now_ms};
pub use status::*;
pub use wishlist::WishlistItem;
