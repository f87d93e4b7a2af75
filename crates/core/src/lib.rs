//! Libertad Hub Core - Shared types library.
//!
//! This crate provides the types and pure logic used across all Libertad Hub
//! components:
//! - `hub` - Application controller, stores, and JSON API
//! - `cli` - Command-line tools for sync, reset, and reports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no file
//! access, no HTTP clients. This keeps the reconciliation rules testable in
//! isolation and usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Entity records, newtype IDs, closed-set enums, and the [`Snapshot`]
//! - [`reconcile`] - Merge of a local and a remote [`Snapshot`]

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod reconcile;
pub mod types;

pub use reconcile::{Collision, Reconcile, merge_by_id, reconcile};
pub use types::*;
