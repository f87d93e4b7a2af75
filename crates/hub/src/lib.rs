//! Libertad Hub library.
//!
//! The application controller, its local and remote stores, and the JSON API
//! that exposes them. The binary in `main.rs` wires these together; the CLI
//! and the integration tests reuse them directly.
//!
//! # Persistence
//!
//! - Local: a directory of key files (see [`store::local`])
//! - Remote: one JSONBin document (see [`store::remote`])
//!
//! Both hold the same [`Snapshot`](libertad_hub_core::Snapshot). They are
//! reconciled once when [`AppController::start`] runs; afterwards every edit
//! is written locally at once and uploaded after a quiet period.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod controller;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;

pub use config::{ConfigError, HubConfig, RemoteConfig};
pub use controller::AppController;
pub use error::AppError;
pub use state::{AppState, HubController};
