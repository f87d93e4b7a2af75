//! Persistence backends for the hub snapshot.
//!
//! # Local Store
//!
//! A key-value area on this machine (the equivalent of browser local storage):
//!
//! | Key | Contents |
//! |---|---|
//! | `libertad-app-data-v4` | JSON-encoded [`Snapshot`](libertad_hub_core::Snapshot) |
//! | `libertad-app-auth-mode` | Selected identity (`libertad` or `admin`) |
//!
//! Reads and writes never fail outwardly: problems are logged and the caller
//! sees an absent value.
//!
//! # Remote Store
//!
//! A hosted JSON document (JSONBin v3) holding the same snapshot, read and
//! overwritten whole. Failures surface only as an absent snapshot or `false`.

pub mod local;
pub mod remote;

pub use local::{
    FileStore, IDENTITY_KEY, KeyValueStore, LocalStore, LocalStoreError, MemoryStore, SNAPSHOT_KEY,
    UNREADABLE_SNAPSHOT_KEY,
};
pub use remote::{JsonBinClient, RemoteError, RemoteStore};
