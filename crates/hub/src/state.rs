//! Application state shared across handlers.

use std::sync::Arc;

use crate::controller::AppController;
use crate::store::{JsonBinClient, KeyValueStore};

/// Controller as wired by the server: any local key-value backend, JSONBin
/// for the remote side.
pub type HubController = AppController<Arc<dyn KeyValueStore>, JsonBinClient>;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    controller: HubController,
}

impl AppState {
    #[must_use]
    pub const fn new(controller: HubController) -> Self {
        Self { controller }
    }

    #[must_use]
    pub const fn controller(&self) -> &HubController {
        &self.controller
    }
}
