//! Subcommand implementations.

pub mod expiring;
pub mod reset;
pub mod status;
pub mod sync;

use libertad_hub::config::data_dir_from_env;
use libertad_hub::store::{FileStore, LocalStore};

/// Open the local store named by `HUB_DATA_DIR`.
fn open_local() -> Result<LocalStore<FileStore>, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let files = FileStore::open(data_dir_from_env())?;
    tracing::debug!(data_dir = %files.dir().display(), "Opened local store");
    Ok(LocalStore::new(files))
}
