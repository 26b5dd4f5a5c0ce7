mod db;
pub mod models;
pub mod page;
pub mod scanner;
pub mod settings;
pub mod store;
pub mod summary;
pub mod sync;
pub mod tracker;
mod utils;

#[cfg(test)]
mod test_support;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

pub use db::Database;
pub use page::{HostPage, NavigationSignal, Overlay, Visibility};
pub use settings::{SettingsStore, TrackerSettings};
pub use store::{CourseStore, MemoryStore, StorageChange};
pub use sync::PageController;
pub use utils::logging::init as init_logging;

pub type AppController<P, O> = PageController<P, O, Database>;

/// Everything one attached tab needs.
pub struct AppState<P, O> {
    pub controller: AppController<P, O>,
    pub db: Database,
    pub settings: SettingsStore,
    listener: JoinHandle<()>,
}

impl<P: HostPage, O: Overlay> AppState<P, O> {
    /// Removes everything drawn and stops listening for store changes.
    pub async fn detach(self) {
        self.controller.shutdown().await;
        self.listener.abort();
    }
}

/// Opens the course database and settings under `data_dir` and wires a
/// controller for `page`. Must be called from inside a tokio runtime.
pub fn attach<P: HostPage, O: Overlay>(
    page: Arc<P>,
    overlay: Arc<O>,
    data_dir: &Path,
) -> Result<AppState<P, O>> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let db = Database::new(data_dir.join("vidlearn.sqlite3"))?;
    let settings = SettingsStore::new(data_dir.join("settings.json"))?;

    let controller = PageController::new(page, overlay, Arc::new(db.clone()), settings.tracker());
    let listener = controller.spawn_storage_listener();

    log::info!("VidLearn attached with data in {}", data_dir.display());

    Ok(AppState {
        controller,
        db,
        settings,
        listener,
    })
}
