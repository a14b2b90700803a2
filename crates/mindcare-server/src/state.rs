use mindcare_core::config::Config;
use mindcare_core::store::Store;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub store: Arc<Store>,
    pub config: Arc<Config>,
    pub event_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Load the config and open the database of an initialized root.
    ///
    /// redb holds an exclusive lock on the file, so one state (and one
    /// router) owns the store for the life of the process.
    pub fn open(root: PathBuf) -> mindcare_core::Result<Self> {
        let config = Config::load(&root)?;
        let store = Store::open_root(&root)?;
        let (tx, _) = broadcast::channel(64);
        Ok(Self {
            root,
            store: Arc::new(store),
            config: Arc::new(config),
            event_tx: tx,
        })
    }

    /// Tell SSE subscribers that something changed. Having no subscriber is
    /// not an error.
    pub fn notify(&self) {
        let _ = self.event_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_requires_initialized_root() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            AppState::open(dir.path().to_path_buf()),
            Err(mindcare_core::CareError::NotInitialized)
        ));
    }

    #[test]
    fn open_loads_config_and_store() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".mindcare")).unwrap();
        Config::new("campus").save(dir.path()).unwrap();

        let state = AppState::open(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.config.service.name, "campus");
        assert!(!mindcare_core::directory::has_admin(&state.store).unwrap());
        state.notify();
    }
}
