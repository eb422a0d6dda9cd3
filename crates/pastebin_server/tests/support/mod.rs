//! Shared integration-test server bootstrap helpers.
#![allow(dead_code)]

use axum_test::TestServer;
use pastebin_core::config::StorageBackend;
use pastebin_core::store::MemoryPasteStore;
use pastebin_core::ManualClock;
use pastebin_server::{create_app, open_store, AppState, Config, Pastebin};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) fn test_config_for_db_path(db_path: &Path) -> Config {
    Config {
        port: 0,
        db_path: db_path.to_str().expect("db path").to_string(),
        storage_backend: StorageBackend::Redb,
        sweep_interval_secs: 0,
        ..Config::default()
    }
}

pub(crate) fn test_server_for_config(config: Config) -> TestServer {
    let store = open_store(&config).expect("open store");
    let app = create_app(AppState::new(config, store), false);
    TestServer::new(app).expect("server")
}

pub(crate) fn setup_test_server() -> (TestServer, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config_for_db_path(temp_dir.path());
    (test_server_for_config(config), temp_dir)
}

/// In-memory server whose clock only moves when the test advances it.
pub(crate) fn setup_clocked_server() -> (TestServer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let config = Config {
        port: 0,
        storage_backend: StorageBackend::Memory,
        ..Config::default()
    };
    let pastebin = Pastebin::from_config(Arc::new(MemoryPasteStore::default()), &config)
        .with_clock(clock.clone());
    let app = create_app(AppState::with_pastebin(config, pastebin), false);
    (TestServer::new(app).expect("server"), clock)
}
