use std::io;

use rusty_lending_catalog::adapters::json_file::SnapshotStore as JsonFileSnapshotStore;
use rusty_lending_catalog::application::catalog::LendingCatalog;
use rusty_lending_catalog::cli;
use rusty_lending_catalog::ports::SnapshotStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DATA_FILE: &str = "lending-catalog.json";

fn main() -> io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_lending_catalog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_file =
        std::env::var("LENDING_DATA_FILE").unwrap_or_else(|_| DEFAULT_DATA_FILE.into());
    tracing::info!(path = %data_file, "Using snapshot file");

    let store = JsonFileSnapshotStore::new(&data_file);

    // Restore prior state; any load or integrity failure means "start fresh"
    let mut catalog = match store.load() {
        Some(snapshot) => match LendingCatalog::from_snapshot(snapshot) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot failed integrity checks, starting fresh");
                LendingCatalog::new()
            }
        },
        None => LendingCatalog::new(),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    cli::run(&mut catalog, &store, &mut stdin.lock(), &mut stdout.lock())
}
