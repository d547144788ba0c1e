mod commands;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use reader_db::{CacheConfig, ReaderDatabase, TagTable, UserTable};

use crate::commands::{Cache, Cli};

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reader_db=debug,reader_cache=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Config
    let config = CacheConfig::from_env();
    info!(
        "Using cache at {} (auto-update after {} min)",
        config.db_path.display(),
        config.auto_update_delay_minutes
    );

    let db = Arc::new(ReaderDatabase::open_with_config(&config)?);
    let cache = Cache {
        tags: TagTable::from_config(db.clone(), &config),
        users: UserTable::new(db.clone()),
        db,
    };

    let stdout = std::io::stdout();
    commands::run(&cli.command, &cache, &mut stdout.lock())
}
