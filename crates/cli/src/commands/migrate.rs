//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! kudos migrate
//! ```
//!
//! # Environment Variables
//!
//! - `KUDOS_DATABASE_URL` (or `DATABASE_URL`) - `SQLite` connection string

use tracing::info;

use kudos_engine::EngineConfig;
use kudos_engine::db::{MIGRATOR, create_pool};

/// Apply pending schema migrations.
///
/// # Errors
///
/// Returns an error if configuration is missing, the connection fails,
/// or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::from_env()?;

    info!("Connecting to database...");
    let pool = create_pool(&config.database_url).await?;

    info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    info!("Migrations complete");
    Ok(())
}
