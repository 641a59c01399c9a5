//! Administrative actions that run out of band, without a live engine.
//!
//! # Usage
//!
//! ```bash
//! kudos admin set-role -u tg:42 -r moderator
//! ```

use std::str::FromStr;

use tracing::info;

use kudos_core::UserRole;
use kudos_engine::EngineConfig;
use kudos_engine::db::{MIGRATOR, UserRepository, create_pool};

/// Change a user's role directly in the database.
///
/// The user may be addressed by internal id or external handle.
///
/// # Errors
///
/// Returns an error if the role string is unknown, the user does not
/// exist, or the database cannot be reached.
pub async fn set_role(user_key: &str, role: &str) -> Result<(), Box<dyn std::error::Error>> {
    let role = UserRole::from_str(role)?;

    let config = EngineConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    MIGRATOR.run(&pool).await?;

    let repo = UserRepository::new(&pool);
    let user = repo
        .get_by_key(user_key)
        .await?
        .ok_or_else(|| format!("no user matching {user_key}"))?;

    repo.set_role(&user.user_id, role).await?;
    info!(user = %user.user_id, %role, "role updated");
    println!("{} is now {role}", user.display_name);
    Ok(())
}
