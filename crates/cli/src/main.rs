//! Kudos CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending schema migrations
//! kudos migrate
//!
//! # Seed the default catalog, games, badges, and quiz questions
//! kudos seed
//!
//! # Promote a user
//! kudos admin set-role -u tg:42 -r admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Insert the default catalog, games, badges, and quiz questions
//! - `admin set-role` - Change a user's role out of band

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "kudos")]
#[command(author, version, about = "Kudos CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the default catalog, games, badges, and quiz questions
    Seed,
    /// Administrative actions
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Set a user's role
    SetRole {
        /// User id or external handle
        #[arg(short, long)]
        user: String,

        /// Role (`user`, `premium`, `vip`, `moderator`, `admin`, `super_admin`)
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::SetRole { user, role } => {
                commands::admin::set_role(&user, &role).await?;
            }
        },
    }
    Ok(())
}
