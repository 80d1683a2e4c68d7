//! Stowline CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! stowline migrate
//!
//! # Create an admin
//! stowline admin create -e ops@example.com -n "Ops Lead" -r super_admin
//!
//! # Add storage units SU-001 through SU-050
//! stowline seed storage-units --count 50
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admins
//! - `seed storage-units` - Add numbered storage units

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "stowline")]
#[command(author, version, about = "Stowline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admins
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin role (`super_admin`, `admin`, `viewer`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Add numbered storage units, skipping numbers that already exist
    StorageUnits {
        /// How many units to add
        #[arg(short, long, default_value_t = 20)]
        count: u32,

        /// Unit number prefix
        #[arg(short, long, default_value = "SU-")]
        prefix: String,
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
        Commands::Admin { action } => match action {
            AdminAction::Create { email, name, role } => {
                commands::admin::create(&email, &name, &role).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::StorageUnits { count, prefix } => {
                commands::seed::storage_units(count, &prefix).await?;
            }
        },
    }
    Ok(())
}
