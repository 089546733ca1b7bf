//! Ticketdesk CLI - Database migrations and account bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! td-cli migrate
//!
//! # Create a password account (password may come from TD_PASSWORD)
//! td-cli user create -e admin@example.com -p 'correct horse'
//!
//! # Create a role, then grant it
//! td-cli role create -n Auditor
//! td-cli role grant -e admin@example.com -n Admin
//! ```
//!
//! With registration gated on `Admin`, `user create` followed by
//! `role grant ... -n Admin` is how the first administrator is made.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "td-cli")]
#[command(author, version, about = "Ticketdesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage roles and assignments
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a password account with no roles
    Create {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Password (read from `TD_PASSWORD` when omitted)
        #[arg(short, long, env = "TD_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// Create a role
    Create {
        /// Role name, e.g. `Auditor`
        #[arg(short, long)]
        name: String,
    },
    /// Grant an existing role to an existing user
    Grant {
        /// User's email address
        #[arg(short, long)]
        email: String,

        /// Role name
        #[arg(short, long)]
        name: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create { email, password } => {
                commands::user::create(&email, &password).await?;
            }
        },
        Commands::Role { action } => match action {
            RoleAction::Create { name } => {
                commands::role::create(&name).await?;
            }
            RoleAction::Grant { email, name } => commands::role::grant(&email, &name).await?,
        },
    }
    Ok(())
}
