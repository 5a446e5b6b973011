//! Wholesale CLI - User administration tools.
//!
//! # Usage
//!
//! ```bash
//! # Email an invitation to a new user
//! wholesale-cli admin invite -e buyer@example.com
//!
//! # Give an existing user the admin role
//! wholesale-cli admin promote -e owner@example.com
//!
//! # Assign a user to a customer group
//! wholesale-cli admin group -e buyer@example.com -g 2
//! ```
//!
//! # Commands
//!
//! - `admin invite` - Send an invitation link
//! - `admin promote` - Grant the admin role
//! - `admin group` - Assign a customer group

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wholesale-cli")]
#[command(author, version, about = "Wholesale storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Email an invitation that lands on the set-password page
    Invite {
        /// Email address to invite
        #[arg(short, long)]
        email: String,
    },
    /// Give an existing user the admin role
    Promote {
        /// Email address of the user
        #[arg(short, long)]
        email: String,
    },
    /// Assign a user to a customer group
    Group {
        /// Email address of the user
        #[arg(short, long)]
        email: String,

        /// Customer group ID
        #[arg(short, long)]
        group: i64,
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

async fn run(cli: Cli) -> Result<(), commands::admin::AdminError> {
    match cli.command {
        Commands::Admin { action } => match action {
            AdminAction::Invite { email } => commands::admin::invite(&email).await,
            AdminAction::Promote { email } => commands::admin::promote(&email).await,
            AdminAction::Group { email, group } => {
                commands::admin::assign_group(&email, group).await
            }
        },
    }
}
