//! Quire CLI - Magazine subscription service
//!
//! Usage:
//!   quire init                    Initialize database
//!   quire serve --port 3000       Start web server
//!   quire status --user ID        Is this user subscribed right now?
//!   quire renewals                Subscription lines due for renewal

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            static_dir,
        } => {
            commands::cmd_serve(&cli.db, &host, port, cli.no_encrypt, static_dir.as_deref()).await
        }
        Commands::Status { user } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_status(&db, &user)
        }
        Commands::Ledger { user, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_ledger(&db, &user, json)
        }
        Commands::Renewals => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_renewals(&db)
        }
        Commands::Magazines { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_magazines_list(&db, None),
                Some(MagazinesAction::List { category }) => {
                    commands::cmd_magazines_list(&db, category.as_deref())
                }
                Some(MagazinesAction::Add {
                    category,
                    title,
                    description,
                    content_file,
                    tags,
                    image_url,
                    author,
                }) => commands::cmd_magazines_add(
                    &db,
                    &author,
                    commands::MagazineInput {
                        category,
                        title,
                        description,
                        content_file,
                        tags,
                        image_url,
                    },
                ),
            }
        }
        Commands::Audit { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_audit(&db, limit)
        }
    }
}
