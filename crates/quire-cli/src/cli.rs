//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Quire - Magazine subscriptions on an append-only payment ledger
#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Magazine subscription service with an append-only payment ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "quire.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set QUIRE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    ///
    /// Auth: SUPABASE_URL + SUPABASE_SERVICE_ROLE_KEY, or QUIRE_DEV_TOKENS for local use.
    /// Payments: PORTONE_API_SECRET.
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory of static frontend files to serve
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Show whether a user is subscribed right now
    Status {
        /// User id
        #[arg(short, long)]
        user: String,
    },

    /// List a user's ledger entries, newest first
    Ledger {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// List subscription lines whose renewal is due
    Renewals,

    /// Manage magazines
    Magazines {
        #[command(subcommand)]
        action: Option<MagazinesAction>,
    },

    /// Show the audit log
    Audit {
        /// Maximum number of entries
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum MagazinesAction {
    /// List magazines
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Publish a magazine
    Add {
        /// Category (e.g. culture, travel)
        #[arg(short, long)]
        category: String,

        /// Title
        #[arg(short, long)]
        title: String,

        /// Short description shown in listings
        #[arg(short, long, default_value = "")]
        description: String,

        /// File holding the article body
        #[arg(long)]
        content_file: PathBuf,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,

        /// Cover image URL
        #[arg(long)]
        image_url: Option<String>,

        /// Author id recorded on the magazine
        #[arg(long, default_value = "cli")]
        author: String,
    },
}
