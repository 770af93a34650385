//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_encrypt: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Quire web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let config = quire_server::ServerConfig::from_env();
    println!("   🍪 Session cookie: {}", config.session_cookie);
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} (QUIRE_ALLOWED_ORIGINS)",
            config.allowed_origins.join(", ")
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }

    // Fail before binding if nobody can sign in
    let auth = quire_server::auth_provider_from_env()?;
    println!("   🔐 Auth provider: {}", auth.name());

    let gateway = quire_server::gateway_from_env()?;
    match &gateway {
        Some(gateway) => println!("   💳 Payment gateway: {}", gateway.name()),
        None => println!("   ⚠️  Payment gateway not configured (PORTONE_API_SECRET)"),
    }

    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;
    quire_server::serve_with_config(db, host, port, static_dir_str, config, auth, gateway).await?;

    Ok(())
}
