//! Magazine commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use quire_core::db::Database;
use quire_core::models::NewMagazine;

use super::truncate;

/// Magazine fields as given on the command line
pub struct MagazineInput {
    pub category: String,
    pub title: String,
    pub description: String,
    pub content_file: PathBuf,
    pub tags: Option<String>,
    pub image_url: Option<String>,
}

fn parse_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default()
}

pub fn cmd_magazines_list(db: &Database, category: Option<&str>) -> Result<()> {
    let magazines = db
        .list_magazines(category)
        .context("Failed to list magazines")?;

    if magazines.is_empty() {
        match category {
            Some(c) => println!("No magazines in category '{}'", c),
            None => println!("No magazines yet. Add one with: quire magazines add"),
        }
        return Ok(());
    }

    for magazine in &magazines {
        println!(
            "{:>5}  {:<12} {:<40} {}",
            magazine.id,
            truncate(&magazine.category, 12),
            truncate(&magazine.title, 40),
            magazine.created_at.format("%Y-%m-%d"),
        );
        if !magazine.tags.is_empty() {
            println!("       #{}", magazine.tags.join(" #"));
        }
    }

    Ok(())
}

pub fn cmd_magazines_add(db: &Database, author: &str, input: MagazineInput) -> Result<()> {
    let content = std::fs::read_to_string(&input.content_file)
        .with_context(|| format!("Failed to read {}", input.content_file.display()))?;

    let magazine = db
        .create_magazine(
            author,
            &NewMagazine {
                category: input.category,
                title: input.title,
                description: input.description,
                content,
                tags: parse_tags(input.tags.as_deref()),
                image_url: input.image_url,
            },
        )
        .context("Failed to create magazine")?;

    db.log_audit(
        author,
        "create",
        Some("magazine"),
        Some(&magazine.id.to_string()),
        Some("source=cli"),
    )?;

    println!("✅ Published magazine #{}: {}", magazine.id, magazine.title);
    Ok(())
}
