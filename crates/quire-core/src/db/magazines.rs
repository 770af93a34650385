//! Magazine operations

use chrono::Utc;
use rusqlite::{params, Row};

use super::{datetime_column, format_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Magazine, MagazineSummary, NewMagazine};

/// Trim tags, drop blanks and repeats (first occurrence wins)
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

fn decode_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn map_magazine_row(row: &Row<'_>) -> rusqlite::Result<Magazine> {
    let tags: String = row.get(5)?;
    Ok(Magazine {
        id: row.get(0)?,
        category: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        content: row.get(4)?,
        tags: decode_tags(&tags),
        image_url: row.get(6)?,
        author_id: row.get(7)?,
        created_at: datetime_column(row, 8)?,
        updated_at: datetime_column(row, 9)?,
    })
}

impl Database {
    /// Create a magazine article written by `author_id`
    pub fn create_magazine(&self, author_id: &str, magazine: &NewMagazine) -> Result<Magazine> {
        let title = magazine.title.trim();
        let category = magazine.category.trim();
        if title.is_empty() {
            return Err(Error::Validation("title is required".into()));
        }
        if category.is_empty() {
            return Err(Error::Validation("category is required".into()));
        }
        if magazine.content.trim().is_empty() {
            return Err(Error::Validation("content is required".into()));
        }

        let tags = serde_json::to_string(&normalize_tags(&magazine.tags))?;
        let image_url = magazine
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let now = format_datetime(&Utc::now());

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO magazines (category, title, description, content, tags, image_url,
                                   author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                category,
                title,
                magazine.description.trim(),
                magazine.content,
                tags,
                image_url,
                author_id,
                now,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_magazine(id)?
            .ok_or_else(|| Error::NotFound(format!("Magazine {} not found after insert", id)))
    }

    /// Get a magazine with its full content
    pub fn get_magazine(&self, id: i64) -> Result<Option<Magazine>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, category, title, description, content, tags, image_url, author_id,
                   created_at, updated_at
            FROM magazines
            WHERE id = ?
            "#,
        )?;

        let mut rows = stmt.query_map(params![id], map_magazine_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List magazines newest first, optionally restricted to one category
    pub fn list_magazines(&self, category: Option<&str>) -> Result<Vec<MagazineSummary>> {
        let conn = self.conn()?;

        let (query, params_vec): (&str, Vec<Box<dyn rusqlite::ToSql>>) = match category {
            Some(cat) => (
                r#"
                SELECT id, category, title, description, tags, image_url, created_at
                FROM magazines
                WHERE category = ?
                ORDER BY created_at DESC, id DESC
                "#,
                vec![Box::new(cat.to_string())],
            ),
            None => (
                r#"
                SELECT id, category, title, description, tags, image_url, created_at
                FROM magazines
                ORDER BY created_at DESC, id DESC
                "#,
                vec![],
            ),
        };

        let mut stmt = conn.prepare(query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let magazines = stmt
            .query_map(params_refs.as_slice(), |row| {
                let tags: String = row.get(4)?;
                Ok(MagazineSummary {
                    id: row.get(0)?,
                    category: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    tags: decode_tags(&tags),
                    image_url: row.get(5)?,
                    created_at: datetime_column(row, 6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(magazines)
    }
}
