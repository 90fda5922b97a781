//! Saved collections
//!
//! A saved collection is a titled snapshot of a working sequence. Tunes are
//! stored as a JSON array so a collection survives catalog reloads intact.

use crate::models::{SavedCollection, Tune};
use crate::{time, uuid_utils, Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

/// Persist `tunes` under a freshly generated collection id
pub async fn save_collection(
    db: &Pool<Sqlite>,
    title: &str,
    tunes: &[Tune],
) -> Result<SavedCollection> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("collection title is empty".to_string()));
    }

    let collection = SavedCollection {
        id: uuid_utils::generate(),
        title: title.to_string(),
        tunes: tunes.to_vec(),
        date: time::now(),
    };

    sqlx::query(
        "INSERT INTO saved_collections (guid, title, tunes_json, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(collection.id.to_string())
    .bind(&collection.title)
    .bind(serde_json::to_string(&collection.tunes)?)
    .bind(collection.date.to_rfc3339())
    .execute(db)
    .await?;

    Ok(collection)
}

/// All saved collections, newest first
pub async fn list_collections(db: &Pool<Sqlite>) -> Result<Vec<SavedCollection>> {
    let rows = sqlx::query(
        "SELECT guid, title, tunes_json, created_at FROM saved_collections ORDER BY created_at DESC",
    )
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| {
            collection_from_parts(
                row.get("guid"),
                row.get("title"),
                row.get("tunes_json"),
                row.get("created_at"),
            )
        })
        .collect()
}

/// Fetch a single collection
pub async fn get_collection(db: &Pool<Sqlite>, id: Uuid) -> Result<SavedCollection> {
    let row = sqlx::query(
        "SELECT guid, title, tunes_json, created_at FROM saved_collections WHERE guid = ?",
    )
    .bind(id.to_string())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("collection {}", id)))?;

    collection_from_parts(
        row.get("guid"),
        row.get("title"),
        row.get("tunes_json"),
        row.get("created_at"),
    )
}

/// Delete a collection; returns whether it existed
pub async fn delete_collection(db: &Pool<Sqlite>, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM saved_collections WHERE guid = ?")
        .bind(id.to_string())
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn collection_from_parts(
    guid: String,
    title: String,
    tunes_json: String,
    created_at: String,
) -> Result<SavedCollection> {
    let id = uuid_utils::parse(&guid)
        .map_err(|e| Error::Internal(format!("Invalid collection UUID '{}': {}", guid, e)))?;
    let date = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Invalid collection timestamp '{}': {}", created_at, e)))?
        .with_timezone(&Utc);

    Ok(SavedCollection {
        id,
        title,
        tunes: serde_json::from_str(&tunes_json)?,
        date,
    })
}
