//! Settings database access
//!
//! Read/write values in the `settings` table (key-value store). The
//! favorites set lives under a single fixed key as a JSON array of tune ids.

use crate::models::TuneId;
use crate::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// Settings key holding the starred tune ids
pub const FAVORITES_KEY: &str = "favorite_tune_ids";

/// Generic setting getter
///
/// Returns None if key doesn't exist in database.
/// Parses value from string using FromStr trait.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter
///
/// Inserts or updates setting in database.
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}

/// Load starred tune ids (empty when never saved)
pub async fn load_favorite_ids(db: &Pool<Sqlite>) -> Result<Vec<TuneId>> {
    match get_setting::<String>(db, FAVORITES_KEY).await? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

/// Replace the stored favorites set
pub async fn save_favorite_ids(db: &Pool<Sqlite>, ids: &[TuneId]) -> Result<()> {
    let json = serde_json::to_string(ids)?;
    set_setting(db, FAVORITES_KEY, json).await
}
