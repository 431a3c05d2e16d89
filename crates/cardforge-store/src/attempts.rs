//! CRUD operations for [`GenerationAttempt`] history records.
//!
//! Attempts are append-only: the service records one row per generation
//! request, successful or not, so failures remain diagnosable after the fact.

use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::error::Result;
use crate::models::{parse_timestamp, GenerationAttempt, NewGenerationAttempt};

impl Database {
    /// Record a generation attempt.  Returns the new row id.
    pub fn insert_generation_attempt(&self, attempt: &NewGenerationAttempt) -> Result<i64> {
        let request_json = attempt
            .request_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn().execute(
            "INSERT INTO generation_attempts
                 (card_sn, request_data, prompt, image_url, success, error_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                attempt.card_sn,
                request_json,
                attempt.prompt,
                attempt.image_url,
                attempt.success,
                attempt.error_message,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(self.conn().last_insert_rowid())
    }

    /// List attempts recorded for a card, oldest first.
    pub fn list_generation_attempts(&self, card_sn: i64) -> Result<Vec<GenerationAttempt>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, card_sn, request_data, prompt, image_url, success, error_message, created_at
             FROM generation_attempts
             WHERE card_sn = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![card_sn], row_to_attempt)?;

        let mut attempts = Vec::new();
        for row in rows {
            attempts.push(row?);
        }
        Ok(attempts)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`GenerationAttempt`].
fn row_to_attempt(row: &rusqlite::Row<'_>) -> rusqlite::Result<GenerationAttempt> {
    let request_json: Option<String> = row.get(2)?;
    let created_str: String = row.get(7)?;

    let request_data = request_json
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(GenerationAttempt {
        id: row.get(0)?,
        card_sn: row.get(1)?,
        request_data,
        prompt: row.get(3)?,
        image_url: row.get(4)?,
        success: row.get(5)?,
        error_message: row.get(6)?,
        created_at: parse_timestamp(7, &created_str)?,
    })
}
