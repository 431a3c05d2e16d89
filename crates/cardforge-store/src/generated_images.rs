//! CRUD operations for [`GeneratedImage`] records.
//!
//! There is no storage-level cascade from `cards`, so callers that delete a
//! card are responsible for removing its generated-image rows explicitly.

use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::error::Result;
use crate::models::{parse_timestamp, GeneratedImage};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Attach a generated image to a card.  Returns the new row id.
    pub fn insert_generated_image(&self, card_sn: i64, image_url: &str) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO generated_images (card_sn, image_url, created_at)
             VALUES (?1, ?2, ?3)",
            params![card_sn, image_url, Utc::now().to_rfc3339()],
        )?;

        Ok(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// List all generated images for a card in registration order (oldest
    /// first, row id as tiebreak for same-instant inserts).
    pub fn list_generated_images(&self, card_sn: i64) -> Result<Vec<GeneratedImage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, card_sn, image_url, created_at
             FROM generated_images
             WHERE card_sn = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![card_sn], row_to_generated_image)?;

        let mut images = Vec::new();
        for row in rows {
            images.push(row?);
        }
        Ok(images)
    }

    /// Fetch the most recently registered generated image for a card, if any.
    pub fn latest_generated_image(&self, card_sn: i64) -> Result<Option<GeneratedImage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, card_sn, image_url, created_at
             FROM generated_images
             WHERE card_sn = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )?;

        let mut rows = stmt.query_map(params![card_sn], row_to_generated_image)?;
        rows.next().transpose().map_err(Into::into)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a single generated-image row.  Returns `true` if it existed.
    pub fn delete_generated_image(&self, id: i64) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM generated_images WHERE id = ?1",
            params![id],
        )?;
        Ok(affected > 0)
    }

    /// Remove every generated-image row for a card and return the removed
    /// records so the caller can clean up their files.
    pub fn delete_generated_images_for_card(&self, card_sn: i64) -> Result<Vec<GeneratedImage>> {
        let images = self.list_generated_images(card_sn)?;

        self.conn().execute(
            "DELETE FROM generated_images WHERE card_sn = ?1",
            params![card_sn],
        )?;

        Ok(images)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`GeneratedImage`].
fn row_to_generated_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<GeneratedImage> {
    let created_str: String = row.get(3)?;

    Ok(GeneratedImage {
        id: row.get(0)?,
        card_sn: row.get(1)?,
        image_url: row.get(2)?,
        created_at: parse_timestamp(3, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn list_preserves_registration_order() {
        let (db, _dir) = test_db();

        db.insert_generated_image(1, "/data/upload/s/1/gen/a.png").unwrap();
        db.insert_generated_image(1, "/data/upload/s/1/gen/b.png").unwrap();
        db.insert_generated_image(2, "/data/upload/s/2/gen/c.png").unwrap();

        let images = db.list_generated_images(1).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].image_url, "/data/upload/s/1/gen/a.png");
        assert_eq!(images[1].image_url, "/data/upload/s/1/gen/b.png");
    }

    #[test]
    fn latest_is_most_recent_insert() {
        let (db, _dir) = test_db();

        db.insert_generated_image(1, "/data/upload/s/1/gen/a.png").unwrap();
        db.insert_generated_image(1, "/data/upload/s/1/gen/b.png").unwrap();

        let latest = db.latest_generated_image(1).unwrap().unwrap();
        assert_eq!(latest.image_url, "/data/upload/s/1/gen/b.png");

        assert!(db.latest_generated_image(99).unwrap().is_none());
    }

    #[test]
    fn delete_single_row() {
        let (db, _dir) = test_db();

        let id = db.insert_generated_image(1, "/data/upload/s/1/gen/a.png").unwrap();
        assert!(db.delete_generated_image(id).unwrap());
        assert!(!db.delete_generated_image(id).unwrap());
    }

    #[test]
    fn delete_for_card_returns_removed_rows() {
        let (db, _dir) = test_db();

        db.insert_generated_image(1, "/data/upload/s/1/gen/a.png").unwrap();
        db.insert_generated_image(1, "/data/upload/s/1/gen/b.png").unwrap();
        db.insert_generated_image(2, "/data/upload/s/2/gen/c.png").unwrap();

        let removed = db.delete_generated_images_for_card(1).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(db.list_generated_images(1).unwrap().is_empty());

        // Other cards are untouched.
        assert_eq!(db.list_generated_images(2).unwrap().len(), 1);
    }
}
