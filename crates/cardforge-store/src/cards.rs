//! CRUD operations for [`Card`] records.

use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{parse_timestamp, Card, NewCard};

const CARD_COLUMNS: &str = "card_sn, card_name, card_number, card_type, attribute, rarity, \
     attack, health, skill1_name, skill1_description, skill2_name, skill2_description, \
     flavor_text, series, character_image_url, background_image_url, generated_prompt, \
     generated_image_url, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new card and return the serial number assigned by SQLite.
    pub fn insert_card(&self, card: &NewCard) -> Result<i64> {
        let now = Utc::now().to_rfc3339();

        self.conn().execute(
            "INSERT INTO cards (card_name, card_number, card_type, attribute, rarity,
                                attack, health, skill1_name, skill1_description,
                                skill2_name, skill2_description, flavor_text, series,
                                character_image_url, background_image_url,
                                generated_prompt, generated_image_url,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                     ?16, ?17, ?18, ?19)",
            params![
                card.card_name,
                card.card_number,
                card.card_type,
                card.attribute,
                card.rarity,
                card.attack,
                card.health,
                card.skill1_name,
                card.skill1_description,
                card.skill2_name,
                card.skill2_description,
                card.flavor_text,
                card.series,
                card.character_image_url,
                card.background_image_url,
                card.generated_prompt,
                card.generated_image_url,
                now,
                now,
            ],
        )?;

        Ok(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single card by serial number.
    pub fn get_card(&self, card_sn: i64) -> Result<Card> {
        self.conn()
            .query_row(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE card_sn = ?1"),
                params![card_sn],
                row_to_card,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List cards ordered by serial number descending (newest first),
    /// paginated by an offset/limit pair.
    pub fn list_cards(&self, skip: u32, limit: u32) -> Result<Vec<Card>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards
             ORDER BY card_sn DESC
             LIMIT ?2 OFFSET ?1"
        ))?;

        let rows = stmt.query_map(params![skip, limit], row_to_card)?;

        let mut cards = Vec::new();
        for row in rows {
            cards.push(row?);
        }
        Ok(cards)
    }

    /// Count all cards, independent of any pagination.
    pub fn count_cards(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Rewrite the three image reference fields after the move-on-save step
    /// and refresh `updated_at`.
    pub fn update_card_image_urls(
        &self,
        card_sn: i64,
        character_image_url: Option<&str>,
        background_image_url: Option<&str>,
        generated_image_url: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        let affected = self.conn().execute(
            "UPDATE cards
             SET character_image_url = ?2,
                 background_image_url = ?3,
                 generated_image_url = ?4,
                 updated_at = ?5
             WHERE card_sn = ?1",
            params![
                card_sn,
                character_image_url,
                background_image_url,
                generated_image_url,
                now,
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a card by serial number.  Returns `true` if a row was deleted.
    pub fn delete_card(&self, card_sn: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM cards WHERE card_sn = ?1", params![card_sn])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Card`].
fn row_to_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<Card> {
    let created_str: String = row.get(18)?;
    let updated_str: String = row.get(19)?;

    Ok(Card {
        card_sn: row.get(0)?,
        card_name: row.get(1)?,
        card_number: row.get(2)?,
        card_type: row.get(3)?,
        attribute: row.get(4)?,
        rarity: row.get(5)?,
        attack: row.get(6)?,
        health: row.get(7)?,
        skill1_name: row.get(8)?,
        skill1_description: row.get(9)?,
        skill2_name: row.get(10)?,
        skill2_description: row.get(11)?,
        flavor_text: row.get(12)?,
        series: row.get(13)?,
        character_image_url: row.get(14)?,
        background_image_url: row.get(15)?,
        generated_prompt: row.get(16)?,
        generated_image_url: row.get(17)?,
        created_at: parse_timestamp(18, &created_str)?,
        updated_at: parse_timestamp(19, &updated_str)?,
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

    fn sample_card(name: &str) -> NewCard {
        NewCard {
            card_name: name.to_string(),
            card_type: "Dragon".to_string(),
            attribute: "Fire".to_string(),
            rarity: "Legendary".to_string(),
            attack: "50".to_string(),
            health: "30".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn insert_assigns_sequential_serials() {
        let (db, _dir) = test_db();

        let first = db.insert_card(&sample_card("Fire Drake")).unwrap();
        let second = db.insert_card(&sample_card("Ice Wyrm")).unwrap();

        assert!(second > first);
    }

    #[test]
    fn get_round_trip() {
        let (db, _dir) = test_db();

        let sn = db.insert_card(&sample_card("Fire Drake")).unwrap();
        let card = db.get_card(sn).unwrap();

        assert_eq!(card.card_sn, sn);
        assert_eq!(card.card_name, "Fire Drake");
        assert_eq!(card.attack, "50");
        assert!(card.card_number.is_none());
    }

    #[test]
    fn get_missing_is_not_found() {
        let (db, _dir) = test_db();
        assert!(matches!(db.get_card(9999), Err(StoreError::NotFound)));
    }

    #[test]
    fn list_is_newest_first_and_count_ignores_pagination() {
        let (db, _dir) = test_db();

        for i in 0..5 {
            db.insert_card(&sample_card(&format!("Card {i}"))).unwrap();
        }

        let cards = db.list_cards(0, 100).unwrap();
        assert_eq!(cards.len(), 5);
        assert!(cards.windows(2).all(|w| w[0].card_sn > w[1].card_sn));

        let page = db.list_cards(1, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].card_sn, cards[1].card_sn);

        assert_eq!(db.count_cards().unwrap(), 5);
    }

    #[test]
    fn update_image_urls_rewrites_references() {
        let (db, _dir) = test_db();

        let mut new_card = sample_card("Fire Drake");
        new_card.character_image_url = Some("/data/upload/staging/char.png".to_string());
        let sn = db.insert_card(&new_card).unwrap();

        db.update_card_image_urls(
            sn,
            Some("/data/upload/default/1/char.png"),
            None,
            None,
        )
        .unwrap();

        let card = db.get_card(sn).unwrap();
        assert_eq!(
            card.character_image_url.as_deref(),
            Some("/data/upload/default/1/char.png")
        );
        assert!(card.background_image_url.is_none());
        assert!(card.updated_at >= card.created_at);
    }

    #[test]
    fn update_missing_card_is_not_found() {
        let (db, _dir) = test_db();
        assert!(matches!(
            db.update_card_image_urls(42, None, None, None),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn delete_reports_existence() {
        let (db, _dir) = test_db();

        let sn = db.insert_card(&sample_card("Fire Drake")).unwrap();
        assert!(db.delete_card(sn).unwrap());
        assert!(!db.delete_card(sn).unwrap());
    }
}
