//! v001 -- Initial schema creation.
//!
//! Creates the three core tables: `cards`, `generated_images`, and
//! `generation_attempts`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Cards
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS cards (
    card_sn              INTEGER PRIMARY KEY AUTOINCREMENT,
    card_name            TEXT NOT NULL,
    card_number          TEXT,                -- user-supplied, not the PK
    card_type            TEXT NOT NULL,
    attribute            TEXT NOT NULL,
    rarity               TEXT NOT NULL,
    attack               TEXT NOT NULL DEFAULT '0',
    health               TEXT NOT NULL DEFAULT '0',
    skill1_name          TEXT,
    skill1_description   TEXT,
    skill2_name          TEXT,
    skill2_description   TEXT,
    flavor_text          TEXT,
    series               TEXT,
    character_image_url  TEXT,
    background_image_url TEXT,
    generated_prompt     TEXT,
    generated_image_url  TEXT,
    created_at           TEXT NOT NULL,       -- ISO-8601 / RFC-3339
    updated_at           TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cards_card_name ON cards(card_name);

-- ----------------------------------------------------------------
-- Generated images (composites attached to a card after the fact)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS generated_images (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    card_sn    INTEGER NOT NULL,              -- logical FK -> cards(card_sn), not enforced
    image_url  TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_generated_images_card_ts
    ON generated_images(card_sn, created_at);

-- ----------------------------------------------------------------
-- Generation attempt history
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS generation_attempts (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    card_sn       INTEGER,                    -- nullable: attempts can predate the card row
    request_data  TEXT,                       -- JSON payload
    prompt        TEXT,
    image_url     TEXT,
    success       INTEGER NOT NULL DEFAULT 1, -- boolean 0/1
    error_message TEXT,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_generation_attempts_card_sn
    ON generation_attempts(card_sn);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
