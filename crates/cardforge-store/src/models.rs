//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the API layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// A persisted trading card.  The primary key `card_sn` is assigned by the
/// database on insert and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    /// Serial number (PK, autoincrement).
    pub card_sn: i64,
    /// Card name (required).
    pub card_name: String,
    /// User-supplied card number, distinct from `card_sn`.
    pub card_number: Option<String>,
    /// Card type (required).
    pub card_type: String,
    /// Card attribute (required).
    pub attribute: String,
    /// Card rarity (required).
    pub rarity: String,
    /// Attack stat, free-text (defaults to "0").
    pub attack: String,
    /// Health stat, free-text (defaults to "0").
    pub health: String,
    pub skill1_name: Option<String>,
    pub skill1_description: Option<String>,
    pub skill2_name: Option<String>,
    pub skill2_description: Option<String>,
    pub flavor_text: Option<String>,
    /// Series / creator label.
    pub series: Option<String>,
    /// Logical URL of the character image.
    pub character_image_url: Option<String>,
    /// Logical URL of the background image.
    pub background_image_url: Option<String>,
    /// Prompt text rendered at generation time.
    pub generated_prompt: Option<String>,
    /// Logical URL of the draft (first generated) image.
    pub generated_image_url: Option<String>,
    /// Set once on insert.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation.
    pub updated_at: DateTime<Utc>,
}

/// Field set for inserting a new card.  `card_sn` and the timestamps are
/// assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewCard {
    pub card_name: String,
    pub card_number: Option<String>,
    pub card_type: String,
    pub attribute: String,
    pub rarity: String,
    pub attack: String,
    pub health: String,
    pub skill1_name: Option<String>,
    pub skill1_description: Option<String>,
    pub skill2_name: Option<String>,
    pub skill2_description: Option<String>,
    pub flavor_text: Option<String>,
    pub series: Option<String>,
    pub character_image_url: Option<String>,
    pub background_image_url: Option<String>,
    pub generated_prompt: Option<String>,
    pub generated_image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// GeneratedImage
// ---------------------------------------------------------------------------

/// A composite image attached to a card after the fact.  Many records may
/// reference the same card; ordering by `created_at` (with `id` as tiebreak)
/// determines "latest" and "list" semantics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedImage {
    pub id: i64,
    /// Owning card serial number.  Not enforced at the storage level.
    pub card_sn: i64,
    /// Logical URL of the stored image file.
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// GenerationAttempt
// ---------------------------------------------------------------------------

/// History record for a card generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationAttempt {
    pub id: i64,
    /// Card the attempt belongs to, if one exists yet.
    pub card_sn: Option<i64>,
    /// Raw request payload as submitted by the client.
    pub request_data: Option<serde_json::Value>,
    /// Prompt produced by the attempt, if any.
    pub prompt: Option<String>,
    /// Image URL produced by the attempt, if any.
    pub image_url: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Field set for recording a new generation attempt.
#[derive(Debug, Clone, Default)]
pub struct NewGenerationAttempt {
    pub card_sn: Option<i64>,
    pub request_data: Option<serde_json::Value>,
    pub prompt: Option<String>,
    pub image_url: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers shared by the CRUD modules
// ---------------------------------------------------------------------------

/// Parse an RFC-3339 timestamp stored as TEXT, mapping failures to the
/// column index for diagnostics.
pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
