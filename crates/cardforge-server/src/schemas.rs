//! Request and response types for the HTTP API.
//!
//! Wire field names are camelCase to match the frontend; the card type field
//! is `type` on the wire.

use serde::{Deserialize, Serialize};

use cardforge_store::Card;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Card attributes as submitted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    #[serde(default)]
    pub card_name: String,
    #[serde(rename = "type", default)]
    pub card_type: String,
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub rarity: String,
    #[serde(default)]
    pub attack: Option<String>,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub skill1_name: Option<String>,
    #[serde(default)]
    pub skill1_description: Option<String>,
    #[serde(default)]
    pub skill2_name: Option<String>,
    #[serde(default)]
    pub skill2_description: Option<String>,
    #[serde(default)]
    pub flavor_text: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub series: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardGenerationRequest {
    pub card_data: CardData,
    #[serde(default)]
    pub character_image_url: Option<String>,
    #[serde(default)]
    pub background_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSaveRequest {
    pub card_data: CardData,
    #[serde(default)]
    pub character_image_url: Option<String>,
    #[serde(default)]
    pub background_image_url: Option<String>,
    #[serde(default)]
    pub generated_prompt: Option<String>,
    #[serde(default)]
    pub generated_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    pub message: String,
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
    pub card_sn: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub card_sn: i64,
    pub card_number: Option<String>,
    pub card_name: String,
    #[serde(rename = "type")]
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
    /// Latest composite image when one exists, otherwise the draft image.
    pub generated_image_url: Option<String>,
    /// Draft (first generated) image stored on the card row itself.
    pub draft_image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl CardResponse {
    /// Build a wire representation.  `latest_generated` is the most recent
    /// entry from the generated-images table, if any.
    pub fn from_card(card: Card, latest_generated: Option<String>) -> Self {
        let draft = card.generated_image_url.clone();
        Self {
            card_sn: card.card_sn,
            card_number: card.card_number,
            card_name: card.card_name,
            card_type: card.card_type,
            attribute: card.attribute,
            rarity: card.rarity,
            attack: card.attack,
            health: card.health,
            skill1_name: card.skill1_name,
            skill1_description: card.skill1_description,
            skill2_name: card.skill2_name,
            skill2_description: card.skill2_description,
            flavor_text: card.flavor_text,
            series: card.series,
            character_image_url: card.character_image_url,
            background_image_url: card.background_image_url,
            generated_prompt: card.generated_prompt,
            generated_image_url: latest_generated.or(card.generated_image_url),
            draft_image_url: draft,
            created_at: card.created_at.to_rfc3339(),
            updated_at: card.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardListResponse {
    pub success: bool,
    pub total: i64,
    pub cards: Vec<CardResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImageUploadResponse {
    pub success: bool,
    pub message: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImageListResponse {
    pub success: bool,
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file_url: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileResult {
    pub filename: String,
    pub saved_filename: Option<String>,
    pub file_url: Option<String>,
    pub error: Option<String>,
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleUploadResponse {
    pub success: bool,
    pub message: String,
    pub files: Vec<UploadedFileResult>,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
