//! Card lifecycle orchestration: validation, persistence, and the coupled
//! filesystem side effects.
//!
//! File moves and deletes are best-effort by contract: they are logged and
//! skipped on failure, and never abort the owning database operation.

use tokio::sync::Mutex;
use tracing::{info, warn};

use cardforge_store::{Database, NewCard, NewGenerationAttempt, StoreError};

use crate::error::ServerError;
use crate::file_store::{sanitize_component, FileStore};
use crate::schemas::{CardData, CardGenerationRequest, CardSaveRequest};

/// Filename prefix for images uploaded through the generated-image endpoint.
const GENERATED_PREFIX: &str = "gen_";

/// Directory token used when a card has no usable series value.
const DEFAULT_SERIES_DIR: &str = "default";

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check the four required card fields.  Whitespace-only values count as
/// empty; no other field is constrained.
pub fn validate_card(data: &CardData) -> Result<(), ServerError> {
    let required = [
        (&data.card_name, "Card name is required."),
        (&data.card_type, "Type is required."),
        (&data.attribute, "Attribute is required."),
        (&data.rarity, "Rarity is required."),
    ];

    for (value, message) in required {
        if value.trim().is_empty() {
            return Err(ServerError::Validation(message.to_string()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Validate the request, render the prompt, and record the attempt in the
/// generation history.  History-write failures are logged, never surfaced.
pub async fn generate_card(
    db: &Mutex<Database>,
    request: &CardGenerationRequest,
) -> Result<String, ServerError> {
    let request_data = serde_json::to_value(request).ok();

    if let Err(e) = validate_card(&request.card_data) {
        record_attempt(
            db,
            NewGenerationAttempt {
                request_data,
                success: false,
                error_message: Some(e.to_string()),
                ..Default::default()
            },
        )
        .await;
        return Err(e);
    }

    let prompt = crate::prompt::render_prompt(request);

    record_attempt(
        db,
        NewGenerationAttempt {
            request_data,
            prompt: Some(prompt.clone()),
            success: true,
            ..Default::default()
        },
    )
    .await;

    Ok(prompt)
}

async fn record_attempt(db: &Mutex<Database>, attempt: NewGenerationAttempt) {
    if let Err(e) = db.lock().await.insert_generation_attempt(&attempt) {
        warn!(error = %e, "Failed to record generation attempt");
    }
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

/// Persist a card and relocate its referenced images into the per-card
/// directory.  The insert commits even when individual moves fail.
pub async fn save_card(
    db: &Mutex<Database>,
    files: &FileStore,
    request: &CardSaveRequest,
) -> Result<i64, ServerError> {
    validate_card(&request.card_data)?;

    let data = &request.card_data;
    let new_card = NewCard {
        card_name: data.card_name.clone(),
        card_number: non_empty(data.card_number.as_deref()),
        card_type: data.card_type.clone(),
        attribute: data.attribute.clone(),
        rarity: data.rarity.clone(),
        attack: non_empty(data.attack.as_deref()).unwrap_or_else(|| "0".to_string()),
        health: non_empty(data.health.as_deref()).unwrap_or_else(|| "0".to_string()),
        skill1_name: non_empty(data.skill1_name.as_deref()),
        skill1_description: non_empty(data.skill1_description.as_deref()),
        skill2_name: non_empty(data.skill2_name.as_deref()),
        skill2_description: non_empty(data.skill2_description.as_deref()),
        flavor_text: non_empty(data.flavor_text.as_deref()),
        series: non_empty(data.series.as_deref()),
        character_image_url: non_empty(request.character_image_url.as_deref()),
        background_image_url: non_empty(request.background_image_url.as_deref()),
        generated_prompt: non_empty(request.generated_prompt.as_deref()),
        generated_image_url: non_empty(request.generated_image_url.as_deref()),
    };

    let card_sn = db.lock().await.insert_card(&new_card)?;

    // Relocate each referenced image into <series>/<number>.  Per-field
    // failures are swallowed: the card record must survive regardless.
    let dest = card_directory(
        data.series.as_deref(),
        data.card_number.as_deref(),
        card_sn,
    );

    let character = relocate(files, new_card.character_image_url.as_deref(), &dest).await;
    let background = relocate(files, new_card.background_image_url.as_deref(), &dest).await;
    let generated = relocate(files, new_card.generated_image_url.as_deref(), &dest).await;

    db.lock().await.update_card_image_urls(
        card_sn,
        character.as_deref(),
        background.as_deref(),
        generated.as_deref(),
    )?;

    info!(card_sn, name = %data.card_name, "Card saved");
    Ok(card_sn)
}

/// Move one referenced file into the card directory, keeping the original
/// URL when the file is missing or the move fails.
async fn relocate(files: &FileStore, url: Option<&str>, dest: &str) -> Option<String> {
    let url = url?;
    match files.move_into(url, dest).await {
        Ok(Some(new_url)) => Some(new_url),
        Ok(None) => {
            warn!(url, "Image not found during save, keeping original reference");
            Some(url.to_string())
        }
        Err(e) => {
            warn!(url, error = %e, "Failed to move image during save");
            Some(url.to_string())
        }
    }
}

/// Directory (relative to the upload root) holding a card's files.
fn card_directory(series: Option<&str>, card_number: Option<&str>, card_sn: i64) -> String {
    let series = sanitize_component(series.unwrap_or(""), DEFAULT_SERIES_DIR);
    let number = sanitize_component(card_number.unwrap_or(""), &card_sn.to_string());
    format!("{series}/{number}")
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Delete a card, its referenced image files, and its generated-image
/// records.  Returns `false` when the card does not exist.
pub async fn delete_card(
    db: &Mutex<Database>,
    files: &FileStore,
    card_sn: i64,
) -> Result<bool, ServerError> {
    let card = match db.lock().await.get_card(card_sn) {
        Ok(card) => card,
        Err(StoreError::NotFound) => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    for url in [
        card.character_image_url.as_deref(),
        card.background_image_url.as_deref(),
        card.generated_image_url.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        files.delete_url(url).await;
    }

    // Generated-image rows have no storage-level cascade; remove them and
    // their files here so a deleted card leaves nothing behind.
    let generated = db.lock().await.delete_generated_images_for_card(card_sn)?;
    for image in &generated {
        files.delete_url(&image.image_url).await;
    }

    let deleted = db.lock().await.delete_card(card_sn)?;
    info!(card_sn, generated_images = generated.len(), "Card deleted");
    Ok(deleted)
}

// ---------------------------------------------------------------------------
// Generated images
// ---------------------------------------------------------------------------

/// Store a composite image for an existing card and register it.
pub async fn upload_generated_image(
    db: &Mutex<Database>,
    files: &FileStore,
    card_sn: i64,
    original_filename: &str,
    data: &[u8],
) -> Result<String, ServerError> {
    let card = get_card_or_404(db, card_sn).await?;

    let subdir = format!(
        "{}/gen",
        card_directory(card.series.as_deref(), card.card_number.as_deref(), card_sn)
    );
    let saved = files
        .save(data, original_filename, Some(&subdir), Some(GENERATED_PREFIX))
        .await?;

    db.lock()
        .await
        .insert_generated_image(card_sn, &saved.url)?;

    info!(card_sn, url = %saved.url, "Generated image uploaded");
    Ok(saved.url)
}

/// Delete the most recently registered generated image for a card.
pub async fn delete_latest_generated_image(
    db: &Mutex<Database>,
    files: &FileStore,
    card_sn: i64,
) -> Result<(), ServerError> {
    get_card_or_404(db, card_sn).await?;

    let latest = db
        .lock()
        .await
        .latest_generated_image(card_sn)?
        .ok_or_else(|| ServerError::NotFound(format!("No generated image for card {card_sn}")))?;

    files.delete_url(&latest.image_url).await;
    db.lock().await.delete_generated_image(latest.id)?;

    info!(card_sn, url = %latest.image_url, "Generated image deleted");
    Ok(())
}

/// All generated-image URLs for a card in registration order.
pub async fn list_generated_images(
    db: &Mutex<Database>,
    card_sn: i64,
) -> Result<Vec<String>, ServerError> {
    get_card_or_404(db, card_sn).await?;

    let images = db.lock().await.list_generated_images(card_sn)?;
    Ok(images.into_iter().map(|i| i.image_url).collect())
}

async fn get_card_or_404(
    db: &Mutex<Database>,
    card_sn: i64,
) -> Result<cardforge_store::Card, ServerError> {
    db.lock().await.get_card(card_sn).map_err(|e| match e {
        StoreError::NotFound => ServerError::NotFound(format!("Card {card_sn} does not exist")),
        other => other.into(),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::CardData;
    use tempfile::TempDir;

    async fn test_env() -> (Mutex<Database>, FileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let files = FileStore::new(
            dir.path().join("data").join("upload"),
            1024 * 1024,
            vec!["png".to_string(), "jpg".to_string()],
        )
        .await
        .unwrap();
        (Mutex::new(db), files, dir)
    }

    fn fire_drake() -> CardData {
        CardData {
            card_name: "Fire Drake".to_string(),
            card_type: "Dragon".to_string(),
            attribute: "Fire".to_string(),
            rarity: "Legendary".to_string(),
            attack: Some("50".to_string()),
            health: Some("30".to_string()),
            series: Some("First Edition".to_string()),
            card_number: Some("No 7".to_string()),
            ..Default::default()
        }
    }

    fn save_request(data: CardData) -> CardSaveRequest {
        CardSaveRequest {
            card_data: data,
            character_image_url: None,
            background_image_url: None,
            generated_prompt: None,
            generated_image_url: None,
        }
    }

    #[test]
    fn validate_reports_field_specific_messages() {
        let mut data = fire_drake();
        assert!(validate_card(&data).is_ok());

        data.card_name = "   ".to_string();
        let err = validate_card(&data).unwrap_err();
        assert_eq!(err.to_string(), "Card name is required.");

        let mut data = fire_drake();
        data.rarity = String::new();
        let err = validate_card(&data).unwrap_err();
        assert_eq!(err.to_string(), "Rarity is required.");
    }

    #[test]
    fn card_directory_sanitizes_and_falls_back() {
        assert_eq!(
            card_directory(Some("First Edition"), Some("No 7"), 3),
            "First_Edition/No_7"
        );
        assert_eq!(card_directory(None, None, 3), "default/3");
        assert_eq!(card_directory(Some("!!!"), Some("../.."), 12), "default/12");
    }

    #[tokio::test]
    async fn save_relocates_staged_images() {
        let (db, files, _dir) = test_env().await;

        let staged = files.save(b"char", "char.png", None, None).await.unwrap();

        let mut request = save_request(fire_drake());
        request.character_image_url = Some(staged.url.clone());

        let card_sn = save_card(&db, &files, &request).await.unwrap();
        let card = db.lock().await.get_card(card_sn).unwrap();

        let moved = card.character_image_url.unwrap();
        assert_eq!(
            moved,
            format!("/data/upload/First_Edition/No_7/{}", staged.filename)
        );
        assert!(files.resolve(&moved).is_some());
        assert!(!staged.path.exists());
    }

    #[tokio::test]
    async fn save_keeps_reference_when_file_is_missing() {
        let (db, files, _dir) = test_env().await;

        let mut request = save_request(fire_drake());
        request.background_image_url = Some("/data/upload/gone.png".to_string());

        let card_sn = save_card(&db, &files, &request).await.unwrap();
        let card = db.lock().await.get_card(card_sn).unwrap();

        assert_eq!(
            card.background_image_url.as_deref(),
            Some("/data/upload/gone.png")
        );
    }

    #[tokio::test]
    async fn save_rejects_invalid_data_without_inserting() {
        let (db, files, _dir) = test_env().await;

        let mut data = fire_drake();
        data.card_name = String::new();

        let err = save_card(&db, &files, &save_request(data)).await.unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
        assert_eq!(db.lock().await.count_cards().unwrap(), 0);
    }

    #[tokio::test]
    async fn generate_records_attempt_history() {
        let (db, _files, _dir) = test_env().await;

        let request = CardGenerationRequest {
            card_data: fire_drake(),
            character_image_url: None,
            background_image_url: None,
        };

        let prompt = generate_card(&db, &request).await.unwrap();
        assert!(prompt.contains("Fire Drake"));

        let mut bad = request.clone();
        bad.card_data.attribute = String::new();
        assert!(generate_card(&db, &bad).await.is_err());
    }

    #[tokio::test]
    async fn delete_card_removes_files_and_generated_images() {
        let (db, files, _dir) = test_env().await;

        let staged = files.save(b"char", "char.png", None, None).await.unwrap();
        let mut request = save_request(fire_drake());
        request.character_image_url = Some(staged.url);
        let card_sn = save_card(&db, &files, &request).await.unwrap();

        let gen_url = upload_generated_image(&db, &files, card_sn, "comp.png", b"comp")
            .await
            .unwrap();
        assert!(files.resolve(&gen_url).is_some());

        assert!(delete_card(&db, &files, card_sn).await.unwrap());

        assert!(files.resolve(&gen_url).is_none());
        assert!(db.lock().await.list_generated_images(card_sn).unwrap().is_empty());
        assert!(matches!(
            db.lock().await.get_card(card_sn),
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_missing_card_is_false_without_side_effects() {
        let (db, files, _dir) = test_env().await;
        assert!(!delete_card(&db, &files, 9999).await.unwrap());
    }

    #[tokio::test]
    async fn generated_image_lifecycle() {
        let (db, files, _dir) = test_env().await;

        let card_sn = save_card(&db, &files, &save_request(fire_drake()))
            .await
            .unwrap();

        let first = upload_generated_image(&db, &files, card_sn, "a.png", b"a")
            .await
            .unwrap();
        let second = upload_generated_image(&db, &files, card_sn, "b.png", b"b")
            .await
            .unwrap();

        assert!(first.contains("/gen/gen_"));

        // Listed oldest first.
        let listed = list_generated_images(&db, card_sn).await.unwrap();
        assert_eq!(listed, vec![first.clone(), second.clone()]);

        // Latest goes first on delete.
        delete_latest_generated_image(&db, &files, card_sn)
            .await
            .unwrap();
        assert!(files.resolve(&second).is_none());
        assert_eq!(
            list_generated_images(&db, card_sn).await.unwrap(),
            vec![first]
        );
    }

    #[tokio::test]
    async fn generated_image_endpoints_require_existing_card() {
        let (db, files, _dir) = test_env().await;

        let err = upload_generated_image(&db, &files, 9999, "a.png", b"a")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));

        let err = delete_latest_generated_image(&db, &files, 9999)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));

        let err = list_generated_images(&db, 9999).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_latest_without_images_is_not_found() {
        let (db, files, _dir) = test_env().await;

        let card_sn = save_card(&db, &files, &save_request(fire_drake()))
            .await
            .unwrap();

        let err = delete_latest_generated_image(&db, &files, card_sn)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }
}
