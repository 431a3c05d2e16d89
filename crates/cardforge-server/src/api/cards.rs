//! Card endpoints: generation, save, list, delete, and the generated-image
//! sub-resources.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;

use crate::api::AppState;
use crate::error::ServerError;
use crate::schemas::{
    CardGenerationRequest, CardListResponse, CardResponse, CardSaveRequest,
    GeneratedImageListResponse, GeneratedImageUploadResponse, GenerationResponse, ListParams,
    MessageResponse, SaveResponse,
};
use crate::service;

pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<CardGenerationRequest>,
) -> Result<Json<GenerationResponse>, ServerError> {
    let prompt = service::generate_card(&state.db, &request).await?;

    Ok(Json(GenerationResponse {
        success: true,
        message: "Card generation request processed successfully.".to_string(),
        prompt: Some(prompt),
    }))
}

pub async fn save(
    State(state): State<AppState>,
    Json(request): Json<CardSaveRequest>,
) -> Result<Json<SaveResponse>, ServerError> {
    let card_sn = service::save_card(&state.db, &state.files, &request).await?;

    Ok(Json(SaveResponse {
        success: true,
        message: "Card saved successfully.".to_string(),
        card_sn: Some(card_sn),
    }))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<CardListResponse>, ServerError> {
    let db = state.db.lock().await;

    let total = db.count_cards()?;
    let cards = db.list_cards(params.skip, params.limit)?;

    let mut out = Vec::with_capacity(cards.len());
    for card in cards {
        let latest = db
            .latest_generated_image(card.card_sn)?
            .map(|image| image.image_url);
        out.push(CardResponse::from_card(card, latest));
    }

    Ok(Json(CardListResponse {
        success: true,
        total,
        cards: out,
    }))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(card_sn): Path<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    let deleted = service::delete_card(&state.db, &state.files, card_sn).await?;
    if !deleted {
        return Err(ServerError::NotFound(format!(
            "Card {card_sn} does not exist"
        )));
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "Card deleted successfully.".to_string(),
    }))
}

pub async fn upload_generated_image(
    State(state): State<AppState>,
    Path(card_sn): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<GeneratedImageUploadResponse>, ServerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {e}")))?;

            let url = service::upload_generated_image(
                &state.db,
                &state.files,
                card_sn,
                &filename,
                &data,
            )
            .await?;

            return Ok(Json(GeneratedImageUploadResponse {
                success: true,
                message: "Generated image uploaded successfully.".to_string(),
                image_url: Some(url),
            }));
        }
    }

    Err(ServerError::BadRequest(
        "Missing 'file' field in multipart form".to_string(),
    ))
}

pub async fn delete_latest_generated_image(
    State(state): State<AppState>,
    Path(card_sn): Path<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    service::delete_latest_generated_image(&state.db, &state.files, card_sn).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Generated image deleted successfully.".to_string(),
    }))
}

pub async fn list_generated_images(
    State(state): State<AppState>,
    Path(card_sn): Path<i64>,
) -> Result<Json<GeneratedImageListResponse>, ServerError> {
    let images = service::list_generated_images(&state.db, card_sn).await?;

    Ok(Json(GeneratedImageListResponse {
        success: true,
        images,
    }))
}
