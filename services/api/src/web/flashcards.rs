//! services/api/src/web/flashcards.rs
//!
//! Manual flashcard endpoints plus the quota-gated generation endpoint.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use flashcards_core::{Flashcard, GenerationMode, GenerationRequest, NewFlashcard, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::rest::{acknowledge, envelope};
use crate::web::state::AppState;
use crate::web::validation;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateFlashcardRequest {
    pub front: String,
    pub back: String,
    pub video_url: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardResponse {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub front: String,
    pub back: String,
    pub video_url: Option<String>,
    pub created_by_generator: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Flashcard> for FlashcardResponse {
    fn from(card: Flashcard) -> Self {
        Self {
            id: card.id,
            collection_id: card.collection_id,
            front: card.front,
            back: card.back,
            video_url: card.video_url,
            created_by_generator: card.created_by_generator,
            created_at: card.created_at,
        }
    }
}

/// How the generator should read `content`.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Free text to extract 3-10 pairs from.
    Text,
    /// A subject (at least 10 characters) to write 10 pairs about.
    Topic,
}

impl From<InputType> for GenerationMode {
    fn from(input: InputType) -> Self {
        match input {
            InputType::Text => GenerationMode::Text,
            InputType::Topic => GenerationMode::Topic,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateFlashcardsRequest {
    pub input_type: InputType,
    pub content: String,
    pub collection_id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateFlashcardsResponse {
    pub flashcards: Vec<FlashcardResponse>,
    pub count: usize,
    pub generated_today: u32,
}

#[derive(Serialize, ToSchema)]
pub struct QuotaResponse {
    pub date: NaiveDate,
    pub generated_today: u32,
    pub daily_limit: u32,
    pub remaining: u32,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /collections/{id}/flashcards - In creation order
#[utoipa::path(
    get,
    path = "/collections/{id}/flashcards",
    params(("id" = Uuid, Path, description = "Collection id")),
    responses(
        (status = 200, description = "Flashcards in the collection", body = [FlashcardResponse]),
        (status = 404, description = "No such collection visible to the caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_flashcards_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(collection_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let cards: Vec<FlashcardResponse> = state
        .library
        .list_flashcards(&user, collection_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(envelope("Flashcards retrieved", cards))
}

/// POST /collections/{id}/flashcards - Manual cards are free of quota
#[utoipa::path(
    post,
    path = "/collections/{id}/flashcards",
    params(("id" = Uuid, Path, description = "Collection id")),
    request_body = CreateFlashcardRequest,
    responses(
        (status = 201, description = "Flashcard created", body = FlashcardResponse),
        (status = 400, description = "Invalid card content or video URL"),
        (status = 404, description = "No such collection owned by the caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_flashcard_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(collection_id): Path<Uuid>,
    payload: Result<Json<CreateFlashcardRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let new = NewFlashcard {
        front: req.front,
        back: req.back,
        video_url: validation::video_url(req.video_url)?,
    };
    let card = state
        .library
        .create_flashcard(&user, collection_id, new)
        .await?;
    Ok((
        StatusCode::CREATED,
        envelope("Flashcard created", FlashcardResponse::from(card)),
    ))
}

/// DELETE /flashcards/{id}
#[utoipa::path(
    delete,
    path = "/flashcards/{id}",
    params(("id" = Uuid, Path, description = "Flashcard id")),
    responses(
        (status = 200, description = "Flashcard deleted"),
        (status = 404, description = "No such flashcard owned by the caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_flashcard_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.library.delete_flashcard(&user, id).await?;
    Ok(acknowledge("Flashcard deleted"))
}

/// POST /flashcards/generate - Runs one generation against today's quota
#[utoipa::path(
    post,
    path = "/flashcards/generate",
    request_body = GenerateFlashcardsRequest,
    responses(
        (status = 201, description = "Flashcards generated and saved", body = GenerateFlashcardsResponse),
        (status = 400, description = "Content too short"),
        (status = 404, description = "No such collection owned by the caller"),
        (status = 429, description = "Daily generation limit reached"),
        (status = 502, description = "The generator failed or produced nothing usable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn generate_flashcards_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<GenerateFlashcardsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let request = GenerationRequest {
        mode: req.input_type.into(),
        content: req.content,
        collection_id: req.collection_id,
    };

    let outcome = state.pipeline.generate(&user, request).await?;
    let flashcards: Vec<FlashcardResponse> =
        outcome.flashcards.into_iter().map(Into::into).collect();
    let count = flashcards.len();

    Ok((
        StatusCode::CREATED,
        envelope(
            format!("Generated {} flashcards", count),
            GenerateFlashcardsResponse {
                flashcards,
                count,
                generated_today: outcome.generated_today,
            },
        ),
    ))
}

/// GET /flashcards/generation-logs - Today's usage against the plan limit
#[utoipa::path(
    get,
    path = "/flashcards/generation-logs",
    responses((status = 200, description = "Quota for the current day", body = QuotaResponse)),
    security(("bearer_auth" = []))
)]
pub async fn generation_logs_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> ApiResult<impl IntoResponse> {
    let status = state.ledger.remaining(&user).await?;
    Ok(envelope(
        "Generation quota retrieved",
        QuotaResponse {
            date: state.ledger.today(),
            generated_today: status.generated_today,
            daily_limit: status.daily_limit,
            remaining: status.remaining,
        },
    ))
}
