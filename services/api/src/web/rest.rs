//! services/api/src/web/rest.rs
//!
//! The response envelope shared by every handler, the health probe, and the
//! master definition for the OpenAPI specification.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::web::{auth, collections, flashcards};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        collections::list_collections_handler,
        collections::create_collection_handler,
        collections::get_collection_handler,
        collections::update_collection_handler,
        collections::delete_collection_handler,
        flashcards::list_flashcards_handler,
        flashcards::create_flashcard_handler,
        flashcards::delete_flashcard_handler,
        flashcards::generate_flashcards_handler,
        flashcards::generation_logs_handler,
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::UserResponse,
            auth::AuthResponse,
            HealthResponse,
            collections::CreateCollectionRequest,
            collections::UpdateCollectionRequest,
            collections::CollectionResponse,
            flashcards::CreateFlashcardRequest,
            flashcards::FlashcardResponse,
            flashcards::InputType,
            flashcards::GenerateFlashcardsRequest,
            flashcards::GenerateFlashcardsResponse,
            flashcards::QuotaResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Flashcards API", description = "Flashcard collections with quota-gated generation.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Response Envelope
//=========================================================================================

/// Every successful response is wrapped as `{success: true, message, data}`.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn envelope<T: Serialize>(message: impl Into<String>, data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: message.into(),
        data: Some(data),
    })
}

pub fn acknowledge(message: impl Into<String>) -> Json<Envelope<()>> {
    Json(Envelope {
        success: true,
        message: message.into(),
        data: None,
    })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
}
