//! services/api/src/web/collections.rs
//!
//! CRUD endpoints for flashcard collections.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use flashcards_core::library::DEFAULT_MAX_CARDS;
use flashcards_core::{Collection, CollectionUpdate, NewCollection, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::rest::{acknowledge, envelope};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateCollectionRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "default_max_cards")]
    pub max_cards: i32,
}

fn default_max_cards() -> i32 {
    DEFAULT_MAX_CARDS
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateCollectionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct CollectionResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub max_cards: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Collection> for CollectionResponse {
    fn from(c: Collection) -> Self {
        Self {
            id: c.id,
            owner_id: c.owner_id,
            name: c.name,
            description: c.description,
            is_public: c.is_public,
            max_cards: c.max_cards,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /collections - The caller's own collections, newest first
#[utoipa::path(
    get,
    path = "/collections",
    responses((status = 200, description = "Collections owned by the caller", body = [CollectionResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_collections_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> ApiResult<impl IntoResponse> {
    let collections: Vec<CollectionResponse> = state
        .library
        .list_collections(&user)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(envelope("Collections retrieved", collections))
}

/// POST /collections
#[utoipa::path(
    post,
    path = "/collections",
    request_body = CreateCollectionRequest,
    responses(
        (status = 201, description = "Collection created", body = CollectionResponse),
        (status = 400, description = "Invalid name or max_cards")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<CreateCollectionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let new = NewCollection {
        name: req.name,
        description: req.description,
        is_public: req.is_public,
        max_cards: req.max_cards,
    };
    let collection = state.library.create_collection(&user, new).await?;
    Ok((
        StatusCode::CREATED,
        envelope("Collection created", CollectionResponse::from(collection)),
    ))
}

/// GET /collections/{id} - Owners see any of theirs, others only public ones
#[utoipa::path(
    get,
    path = "/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection id")),
    responses(
        (status = 200, description = "The collection", body = CollectionResponse),
        (status = 404, description = "No such collection visible to the caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let collection = state.library.get_collection(&user, id).await?;
    Ok(envelope("Collection retrieved", CollectionResponse::from(collection)))
}

/// PUT /collections/{id}
#[utoipa::path(
    put,
    path = "/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection id")),
    request_body = UpdateCollectionRequest,
    responses(
        (status = 200, description = "Collection updated", body = CollectionResponse),
        (status = 404, description = "No such collection owned by the caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateCollectionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let update = CollectionUpdate {
        name: req.name,
        description: req.description,
        is_public: req.is_public,
    };
    let collection = state.library.update_collection(&user, id, update).await?;
    Ok(envelope("Collection updated", CollectionResponse::from(collection)))
}

/// DELETE /collections/{id} - Removes the collection and its flashcards
#[utoipa::path(
    delete,
    path = "/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection id")),
    responses(
        (status = 200, description = "Collection deleted"),
        (status = 404, description = "No such collection owned by the caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.library.delete_collection(&user, id).await?;
    Ok(acknowledge("Collection deleted"))
}
