//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and the current user.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use flashcards_core::{AuthSession, Plan, User};
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
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    #[schema(value_type = String, example = "free")]
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            plan: user.plan,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user.into(),
            access_token: session.token.token,
            token_type: "bearer".to_string(),
            expires_at: session.token.expires_at,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new account on the free plan
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid email or password too short"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let session = state.accounts.register(&req.email, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        envelope("User registered successfully", AuthResponse::from(session)),
    ))
}

/// POST /auth/login - Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let session = state.accounts.login(&req.email, &req.password).await?;

    Ok(envelope("Login successful", AuthResponse::from(session)))
}

/// POST /auth/logout - Tokens are stateless, so this only acknowledges the client
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Logout successful"))
)]
pub async fn logout_handler() -> impl IntoResponse {
    acknowledge("Logout successful")
}

/// GET /auth/me - The user behind the presented token
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(Extension(user): Extension<User>) -> impl IntoResponse {
    envelope("Current user", UserResponse::from(user))
}
