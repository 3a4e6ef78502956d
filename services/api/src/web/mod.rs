pub mod auth;
pub mod collections;
pub mod flashcards;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod validation;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
use state::AppState;

/// Builds the API router. Everything except registration, login, logout and the
/// health probe requires a bearer token.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/collections",
            get(collections::list_collections_handler)
                .post(collections::create_collection_handler),
        )
        .route(
            "/collections/{id}",
            get(collections::get_collection_handler)
                .put(collections::update_collection_handler)
                .delete(collections::delete_collection_handler),
        )
        .route(
            "/collections/{id}/flashcards",
            get(flashcards::list_flashcards_handler).post(flashcards::create_flashcard_handler),
        )
        .route("/flashcards/{id}", delete(flashcards::delete_flashcard_handler))
        .route(
            "/flashcards/generate",
            post(flashcards::generate_flashcards_handler),
        )
        .route(
            "/flashcards/generation-logs",
            get(flashcards::generation_logs_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
