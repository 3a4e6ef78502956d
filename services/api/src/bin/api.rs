//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        db::DbAdapter, generator_llm::OpenAiFlashcardAdapter, jwt::JwtCredentialService,
        password::Argon2PasswordService,
    },
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let mut openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    if let Some(base) = &config.openai_api_base {
        openai_config = openai_config.with_api_base(base);
    }
    let generator = Arc::new(OpenAiFlashcardAdapter::new(
        Client::with_config(openai_config),
        config.generation_model.clone(),
        config.provider_timeout,
    ));
    let credentials = Arc::new(JwtCredentialService::new(&config.jwt)?);
    let passwords = Arc::new(Argon2PasswordService::new());

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(db_adapter, credentials, passwords, generator));

    // --- 5. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api_router = web::router(app_state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
