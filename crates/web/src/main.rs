use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use storage::{
    Database,
    store::{MemoryStore, ResultsStore},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod extract;
mod features;
mod middleware;
mod state;

use config::{Config, StorageBackend};
use middleware::auth::ApiKeys;
use state::{AppState, UploadSettings};

#[derive(OpenApi)]
#[openapi(
    paths(
        features::events::handlers::list_events,
        features::events::handlers::get_event,
        features::events::handlers::get_event_by_slug,
        features::events::handlers::create_event,
        features::events::handlers::update_event,
        features::events::handlers::update_status,
        features::events::handlers::update_image,
        features::events::handlers::delete_event,
        features::events::handlers::upload_results,
        features::events::handlers::upload_event_results,
        features::events::handlers::list_participants,
        features::events::handlers::get_comparison,
        features::health::health,
    ),
    components(
        schemas(
            storage::dto::event::CreateEventRequest,
            storage::dto::event::UpdateEventRequest,
            storage::dto::event::UpdateStatusRequest,
            storage::dto::event::UpdateImageRequest,
            storage::dto::event::EventsResponse,
            storage::dto::participant::ParticipantsResponse,
            storage::dto::participant::ComparisonResponse,
            storage::dto::participant::UploadResult,
            storage::models::Event,
            storage::models::EventStatus,
            storage::models::Participant,
        )
    ),
    tags(
        (name = "events", description = "Event listing and administration"),
        (name = "uploads", description = "Results file ingestion"),
        (name = "participants", description = "Participant search and comparison"),
        (name = "health", description = "Liveness"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            )
        }
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ResultsStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("Cannot load DATABASE_URL env variable")?;

            tracing::info!(
                "Connecting to database at: {}",
                database_url.split('@').next_back().unwrap_or("unknown")
            );
            let db = Database::new(database_url)
                .await
                .context("Failed to initialize database")?;
            tracing::info!("Database connection established");

            tracing::info!("Running database migrations");
            db.run_migrations()
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Database migrations completed successfully");

            Ok(Arc::new(db.store()))
        }
    }
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid origin in ALLOWED_ORIGINS: {}", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting RaceCheck API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    let store = open_store(&config).await?;

    let api_keys = ApiKeys::from_comma_separated(&config.api_keys);
    if api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty, admin endpoints will reject every request");
    }

    let state = AppState::new(
        store,
        UploadSettings {
            extension: config.results_extension.clone(),
            max_bytes: config.max_upload_bytes,
        },
    );

    let app = features::router(state, api_keys)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins)?);

    let bind_address = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
