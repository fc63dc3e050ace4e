//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, RxNavAdapter},
    config::Config,
    error::ApiError,
    web::{
        router,
        state::{AppState, WorkspaceRegistry},
        ApiDoc,
    },
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
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

    // --- 3. Initialize the Terminology Adapter ---
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;
    let rxnav_adapter = Arc::new(RxNavAdapter::new(
        http_client,
        config.rxnav_base_url.clone(),
    ));
    info!("Using RxNav at {}", config.rxnav_base_url);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        accounts: db_adapter.clone(),
        catalog: db_adapter.clone(),
        history: db_adapter.clone(),
        profiles: db_adapter,
        terminology: rxnav_adapter,
        config: config.clone(),
        workspaces: Arc::new(WorkspaceRegistry::default()),
    });

    // Sweep at a tenth of the idle timeout so workspaces go shortly after expiring.
    app_state.workspaces.clone().spawn_idle_eviction(
        config.workspace_idle_timeout / 10,
        config.workspace_idle_timeout,
    );

    // --- 5. Create the Web Router ---
    let app = Router::new()
        .merge(router(app_state)?)
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
