use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use clap::Parser;
use common::{auth::auth_middleware, AppState, Config};
use database::Database;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod handlers;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    let db = Database::new(&config.database_url).await?;
    db.run_migrations().await?;

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store).with_secure(false); // Set to true in production with HTTPS

    let api_routes = Router::<Arc<AppState>>::new()
        .nest("/bills", bills::handler::bills_router(state.clone()))
        .nest("/budgets", budgets::handler::budgets_router(state.clone()))
        .nest("/goals", goals::handler::goals_router(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let app = Router::<Arc<AppState>>::new()
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/health", get(handlers::auth::health))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    if config.app_password.is_none() {
        tracing::warn!(
            "APP_PASSWORD is not set! Authentication is DISABLED. The API will accept all requests."
        );
    }
    axum::serve(listener, app).await?;

    Ok(())
}
