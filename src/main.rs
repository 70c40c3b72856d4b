// Q&A Forum Server

use axum::Router;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qa_forum::{api::create_router, app_state::AppState, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qa_forum=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    if config.orchestration.sweep_interval_secs > 0 {
        let sweeper = app_state.sweeper.clone();
        let period = Duration::from_secs(config.orchestration.sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = sweeper.sweep().await {
                    warn!("Orphan sweep failed: {}", e);
                }
            }
        });
    }

    // Build main application router
    let app = Router::new()
        .nest("/api", create_router(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = config.server_address();
    info!("Q&A forum server starting on http://{}", addr);
    info!("  POST   /api/question        - Create question");
    info!("  DELETE /api/question        - Delete question with answers, comments, votes and attachment");
    info!("  GET    /api/questions       - List questions");
    info!("  POST   /api/answer          - Create answer");
    info!("  GET    /api/health          - Health check");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
