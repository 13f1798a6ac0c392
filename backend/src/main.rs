mod config;
mod handlers;
mod routes;
mod state;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env();
    tracing::info!("Starting Pressroom backend server");
    tracing::info!("Document store: {}", config.docstore_url);
    tracing::info!("Auth provider: {}", config.auth_url);

    let app_state = state::AppState::new(&config)?;
    let app = routes::create_router(app_state);

    let addr = config.listen_addr();
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
