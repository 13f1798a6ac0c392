use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Admin surface sits behind the auth provider.
    let admin = Router::new()
        .route("/stats", get(handlers::dashboard_stats))
        .route("/articles", post(handlers::create_article))
        .route(
            "/articles/:id",
            put(handlers::update_article).delete(handlers::delete_article),
        )
        .route("/uploads", post(handlers::upload_image))
        .route_layer(middleware::from_fn_with_state(state.clone(), handlers::require_admin));

    Router::new()
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/:id", get(handlers::get_article))
        .route("/api/home", get(handlers::home_feed))
        .route("/api/categories", get(handlers::list_categories))
        .nest("/api/admin", admin)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
