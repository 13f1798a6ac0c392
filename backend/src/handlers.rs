use axum::{
    extract::{Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use pressroom_shared::{
    validate_article_patch, validate_new_article, Article, ArticleFilters, ArticlePatch, Category,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ArticleQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, alias = "isAggregated")]
    pub aggregated: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub articles: Vec<Article>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ArticleDetailResponse {
    pub article: Article,
    pub related: Vec<Article>,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub categories: Vec<Category>,
    pub featured: Option<Article>,
    pub trending: Vec<Article>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_articles: usize,
    pub original_articles: usize,
    pub aggregated_articles: usize,
    pub total_categories: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Gate for the admin surface: a valid bearer token resolved by the
/// auth provider is required; anything else reads as signed out.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let Some(token) = token else {
        return Err(unauthorized());
    };
    if state.auth().verify(token).await.is_none() {
        return Err(unauthorized());
    }
    Ok(next.run(request).await)
}

pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleQuery>,
) -> Json<ArticleListResponse> {
    let filters = ArticleFilters {
        category: query.category,
        search: query.search,
        is_aggregated: query.aggregated,
        limit: query.limit,
        offset: query.offset,
    };
    let articles = state.articles().list(&filters).await;
    let total = articles.len();

    Json(ArticleListResponse { articles, total })
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ArticleDetailResponse>, ApiError> {
    let Some(article) = state.articles().get_by_id(&id).await else {
        return Err(not_found("Article not found"));
    };
    let related = state
        .articles()
        .get_related(&article.id, &article.category, 3)
        .await;

    Ok(Json(ArticleDetailResponse { article, related }))
}

/// Home page payload: three independent reads joined concurrently.
pub async fn home_feed(State(state): State<AppState>) -> Json<HomeResponse> {
    let (categories, featured, trending) = tokio::join!(
        state.articles().get_categories(),
        state.articles().get_featured(),
        state.articles().get_trending(4),
    );

    Json(HomeResponse {
        categories,
        featured,
        trending,
    })
}

pub async fn list_categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    let categories = state.articles().get_categories().await;
    let total = categories.len();

    Json(CategoriesResponse { categories, total })
}

pub async fn dashboard_stats(State(state): State<AppState>) -> Json<DashboardStats> {
    let all = ArticleFilters {
        limit: Some(1000),
        ..Default::default()
    };
    let (articles, categories) =
        tokio::join!(state.articles().list(&all), state.articles().get_categories());
    let aggregated = articles.iter().filter(|a| a.is_aggregated).count();

    Json(DashboardStats {
        total_articles: articles.len(),
        original_articles: articles.len() - aggregated,
        aggregated_articles: aggregated,
        total_categories: categories.len(),
    })
}

pub async fn create_article(
    State(state): State<AppState>,
    Json(input): Json<ArticlePatch>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    validate_new_article(&input).map_err(|err| bad_request(&err.to_string()))?;

    match state.articles().create(&input).await {
        Some(article) => Ok((StatusCode::CREATED, Json(article))),
        None => Err(internal_error("Failed to save article")),
    }
}

pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ArticlePatch>,
) -> Result<Json<Article>, ApiError> {
    validate_article_patch(&input).map_err(|err| bad_request(&err.to_string()))?;

    match state.articles().update(&id, &input).await {
        Some(article) => Ok(Json(article)),
        None => Err(not_found("Article not found")),
    }
}

pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.articles().delete(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(internal_error("Failed to delete article"))
    }
}

pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| bad_request("Malformed multipart body"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.bin").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| bad_request("Failed to read upload"))?;

        let key = format!("articles/{}_{file_name}", uuid::Uuid::new_v4());
        return match state.blobs().upload(data.to_vec(), &key, true).await {
            Ok(url) => Ok(Json(UploadResponse { url })),
            Err(err) => {
                tracing::warn!("image upload failed: {err:#}");
                Err(internal_error("Failed to upload image"))
            },
        };
    }

    Err(bad_request("Missing file field"))
}

fn unauthorized() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Authentication required".to_string(),
            code: 401,
        }),
    )
}

fn not_found(message: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
            code: 404,
        }),
    )
}

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
            code: 400,
        }),
    )
}

fn internal_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
            code: 500,
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use pressroom_shared::{
        auth::AuthClient,
        blob::BlobClient,
        docstore::MemoryDocumentStore,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::{routes::create_router, state::AppState};

    fn raw_article(id: &str, category: &str, date: &str, aggregated: &str) -> Value {
        json!({
            "id": id,
            "title": format!("Post {id}"),
            "content": "<p>body</p>",
            "excerpt": "excerpt",
            "author": "Ana",
            "category": category,
            "category_name": "Rust",
            "category_color": "#111",
            "published_at": date,
            "read_time": "5 min read",
            "is_aggregated": aggregated,
            "tags": "[\"rust\"]",
            "user_id": "u1",
            "created_at": "2026-01-01T00:00:00+00:00",
            "updated_at": "2026-01-01T00:00:00+00:00",
        })
    }

    fn test_router(mem: Arc<MemoryDocumentStore>, auth_url: &str) -> axum::Router {
        let auth = AuthClient::new(auth_url, "secret").expect("auth client");
        let blobs = BlobClient::new("http://127.0.0.1:1", "secret").expect("blob client");
        create_router(AppState::with_store(mem, auth, blobs))
    }

    async fn mock_auth() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "email": "admin@example.com",
            })))
            .mount(&server)
            .await;
        server
    }

    async fn read_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn list_endpoint_filters_by_category() {
        let mem = Arc::new(MemoryDocumentStore::new());
        mem.insert_raw("articles", raw_article("a", "rust", "2026-01-02", "0")).await;
        mem.insert_raw("articles", raw_article("b", "web", "2026-01-01", "0")).await;
        let app = test_router(mem, "http://127.0.0.1:1");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/articles?category=rust")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = read_json(response).await;
        assert_eq!(payload["total"], 1);
        assert_eq!(payload["articles"][0]["id"], "a");
        assert_eq!(payload["articles"][0]["isAggregated"], false);
    }

    #[tokio::test]
    async fn detail_endpoint_returns_article_with_related() {
        let mem = Arc::new(MemoryDocumentStore::new());
        mem.insert_raw("articles", raw_article("a", "rust", "2026-01-02", "0")).await;
        mem.insert_raw("articles", raw_article("b", "rust", "2026-01-01", "0")).await;
        let app = test_router(mem, "http://127.0.0.1:1");

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/articles/a").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload["article"]["id"], "a");
        assert_eq!(payload["related"][0]["id"], "b");

        let missing = app
            .oneshot(
                Request::builder()
                    .uri("/api/articles/nope")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn home_feed_fans_out_and_skips_featured_in_trending() {
        let mem = Arc::new(MemoryDocumentStore::new());
        mem.insert_raw("articles", raw_article("new", "rust", "2026-01-03", "0")).await;
        mem.insert_raw("articles", raw_article("mid", "rust", "2026-01-02", "0")).await;
        mem.insert_raw("articles", raw_article("old", "rust", "2026-01-01", "0")).await;
        mem.insert_raw(
            "categories",
            json!({ "id": "rust", "name": "Rust", "color": "#111", "description": "", "user_id": "u1", "created_at": "" }),
        )
        .await;
        let app = test_router(mem, "http://127.0.0.1:1");

        let response = app
            .oneshot(Request::builder().uri("/api/home").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let payload = read_json(response).await;
        assert_eq!(payload["featured"]["id"], "new");
        assert_eq!(payload["trending"][0]["id"], "mid");
        assert_eq!(payload["trending"][1]["id"], "old");
        assert_eq!(payload["categories"][0]["name"], "Rust");
    }

    #[tokio::test]
    async fn admin_routes_reject_missing_or_invalid_tokens() {
        let app = test_router(Arc::new(MemoryDocumentStore::new()), "http://127.0.0.1:1");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/admin/articles")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_create_validates_then_persists() {
        let auth_server = mock_auth().await;
        let mem = Arc::new(MemoryDocumentStore::new());
        let app = test_router(mem, &auth_server.uri());

        let invalid = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/admin/articles")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, "Bearer token-1")
                    .body(Body::from(
                        serde_json::to_vec(&json!({ "content": "body" })).expect("body"),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        let payload = read_json(invalid).await;
        assert_eq!(payload["error"], "missing required field: title");

        let created = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/admin/articles")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, "Bearer token-1")
                    .body(Body::from(
                        serde_json::to_vec(&json!({
                            "title": "Hello",
                            "content": "<p>hi</p>",
                            "category": "rust",
                            "tags": ["a", "b"],
                        }))
                        .expect("body"),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(created.status(), StatusCode::CREATED);
        let article = read_json(created).await;
        assert_eq!(article["title"], "Hello");
        assert_eq!(article["tags"], json!(["a", "b"]));

        let id = article["id"].as_str().expect("id").to_string();
        let detail = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/articles/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(detail.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_update_and_delete_round_trip() {
        let auth_server = mock_auth().await;
        let mem = Arc::new(MemoryDocumentStore::new());
        mem.insert_raw("articles", raw_article("a", "rust", "2026-01-01", "0")).await;
        let app = test_router(mem, &auth_server.uri());

        let updated = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/admin/articles/a")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, "Bearer token-1")
                    .body(Body::from(
                        serde_json::to_vec(&json!({ "title": "Renamed" })).expect("body"),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(updated.status(), StatusCode::OK);
        let payload = read_json(updated).await;
        assert_eq!(payload["title"], "Renamed");
        assert_eq!(payload["author"], "Ana");

        let deleted = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/admin/articles/a")
                    .header(header::AUTHORIZATION, "Bearer token-1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let gone = app
            .oneshot(Request::builder().uri("/api/articles/a").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dashboard_stats_counts_aggregated_and_original() {
        let auth_server = mock_auth().await;
        let mem = Arc::new(MemoryDocumentStore::new());
        mem.insert_raw("articles", raw_article("a", "rust", "2026-01-01", "0")).await;
        mem.insert_raw("articles", raw_article("b", "rust", "2026-01-02", "1")).await;
        mem.insert_raw(
            "categories",
            json!({ "id": "rust", "name": "Rust", "color": "#111", "description": "", "user_id": "u1", "created_at": "" }),
        )
        .await;
        let app = test_router(mem, &auth_server.uri());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/stats")
                    .header(header::AUTHORIZATION, "Bearer token-1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload["totalArticles"], 2);
        assert_eq!(payload["aggregatedArticles"], 1);
        assert_eq!(payload["originalArticles"], 1);
        assert_eq!(payload["totalCategories"], 1);
    }
}
