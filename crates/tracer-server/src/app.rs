//! Router and shared state
//!
//! The store handle is built once at startup and shared by every request
//! through [`AppState`].

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use tracer_core::{
    BookRepository, Config, DocumentStore, MemoryDocumentStore, SqliteDocumentStore,
    StoreBackend, SuggestionClient,
};

use crate::handlers;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub repo: BookRepository<dyn DocumentStore>,
    pub suggestions: SuggestionClient,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, suggestions: SuggestionClient) -> Self {
        Self {
            repo: BookRepository::new(store),
            suggestions,
        }
    }

    /// Open the configured store and catalog client
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.store {
            StoreBackend::Sqlite => {
                let store = SqliteDocumentStore::open(config).with_context(|| {
                    format!("Failed to open database at {:?}", config.sqlite_path())
                })?;
                Arc::new(store)
            }
            StoreBackend::Memory => Arc::new(MemoryDocumentStore::new()),
        };

        let suggestions =
            SuggestionClient::from_config(config).context("Failed to build catalog client")?;

        Ok(Self::new(store, suggestions))
    }
}

/// Build the full application router
pub fn router(state: AppState, config: &Config) -> Result<Router> {
    let cors = cors_layer(&config.allowed_origins)?;

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/books",
            get(handlers::get_books)
                .post(handlers::add_book)
                .put(handlers::update_book)
                .delete(handlers::delete_book),
        )
        .route("/books/suggestions", get(handlers::suggest_books))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// CORS policy for the browser client
///
/// A lone `*` allows any origin. Mixing `*` with explicit origins is an error.
fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = match origins {
        [only] if only.trim() == "*" => AllowOrigin::any(),
        _ => {
            if origins.iter().any(|o| o.trim() == "*") {
                anyhow::bail!("Allowed origin '*' cannot be combined with other origins");
            }
            let origins = origins
                .iter()
                .map(|o| {
                    HeaderValue::from_str(o)
                        .with_context(|| format!("Invalid allowed origin {:?}", o))
                })
                .collect::<Result<Vec<_>>>()?;
            AllowOrigin::list(origins)
        }
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::DELETE,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static(handlers::USER_ID_HEADER),
            HeaderName::from_static(handlers::BOOK_ID_HEADER),
            axum::http::header::CONTENT_TYPE,
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tracer_core::{
        BookId, CollectionPath, DocumentPath, StorageError, StorageResult, StoredDocument,
        UserId,
    };

    /// Nothing listens on the discard port
    const OFFLINE_CATALOG: &str = "http://127.0.0.1:9/volumes";

    fn test_config() -> Config {
        Config {
            store: StoreBackend::Memory,
            suggest_url: OFFLINE_CATALOG.to_string(),
            ..Config::default()
        }
    }

    fn app_with_store(store: Arc<dyn DocumentStore>) -> Router {
        let suggestions = SuggestionClient::new(OFFLINE_CATALOG).unwrap();
        router(AppState::new(store, suggestions), &test_config()).unwrap()
    }

    fn app() -> (Router, Arc<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        (app_with_store(store.clone()), store)
    }

    async fn send(
        app: &Router,
        method: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri("/books");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        call(app, request.body(body).unwrap()).await
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Store whose every write is refused and every read times out
    struct BrokenStore;

    impl DocumentStore for BrokenStore {
        fn get(&self, _path: &DocumentPath) -> StorageResult<Option<String>> {
            Err(StorageError::Busy("locked".to_string()))
        }
        fn set(&self, path: &DocumentPath, _body: &str) -> StorageResult<()> {
            Err(StorageError::DiskFull {
                location: path.to_string(),
            })
        }
        fn create(&self, path: &DocumentPath, _body: &str) -> StorageResult<()> {
            Err(StorageError::DiskFull {
                location: path.to_string(),
            })
        }
        fn delete(&self, _path: &DocumentPath) -> StorageResult<()> {
            Err(StorageError::Busy("locked".to_string()))
        }
        fn list(&self, _collection: &CollectionPath) -> StorageResult<Vec<StoredDocument>> {
            Err(StorageError::Busy("locked".to_string()))
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "UP"}));
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let (app, _) = app();

        let (status, body) = send(
            &app,
            "POST",
            &[("UserID", "u1")],
            Some(json!({"title": "Dune", "author": "Herbert", "totalPageNumbers": 412})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "post called");

        let (status, body) = send(&app, "GET", &[("UserID", "u1")], None).await;
        assert_eq!(status, StatusCode::OK);
        let books = body["books"].as_array().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0]["title"], "Dune");
        assert!(!books[0]["id"].as_str().unwrap().is_empty());
        assert!(books[0]["lastUpdatedProgress"].is_string());
        assert!(body.get("warnings").is_none());
    }

    #[tokio::test]
    async fn test_get_single_book() {
        let (app, _) = app();
        let (_, created) = send(
            &app,
            "POST",
            &[("UserID", "u1")],
            Some(json!({"title": "Emma", "author": "Austen"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) =
            send(&app, "GET", &[("UserID", "u1"), ("bookID", id.as_str())], None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());
        assert_eq!(body["author"], "Austen");
    }

    #[tokio::test]
    async fn test_get_missing_book_is_404() {
        let (app, _) = app();
        let (status, body) =
            send(&app, "GET", &[("UserID", "u1"), ("bookID", "missing")], None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn test_list_empty() {
        let (app, _) = app();
        let (status, body) = send(&app, "GET", &[("UserID", "nobody")], None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"books": []}));
    }

    #[tokio::test]
    async fn test_put_updates_book() {
        let (app, _) = app();
        let (_, created) = send(
            &app,
            "POST",
            &[("UserID", "u1")],
            Some(json!({"title": "Dune", "totalPageNumbers": 412})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "PUT",
            &[("UserID", "u1")],
            Some(json!({"id": id, "title": "Dune", "currentPageNumber": 200, "totalPageNumbers": 412})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, json!({"message": "put called"}));

        let (_, book) =
            send(&app, "GET", &[("UserID", "u1"), ("bookID", id.as_str())], None).await;
        assert_eq!(book["currentPageNumber"], 200);
    }

    #[tokio::test]
    async fn test_put_without_id_is_400() {
        let (app, _) = app();
        let (status, _) = send(
            &app,
            "PUT",
            &[("UserID", "u1")],
            Some(json!({"title": "Dune"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_missing_book_succeeds() {
        let (app, _) = app();
        for _ in 0..2 {
            let (status, body) =
                send(&app, "DELETE", &[("UserID", "u1"), ("BookID", "missing-id")], None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"message": "delete successful"}));
        }
    }

    #[tokio::test]
    async fn test_delete_removes_book() {
        let (app, _) = app();
        let (_, created) = send(
            &app,
            "POST",
            &[("UserID", "u1")],
            Some(json!({"title": "Dune"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _) =
            send(&app, "DELETE", &[("UserID", "u1"), ("BookID", id.as_str())], None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) =
            send(&app, "GET", &[("UserID", "u1"), ("bookID", id.as_str())], None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unusable_book_id_is_missing_book() {
        // The store would fail any call, so success here means it was never reached
        let app = app_with_store(Arc::new(BrokenStore));
        let long_id = "b".repeat(200);

        for raw in ["x/y", "..", long_id.as_str()] {
            let (status, body) =
                send(&app, "GET", &[("UserID", "u1"), ("bookID", raw)], None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "GET {:?}", raw);
            assert!(body["message"].as_str().unwrap().contains("not found"));

            let (status, body) =
                send(&app, "DELETE", &[("UserID", "u1"), ("BookID", raw)], None).await;
            assert_eq!(status, StatusCode::OK, "DELETE {:?}", raw);
            assert_eq!(body, json!({"message": "delete successful"}));
        }
    }

    #[tokio::test]
    async fn test_delete_without_book_id_is_400() {
        let (app, _) = app();
        let (status, _) = send(&app, "DELETE", &[("UserID", "u1")], None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (app, _) = app();
        let request = Request::post("/books")
            .header("UserID", "u1")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid book"));
    }

    #[tokio::test]
    async fn test_missing_or_invalid_user_is_400() {
        let (app, _) = app();
        let (status, _) = send(&app, "GET", &[], None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", &[("UserID", "u1/../u2")], None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let (app, _) = app();
        let (_, created) = send(
            &app,
            "POST",
            &[("UserID", "alice")],
            Some(json!({"title": "Dune"})),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (_, listing) = send(&app, "GET", &[("UserID", "bob")], None).await;
        assert_eq!(listing["books"], json!([]));

        let (status, _) =
            send(&app, "GET", &[("UserID", "bob"), ("bookID", id.as_str())], None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing_reports_unreadable_documents() {
        let (app, store) = app();
        let user = UserId::new("u1").unwrap();
        let path = CollectionPath::books_of(&user).document(&BookId::new("garbled").unwrap());
        store.set(&path, "][").unwrap();

        let (status, body) = send(&app, "GET", &[("UserID", "u1")], None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["books"], json!([]));
        assert_eq!(body["warnings"][0]["id"], "garbled");
    }

    #[tokio::test]
    async fn test_store_failures_keep_serving() {
        let app = app_with_store(Arc::new(BrokenStore));

        let (status, _) = send(
            &app,
            "POST",
            &[("UserID", "u1")],
            Some(json!({"title": "Dune"})),
        )
        .await;
        assert_eq!(status, StatusCode::EXPECTATION_FAILED);

        let (status, _) =
            send(&app, "GET", &[("UserID", "u1"), ("bookID", "b1")], None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = send(&app, "GET", &[("UserID", "u1")], None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["books"], json!([]));
        assert!(body["warnings"][0]["message"].is_string());

        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, _) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unsupported_method_is_405() {
        let (app, _) = app();
        let (status, _) = send(&app, "PATCH", &[("UserID", "u1")], None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_blank_suggestion_query() {
        let (app, _) = app();
        let request = Request::get("/books/suggestions?q=")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"books": []}));
    }

    #[tokio::test]
    async fn test_suggestion_upstream_down_is_502() {
        let (app, _) = app();
        let request = Request::get("/books/suggestions?q=dune")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&app, request).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (app, _) = app();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/books")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "PUT")
            .header("access-control-request-headers", "userid,content-type")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_wildcard_origin_allows_any() {
        let config = Config {
            allowed_origins: vec!["*".to_string()],
            ..test_config()
        };
        let state = AppState::from_config(&config).unwrap();
        let app = router(state, &config).unwrap();

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/books")
            .header("origin", "https://reader.example.com")
            .header("access-control-request-method", "GET")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );
    }

    #[test]
    fn test_wildcard_mixed_with_origins_is_rejected() {
        let config = Config {
            allowed_origins: vec!["http://localhost:3000".to_string(), "*".to_string()],
            ..test_config()
        };
        let state = AppState::from_config(&config).unwrap();
        let err = router(state, &config).unwrap_err();
        assert!(err.to_string().contains("'*'"));
    }

    #[test]
    fn test_state_from_memory_config() {
        let state = AppState::from_config(&test_config()).unwrap();
        let books = state.repo.for_user(UserId::new("u1").unwrap());
        assert!(books.list().books.is_empty());
    }

    #[test]
    fn test_state_from_sqlite_config() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().join("nested").join("data"),
            store: StoreBackend::Sqlite,
            ..test_config()
        };
        let state = AppState::from_config(&config).unwrap();
        state
            .repo
            .for_user(UserId::new("u1").unwrap())
            .add(tracer_core::Book::new("Dune", "Herbert"))
            .unwrap();
        assert!(config.sqlite_path().exists());
    }
}
