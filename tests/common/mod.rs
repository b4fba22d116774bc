//! Shared integration test harness.
//!
//! Boots the full application (router, middleware stack, auth layer) against
//! a throwaway SQLite database, runs the migrations, and seeds one user with
//! an issued API key. Every request in a test goes through the exact
//! production wiring from [`backoffice_api::app_router`].

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use backoffice_api::config::AppConfig;
use backoffice_api::{db, AppState};

pub struct TestApp {
    pub state: AppState,
    pub user_id: Uuid,
    pub api_key: String,
    router: Router,
    // Held so the backing database file outlives the test
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    /// Builds the application against a fresh database.
    ///
    /// Each call gets its own temporary directory, so tests are isolated
    /// from each other and safe to run in parallel.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("backoffice_test.db");
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let pool = db::establish_connection(&database_url)
            .await
            .expect("connect to test database");
        db::run_migrations(&pool).await.expect("run migrations");

        let config = AppConfig::new(
            database_url,
            "127.0.0.1".to_string(),
            0,
            "development".to_string(),
        );
        let state = AppState::new(Arc::new(pool), config);

        let user_id = Uuid::new_v4();
        let api_key = state
            .auth
            .rotate_key(user_id)
            .await
            .expect("issue test API key")
            .key;

        let router = backoffice_api::app_router(state.clone(), CorsLayer::permissive());

        Self {
            state,
            user_id,
            api_key,
            router,
            _db_dir: db_dir,
        }
    }

    /// Sends one request through the full middleware stack.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("dispatch request")
    }

    /// Sends a request authenticated with the seeded key.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.api_key.as_str()))
            .await
    }
}
