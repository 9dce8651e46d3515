#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use shop_admin::config::{AppConfig, Environment};
use shop_admin::database::{connection::init_db, seed::run_seed};
use shop_admin::models::product::CreateProductPayload;
use shop_admin::models::user::Role;
use shop_admin::{build_router, AppState};

pub const ADMIN_EMAIL: &str = "admin@local.test";
pub const ADMIN_PASSWORD: &str = "Admin123!";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _dir: TempDir,
}

/// Fresh app on its own SQLite file, with the admin seeded.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Like `spawn_app`, with a hook to adjust the config before start-up.
pub async fn spawn_app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("shop-test.db");

    let mut config = AppConfig::default();
    config.environment = Environment::Development;
    config.database.url = format!("sqlite:{}", db_path.display());
    config.database.min_connections = 1;
    config.database.max_connections = 4;
    config.security.jwt_secret = Some("integration-test-secret".into());
    config.security.bcrypt_cost = 4;
    config.seed.admin_email = ADMIN_EMAIL.into();
    config.seed.admin_password = Some(ADMIN_PASSWORD.into());
    config.seed.sample_data = false;
    configure(&mut config);
    config.validate().unwrap();

    let pool = init_db(&config.database).await.unwrap();
    let state = AppState::new(pool, config);
    run_seed(&state.db, &state.credentials, &state.config.seed)
        .await
        .unwrap();

    TestApp {
        router: build_router(state.clone()),
        state,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/api/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Create a regular user and return `(id, token)`.
    pub async fn user(&self, email: &str) -> (i64, String) {
        let user = self
            .state
            .credentials
            .create_user("Shopper", email, "Passw0rd!", Role::User)
            .await
            .unwrap();
        let token = self.login(email, "Passw0rd!").await;
        (user.id, token)
    }

    pub async fn product(&self, name: &str, price: f64) -> i64 {
        self.state
            .catalog
            .create_product(
                CreateProductPayload {
                    name: Some(name.into()),
                    price: Some(price),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap()
            .id
    }

    pub async fn order_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.state.db)
            .await
            .unwrap()
    }

    pub async fn item_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(&self.state.db)
            .await
            .unwrap()
    }
}
