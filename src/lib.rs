pub mod audit;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod logger;
pub mod models;
pub mod rate_limiter;
pub mod store;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::token::TokenSigner;
use config::AppConfig;
use rate_limiter::RateLimiter;
use store::{CatalogStore, CredentialStore, OrderLedger};

/// Multipart framing and text fields on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub tokens: TokenSigner,
    pub login_limiter: Arc<RateLimiter>,
    pub credentials: CredentialStore,
    pub catalog: CatalogStore,
    pub ledger: OrderLedger,
}

impl AppState {
    /// `config` must already have passed `AppConfig::validate`.
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        let security = &config.security;
        let tokens = TokenSigner::new(config.jwt_secret(), security.token_ttl_hours);
        let login_limiter = RateLimiter::new(
            security.max_login_attempts,
            chrono::Duration::minutes(security.lockout_duration_mins),
        );
        let credentials =
            CredentialStore::new(db.clone(), security.bcrypt_cost, security.min_password_length);
        let catalog = CatalogStore::new(db.clone(), config.catalog.max_image_bytes);
        let ledger = OrderLedger::new(db.clone());

        Self {
            db,
            config: Arc::new(config),
            tokens,
            login_limiter: Arc::new(login_limiter),
            credentials,
            catalog,
            ledger,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.server.cors_allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .server
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };
    let body_limit = state.catalog.max_image_bytes() + FORM_OVERHEAD_BYTES;

    let api = Router::new()
        .route("/login", post(handlers::auth::login))
        // Catalog
        .route(
            "/products",
            get(handlers::product::list_products).post(handlers::product::create_product),
        )
        .route("/products/:id", delete(handlers::product::delete_product))
        .route("/products/:id/image", get(handlers::product::product_image))
        .route(
            "/categories",
            get(handlers::product::list_categories).post(handlers::product::create_category),
        )
        .route("/categories/:id", delete(handlers::product::delete_category))
        // Orders
        .route(
            "/orders",
            get(handlers::order::list_orders).post(handlers::order::create_order),
        )
        .route("/orders/:id", delete(handlers::order::delete_order))
        .route("/orders/:id/status", put(handlers::order::update_order_status))
        .route("/orders/:id/items", post(handlers::order::add_order_item))
        .route(
            "/order-items/:id",
            put(handlers::order::update_order_item).delete(handlers::order::delete_order_item),
        )
        // Users
        .route("/users", post(handlers::user::create_user))
        .route(
            "/users/me",
            get(handlers::user::me).put(handlers::user::update_me),
        )
        .route("/stats", get(handlers::stats::stats));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until SIGINT/SIGTERM.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let address = state.config.bind_address();
    let app = build_router(state);

    let listener = TcpListener::bind(&address).await?;
    tracing::info!(target: "APP", "Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(target: "APP", "Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(target: "APP", error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!(target: "APP", "Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!(target: "APP", "Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(target: "APP", error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
