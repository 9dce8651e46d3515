//! Environment-based configuration module
//!
//! Configuration can be set via:
//! 1. Environment variables (highest priority)
//! 2. .env file
//! 3. Default values (lowest priority)

use axum::http::HeaderValue;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::{env, fs};

/// Application environment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Get environment from APP_ENV variable or default to Development
    pub fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub app_name: String,
    pub version: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
    pub seed: SeedConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allow any origin (the browser dashboard runs on its own dev server)
    pub cors_allow_any: bool,
    /// Origins allowed when `cors_allow_any` is off, e.g. `https://admin.shop.example`
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite:shop.db`
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// HMAC secret used to sign bearer tokens. `None` only before `validate()`.
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,

    /// Lifetime of an issued token
    pub token_ttl_hours: i64,

    /// bcrypt work factor
    pub bcrypt_cost: u32,

    /// Failed logins allowed per email inside one lockout window
    pub max_login_attempts: u32,

    pub lockout_duration_mins: i64,

    pub min_password_length: usize,
}

/// Catalog limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub max_image_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (error, warn, info, debug, trace or a full EnvFilter string)
    pub level: String,

    /// Use JSON format (true for production)
    pub json_format: bool,
}

/// Start-up seeding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub admin_email: String,
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
    /// Also insert a sample category, products and one order
    pub sample_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::from_env();

        Self {
            environment: env,
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "Shop Admin".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("PORT", 4000),
                cors_allow_any: env::var("CORS_ALLOW_ANY")
                    .map(|s| s == "true")
                    .unwrap_or(!env.is_production()),
                cors_origins: env::var("CORS_ORIGINS")
                    .map(|raw| {
                        raw.split(',')
                            .map(str::trim)
                            .filter(|o| !o.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },

            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:shop.db".to_string()),
                max_connections: parse_var("DB_MAX_CONNECTIONS", 10),
                min_connections: parse_var("DB_MIN_CONNECTIONS", 1),
                connect_timeout_secs: 30,
                idle_timeout_secs: 600,
            },

            security: SecurityConfig {
                jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
                token_ttl_hours: parse_var("TOKEN_TTL_HOURS", 8),
                bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST),
                max_login_attempts: 5,
                lockout_duration_mins: 15,
                min_password_length: 8,
            },

            catalog: CatalogConfig {
                max_image_bytes: parse_var("MAX_IMAGE_BYTES", 5 * 1024 * 1024),
            },

            logging: LoggingConfig {
                level: env::var("RUST_LOG").unwrap_or_else(|_| {
                    if env.is_production() { "info".to_string() } else { "debug".to_string() }
                }),
                json_format: env.is_production(),
            },

            seed: SeedConfig {
                admin_email: env::var("SEED_ADMIN_EMAIL")
                    .unwrap_or_else(|_| "admin@local.test".to_string()),
                admin_password: env::var("SEED_ADMIN_PASSWORD").ok().or_else(|| {
                    (!env.is_production()).then(|| "Admin123!".to_string())
                }),
                sample_data: env::var("SEED_SAMPLE_DATA")
                    .map(|s| s == "true")
                    .unwrap_or(false),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> Self {
        Self::default()
    }

    /// Load configuration from a .env file (if exists)
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');

                // Real environment wins over the file
                if env::var_os(key).is_none() {
                    env::set_var(key, value);
                }
            }
        }

        Some(Self::default())
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Signing secret; only valid after `validate()` succeeded.
    pub fn jwt_secret(&self) -> &[u8] {
        self.security.jwt_secret.as_deref().unwrap_or_default().as_bytes()
    }

    /// Validate configuration, filling a random signing secret in development.
    pub fn validate(&mut self) -> Result<(), String> {
        if self.security.jwt_secret.is_none() {
            if self.is_production() {
                return Err("JWT_SECRET must be set in production".to_string());
            }
            tracing::warn!(
                target: "CONFIG",
                "JWT_SECRET not set, using a random secret (tokens will not survive a restart)"
            );
            self.security.jwt_secret = Some(generate_secret());
        }

        if self.security.token_ttl_hours <= 0 {
            return Err("TOKEN_TTL_HOURS must be positive".to_string());
        }

        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err("BCRYPT_COST must be between 4 and 31".to_string());
        }

        if let Some(bad) = self
            .server
            .cors_origins
            .iter()
            .find(|o| HeaderValue::from_str(o).is_err())
        {
            return Err(format!("CORS_ORIGINS contains an invalid origin: {bad:?}"));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err("DB_MIN_CONNECTIONS cannot exceed DB_MAX_CONNECTIONS".to_string());
        }

        Ok(())
    }
}

/// 32 random bytes, base64url encoded.
fn generate_secret() -> String {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    URL_SAFE_NO_PAD.encode(key)
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(target: "CONFIG", "Invalid {key} value {raw:?}, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        let mut config = AppConfig::default();
        config.environment = Environment::Development;
        config.security.jwt_secret = None;
        config
    }

    #[test]
    fn development_gets_random_secret() {
        let mut config = base();
        config.validate().unwrap();
        let secret = config.security.jwt_secret.clone().unwrap();
        assert_eq!(secret.len(), 43);
        assert_eq!(config.jwt_secret(), secret.as_bytes());
    }

    #[test]
    fn production_requires_secret() {
        let mut config = base();
        config.environment = Environment::Production;
        assert!(config.validate().is_err());

        config.security.jwt_secret = Some("s3cret".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_bcrypt_cost() {
        let mut config = base();
        config.security.bcrypt_cost = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unparseable_cors_origin() {
        let mut config = base();
        config.server.cors_origins = vec!["https://admin.shop.test".into()];
        assert!(config.validate().is_ok());

        config.server.cors_origins.push("https://evil\n.test".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn secret_not_serialized() {
        let mut config = base();
        config.security.jwt_secret = Some("do-not-leak".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("do-not-leak"));
    }
}
