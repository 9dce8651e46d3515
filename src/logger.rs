//! Logging set-up on top of `tracing`
//!
//! - Human-readable output for development
//! - Structured JSON output for production
//! - Sensitive data redaction for anything attached to a log line or audit row
//!
//! Log lines use an uppercase `target` per subsystem (`"AUTH"`, `"ORDER"`,
//! `"CATALOG"`, `"DATABASE"`, ...), so they can be filtered with e.g.
//! `RUST_LOG=info,ORDER=debug`.

use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

const REDACTED: &str = "***REDACTED***";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), String> {
    let filter = EnvFilter::try_new(&config.level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| format!("Invalid log filter: {}", e))?;

    let builder = fmt().with_env_filter(filter).with_target(true);

    let result = if config.json_format {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| format!("Failed to initialize logger: {}", e))
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    ["key", "secret", "password", "token", "hash"]
        .iter()
        .any(|needle| key.contains(needle))
}

/// Replace the value of every sensitive field (recursively) with a marker.
pub fn redact_sensitive_data(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| {
                    if is_sensitive(&key) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, redact_sensitive_data(val))
                    }
                })
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.into_iter().map(redact_sensitive_data).collect()),
        other => other,
    }
}
