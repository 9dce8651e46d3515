use serde_json::Value;
use sqlx::SqlitePool;

use crate::logger::redact_sensitive_data;

/// Actions written to `activity_logs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Login,
    LoginFailed,
    CreateUser,
    UpdateProfile,
    CreateProduct,
    DeleteProduct,
    CreateCategory,
    DeleteCategory,
    CreateOrder,
    DeleteOrder,
    UpdateOrderStatus,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::CreateUser => "USER_CREATE",
            AuditAction::UpdateProfile => "PROFILE_UPDATE",
            AuditAction::CreateProduct => "PRODUCT_CREATE",
            AuditAction::DeleteProduct => "PRODUCT_DELETE",
            AuditAction::CreateCategory => "CATEGORY_CREATE",
            AuditAction::DeleteCategory => "CATEGORY_DELETE",
            AuditAction::CreateOrder => "ORDER_CREATE",
            AuditAction::DeleteOrder => "ORDER_DELETE",
            AuditAction::UpdateOrderStatus => "ORDER_STATUS_UPDATE",
        }
    }
}

/// Best-effort audit write. A failed insert is logged and never fails the
/// operation being audited.
pub async fn log_action(
    db: &SqlitePool,
    user_id: Option<i64>,
    action: AuditAction,
    description: &str,
    metadata: Option<Value>,
) {
    let metadata = metadata.map(|m| redact_sensitive_data(m).to_string());

    let result = sqlx::query(
        "INSERT INTO activity_logs (user_id, action, description, metadata) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(action.as_str())
    .bind(description)
    .bind(metadata.as_deref())
    .execute(db)
    .await;

    if let Err(e) = result {
        tracing::warn!(target: "AUDIT", action = action.as_str(), error = %e, "Failed to write audit log");
    }
}
