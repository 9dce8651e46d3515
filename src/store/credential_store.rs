use sqlx::SqlitePool;

use crate::auth::password::{hash_password, verify_password};
use crate::errors::{AppError, AppResult};
use crate::models::user::{DbUser, Role, UpdateProfilePayload};
use crate::validation::{
    normalize_email, sanitize_string, validate_email, validate_name, validate_password,
};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, created_at, updated_at, last_login_at";

/// Users, roles and password digests.
#[derive(Clone)]
pub struct CredentialStore {
    db: SqlitePool,
    bcrypt_cost: u32,
    min_password_length: usize,
}

impl CredentialStore {
    pub fn new(db: SqlitePool, bcrypt_cost: u32, min_password_length: usize) -> Self {
        Self {
            db,
            bcrypt_cost,
            min_password_length,
        }
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<DbUser>> {
        let user = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<DbUser>> {
        let user = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    /// Look a user up by email and check the password. `None` covers both an
    /// unknown email and a wrong password.
    pub async fn verify(&self, email: &str, password: &str) -> AppResult<Option<DbUser>> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };
        if verify_password(password, &user.password_hash).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> AppResult<DbUser> {
        let name = sanitize_string(name);
        validate_name(&name)?;
        validate_email(email)?;
        validate_password(password, self.min_password_length)?;
        let email = normalize_email(email);

        let digest = hash_password(password, self.bcrypt_cost).await?;

        let id = sqlx::query(
            "INSERT INTO users (name, email, password_hash, role) VALUES (?, ?, ?, ?)",
        )
        .bind(&name)
        .bind(&email)
        .bind(&digest)
        .bind(role.as_str())
        .execute(&self.db)
        .await
        .map_err(|e| AppError::unique_or(e, "Email is already registered"))?
        .last_insert_rowid();

        tracing::info!(target: "AUTH", user_id = id, role = role.as_str(), "User created");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("created user vanished".into()))
    }

    /// Self-service update. The role column is never touched here, and the
    /// digest only changes when a new password is supplied.
    pub async fn update_profile(&self, user_id: i64, payload: &UpdateProfilePayload) -> AppResult<DbUser> {
        let current = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let name = match payload.name.as_deref() {
            Some(raw) => {
                let name = sanitize_string(raw);
                validate_name(&name)?;
                name
            }
            None => current.name,
        };

        let email = match payload.email.as_deref() {
            Some(raw) => {
                validate_email(raw)?;
                normalize_email(raw)
            }
            None => current.email,
        };

        let digest = match payload.password.as_deref() {
            Some(password) => {
                validate_password(password, self.min_password_length)?;
                hash_password(password, self.bcrypt_cost).await?
            }
            None => current.password_hash,
        };

        sqlx::query(
            "UPDATE users SET name = ?, email = ?, password_hash = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(&name)
        .bind(&email)
        .bind(&digest)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::unique_or(e, "Email is already registered"))?;

        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn touch_last_login(&self, user_id: i64) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
