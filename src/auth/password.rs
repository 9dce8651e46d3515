//! Password digests (bcrypt), run off the async executor.

use crate::errors::{AppError, AppResult};

pub async fn hash_password(plain: &str, cost: u32) -> AppResult<String> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// `false` for a wrong password and for a digest that cannot be parsed.
pub async fn verify_password(plain: &str, digest: &str) -> AppResult<bool> {
    let plain = plain.to_string();
    let digest = digest.to_string();
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &digest).unwrap_or(false))
        .await?;
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn digest_differs_from_plaintext_and_verifies() {
        let digest = hash_password("Admin123!", 4).await.unwrap();
        assert_ne!(digest, "Admin123!");
        assert!(verify_password("Admin123!", &digest).await.unwrap());
        assert!(!verify_password("admin123!", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn garbage_digest_does_not_verify() {
        assert!(!verify_password("x", "not-a-bcrypt-digest").await.unwrap());
    }
}
