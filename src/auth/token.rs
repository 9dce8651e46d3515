//! Signed bearer credential.
//!
//! Tokens are HS256 JWTs issued and checked with `jsonwebtoken`. The payload
//! carries the identity `{id, email, role}` plus `iat`/`exp`; the role is only
//! trusted after the signature has been checked.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::user::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Authenticated identity, valid for the remainder of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<Claims> for Identity {
    fn from(c: Claims) -> Self {
        Self {
            id: c.id,
            email: c.email,
            role: c.role,
        }
    }
}

/// Issues and verifies tokens with one secret and a fixed lifetime.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Returns the token and its expiry (unix seconds).
    pub fn issue(&self, identity: &Identity) -> AppResult<(String, i64)> {
        self.issue_at(identity, Utc::now())
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        self.verify_at(token, Utc::now())
    }

    pub(crate) fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> AppResult<(String, i64)> {
        let claims = Claims {
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok((token, claims.exp))
    }

    pub(crate) fn verify_at(&self, token: &str, now: DateTime<Utc>) -> AppResult<Claims> {
        // Expiry is checked below against `now`, not the library clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                let msg = match e.kind() {
                    ErrorKind::InvalidSignature => "Invalid token signature",
                    ErrorKind::InvalidAlgorithm => "Unsupported token algorithm",
                    _ => "Malformed token",
                };
                AppError::InvalidCredential(msg.to_string())
            })?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(AppError::InvalidCredential("Token expired".to_string()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    fn ann() -> Identity {
        Identity {
            id: 1,
            email: "ann@shop.test".into(),
            role: Role::User,
        }
    }

    #[test]
    fn issue_then_verify() {
        let signer = TokenSigner::new(b"secret", 8);
        let now = Utc::now();
        let (token, exp) = signer.issue_at(&ann(), now).unwrap();

        assert_eq!(exp - now.timestamp(), 8 * 3600);
        let claims = signer.verify_at(&token, now).unwrap();
        assert_eq!(Identity::from(claims), ann());
    }

    #[test]
    fn expired_token_rejected() {
        let signer = TokenSigner::new(b"secret", 8);
        let now = Utc::now();
        let (token, _) = signer.issue_at(&ann(), now).unwrap();

        assert!(signer.verify_at(&token, now + Duration::hours(7)).is_ok());
        let err = signer.verify_at(&token, now + Duration::hours(8)).unwrap_err();
        assert!(matches!(err, AppError::InvalidCredential(ref m) if m == "Token expired"));
    }

    #[test]
    fn other_secret_rejected() {
        let (token, _) = TokenSigner::new(b"secret", 8).issue(&ann()).unwrap();
        let err = TokenSigner::new(b"other", 8).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidCredential(_)));
    }

    #[test]
    fn tampered_role_rejected() {
        let signer = TokenSigner::new(b"secret", 8);
        let (token, _) = signer.issue(&ann()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims.role = Role::Admin;
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(signer.verify(&forged).is_err());
    }

    #[test]
    fn unsigned_algorithm_rejected() {
        let signer = TokenSigner::new(b"secret", 8);
        let (token, _) = signer.issue(&ann()).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);

        let err = signer.verify(&format!("{header}.{payload}.")).unwrap_err();
        assert!(matches!(err, AppError::InvalidCredential(_)));
    }

    #[test]
    fn malformed_tokens_rejected() {
        let signer = TokenSigner::new(b"secret", 8);
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(
                matches!(signer.verify(token), Err(AppError::InvalidCredential(_))),
                "{token:?} should be rejected"
            );
        }
    }
}
