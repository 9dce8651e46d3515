use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use std::convert::Infallible;

use super::token::{Identity, TokenSigner};
use crate::AppState;

/// Who is making the request, resolved from the `Authorization` header.
///
/// Resolution never fails the request by itself: the policy decides whether a
/// missing or rejected credential matters for the operation at hand.
#[derive(Debug, Clone)]
pub enum Caller {
    Anonymous,
    Authenticated(Identity),
    /// A credential was presented but did not verify
    Rejected(String),
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Caller::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Resolve a raw header value.
    pub fn from_authorization(value: Option<&str>, signer: &TokenSigner) -> Self {
        let Some(value) = value else {
            return Caller::Anonymous;
        };

        let token = match value.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
            _ => return Caller::Rejected("Malformed authorization header".into()),
        };
        if token.is_empty() {
            return Caller::Rejected("Malformed authorization header".into());
        }

        match signer.verify(token) {
            Ok(claims) => Caller::Authenticated(claims.into()),
            Err(e) => {
                tracing::debug!(target: "AUTH", error = %e, "Credential rejected");
                Caller::Rejected(e.to_string())
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let value = match parts.headers.get(header::AUTHORIZATION) {
            None => None,
            Some(raw) => match raw.to_str() {
                Ok(v) => Some(v),
                Err(_) => return Ok(Caller::Rejected("Malformed authorization header".into())),
            },
        };
        Ok(Caller::from_authorization(value, &state.tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"guard-test", 8)
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert!(matches!(Caller::from_authorization(None, &signer()), Caller::Anonymous));
    }

    #[test]
    fn bearer_token_resolves() {
        let s = signer();
        let identity = Identity { id: 4, email: "bo@shop.test".into(), role: Role::Admin };
        let (token, _) = s.issue(&identity).unwrap();

        let caller = Caller::from_authorization(Some(&format!("Bearer {token}")), &s);
        assert_eq!(caller.identity(), Some(&identity));

        let caller = Caller::from_authorization(Some(&format!("bearer {token}")), &s);
        assert!(caller.identity().is_some());
    }

    #[test]
    fn bad_headers_are_rejected() {
        let s = signer();
        for value in ["Basic abc", "Bearer", "Bearer ", "Bearer x.y.z", "token"] {
            assert!(
                matches!(Caller::from_authorization(Some(value), &s), Caller::Rejected(_)),
                "{value}"
            );
        }
    }
}
