//! Access tokens
//!
//! Tokens are compact JWTs signed with HMAC-SHA256 (`HS256`):
//! `base64url(header).base64url(claims).base64url(signature)`.
//!
//! The claims carry the user id and role, so authenticating a request needs
//! no database lookup.

use chrono::Utc;
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::models::UserRole;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime: 7 days
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Token verification failure
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,
    #[error("Unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Token expired")]
    Expired,
}

/// Signed token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub role: UserRole,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expires at, seconds since the epoch
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Issues and verifies access tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    /// HMAC keyed with the secret, cloned per signature
    keyed_mac: HmacSha256,
    ttl_seconds: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_seconds: i64) -> anyhow::Result<Self> {
        let keyed_mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow::anyhow!("Invalid token secret: {}", e))?;
        Ok(Self {
            keyed_mac,
            ttl_seconds,
        })
    }

    /// Issue a token for a user, valid from now for the configured lifetime.
    pub fn issue(&self, user_id: i64, role: UserRole) -> String {
        let iat = Utc::now().timestamp();
        self.sign(&Claims {
            user_id,
            role,
            iat,
            exp: iat + self.ttl_seconds,
        })
    }

    /// Sign arbitrary claims.
    pub fn sign(&self, claims: &Claims) -> String {
        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        // Serializing these plain structs cannot fail.
        let header_part = BASE64URL_NOPAD.encode(&serde_json::to_vec(&header).unwrap_or_default());
        let claims_part = BASE64URL_NOPAD.encode(&serde_json::to_vec(claims).unwrap_or_default());

        let signing_input = format!("{}.{}", header_part, claims_part);
        let signature = BASE64URL_NOPAD.encode(&self.mac(signing_input.as_bytes()).finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_part), Some(claims_part), Some(signature_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_part(header_part)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let signature = BASE64URL_NOPAD
            .decode(signature_part.as_bytes())
            .map_err(|_| TokenError::Malformed)?;
        let signing_input = &token[..header_part.len() + 1 + claims_part.len()];
        self.mac(signing_input.as_bytes())
            .verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: Claims = decode_part(claims_part)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self, data: &[u8]) -> HmacSha256 {
        let mut mac = self.keyed_mac.clone();
        mac.update(data);
        mac
    }
}

fn decode_part<T: serde::de::DeserializeOwned>(part: &str) -> Result<T, TokenError> {
    let bytes = BASE64URL_NOPAD
        .decode(part.as_bytes())
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Generate a random signing secret (hex encoded, 256 bits).
pub fn generate_secret() -> String {
    use argon2::password_hash::rand_core::{OsRng, RngCore};

    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    data_encoding::HEXLOWER.encode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"test-secret", DEFAULT_TOKEN_TTL_SECONDS).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service();
        let token = tokens.issue(42, UserRole::Editor);

        assert_eq!(token.split('.').count(), 3);

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.role, UserRole::Editor);
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_TTL_SECONDS);
    }

    #[test]
    fn test_claims_use_camel_case_on_the_wire() {
        let token = service().issue(7, UserRole::Admin);
        let payload = token.split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&BASE64URL_NOPAD.decode(payload.as_bytes()).unwrap()).unwrap();

        assert_eq!(json["userId"], 7);
        assert_eq!(json["role"], "ADMIN");
        assert!(json["iat"].is_i64());
        assert!(json["exp"].is_i64());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = service().issue(1, UserRole::Admin);
        let other = TokenService::new(b"another-secret", DEFAULT_TOKEN_TTL_SECONDS).unwrap();
        assert_eq!(other.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_claims_are_rejected() {
        let tokens = service();
        let token = tokens.issue(2, UserRole::Author);
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = Claims {
            user_id: 2,
            role: UserRole::Admin,
            iat: 0,
            exp: i64::MAX,
        };
        let forged_part = BASE64URL_NOPAD.encode(&serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_part, parts[2]);

        assert_eq!(tokens.verify(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = service();
        let now = Utc::now().timestamp();
        let token = tokens.sign(&Claims {
            user_id: 1,
            role: UserRole::Admin,
            iat: now - 100,
            exp: now - 1,
        });
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_malformed_tokens() {
        let tokens = service();
        assert_eq!(tokens.verify(""), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("a.b"), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("a.b.c.d"), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("!!!.???.***"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_other_algorithms_are_rejected() {
        let tokens = service();
        let token = tokens.issue(1, UserRole::Admin);
        let parts: Vec<&str> = token.split('.').collect();
        let none_header = BASE64URL_NOPAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let forged = format!("{}.{}.", none_header, parts[1]);

        assert_eq!(tokens.verify(&forged), Err(TokenError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer   xyz "), Some("xyz"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn test_generate_secret() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
