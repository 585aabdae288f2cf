use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::session::Session;

const ISSUER: &str = "prism-api";

/// Security errors for session token operations
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Signature or claim check failed
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    /// Expired token
    #[error("Token has expired")]
    TokenExpired,

    /// Invalid token structure
    #[error("Invalid token format")]
    InvalidToken,

    /// The session the token points at no longer exists
    #[error("Session has been revoked")]
    SessionRevoked,

    /// Configuration error
    #[error("Security configuration error: {0}")]
    ConfigError(String),

    /// Password hashing failure
    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

/// Claims carried by the session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Session id
    pub sid: String,
    /// Account id
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies session cookie values with `SESSION_SECRET` (HS256)
#[derive(Clone)]
pub struct SessionSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner").finish_non_exhaustive()
    }
}

impl SessionSigner {
    pub fn new(secret: &str) -> Result<Self, SecurityError> {
        if secret.is_empty() {
            return Err(SecurityError::ConfigError("session secret is empty".to_string()));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Produce the cookie value for a session
    pub fn sign(&self, session: &Session) -> Result<String, SecurityError> {
        let claims = SessionClaims {
            sid: session.id.clone(),
            sub: session.user_id.to_string(),
            iss: ISSUER.to_string(),
            iat: Utc::now().timestamp(),
            exp: session.expires_at.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            error!("Failed to sign session token: {}", e);
            SecurityError::TokenValidation(e.to_string())
        })
    }

    /// Check the signature and expiry of a cookie value
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SecurityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[ISSUER]);

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            debug!("Session token rejected: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    SecurityError::TokenValidation("Invalid signature".to_string())
                }
                _ => SecurityError::TokenValidation(e.to_string()),
            }
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prism_data::models::Role;
    use uuid::Uuid;

    fn session(expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: "abc123".to_string(),
            user_id: Uuid::new_v4(),
            username: "maria".to_string(),
            full_name: "Maria Santos".to_string(),
            role: Role::Admin,
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = SessionSigner::new("test_secret_key_for_testing_only").unwrap();
        let session = session(Duration::hours(1));

        let token = signer.sign(&session).unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.sid, "abc123");
        assert_eq!(claims.sub, session.user_id.to_string());
    }

    #[test]
    fn test_expired_token() {
        let signer = SessionSigner::new("test_secret_key_for_testing_only").unwrap();
        let token = signer.sign(&session(Duration::hours(-1))).unwrap();

        match signer.verify(&token) {
            Err(SecurityError::TokenExpired) => {}
            other => panic!("Expected TokenExpired but got: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let signer = SessionSigner::new("first-secret").unwrap();
        let other = SessionSigner::new("second-secret").unwrap();
        let token = signer.sign(&session(Duration::hours(1))).unwrap();

        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_token() {
        let signer = SessionSigner::new("secret").unwrap();
        assert!(matches!(
            signer.verify("invalid.token.format"),
            Err(SecurityError::InvalidToken) | Err(SecurityError::TokenValidation(_))
        ));
    }

    #[test]
    fn test_empty_secret_is_config_error() {
        assert!(matches!(SessionSigner::new(""), Err(SecurityError::ConfigError(_))));
    }
}
