//! HS256 token encoding/decoding.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use aula_core::UserId;

use crate::claims::{JwtClaims, TokenKind, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("malformed or tampered token: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("expected {expected} token, got {found} token")]
    WrongKind { expected: TokenKind, found: TokenKind },
}

/// Turns a credential into validated claims.
pub trait JwtValidator: Send + Sync {
    /// Validate a bearer credential. Refresh tokens are rejected.
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;

    /// Validate a refresh credential. Access tokens are rejected.
    fn validate_refresh(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// Mints credentials.
pub trait JwtIssuer: Send + Sync {
    fn issue(&self, user_id: UserId, email: &str, now: DateTime<Utc>) -> Result<String, JwtError>;

    fn issue_refresh(&self, user_id: UserId, email: &str, now: DateTime<Utc>) -> Result<String, JwtError>;
}

/// Shared-secret HS256 codec.
///
/// The time window lives in our own `issued_at`/`expires_at` claims, so the
/// registered `exp` claim is neither required nor checked by the decoder.
#[derive(Clone)]
pub struct Hs256JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    refresh_ttl: Duration,
}

const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

impl Hs256JwtCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TTL_DAYS),
        }
    }

    pub fn with_refresh_ttl(mut self, refresh_ttl: Duration) -> Self {
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn decode_kind(&self, token: &str, expected: TokenKind, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        let data = decode::<JwtClaims>(token, &self.decoding, &self.validation)?;
        if data.claims.kind != expected {
            return Err(JwtError::WrongKind {
                expected,
                found: data.claims.kind,
            });
        }
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }

    fn encode_kind(&self, user_id: UserId, email: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<String, JwtError> {
        let ttl = match kind {
            TokenKind::Access => self.ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = JwtClaims {
            sub: user_id,
            email: email.to_string(),
            issued_at: now,
            expires_at: now + ttl,
            kind,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}

impl core::fmt::Debug for Hs256JwtCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtCodec")
            .field("ttl", &self.ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256JwtCodec {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        self.decode_kind(token, TokenKind::Access, now)
    }

    fn validate_refresh(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        self.decode_kind(token, TokenKind::Refresh, now)
    }
}

impl JwtIssuer for Hs256JwtCodec {
    fn issue(&self, user_id: UserId, email: &str, now: DateTime<Utc>) -> Result<String, JwtError> {
        self.encode_kind(user_id, email, TokenKind::Access, now)
    }

    fn issue_refresh(&self, user_id: UserId, email: &str, now: DateTime<Utc>) -> Result<String, JwtError> {
        self.encode_kind(user_id, email, TokenKind::Refresh, now)
    }
}
