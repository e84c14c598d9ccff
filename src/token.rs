//! Session tokens: compact HS256 JWTs.
//!
//! Claims carry `user_id`, `email` and `tipo` so callers can authorize a
//! request without a store round-trip. `iss` and `exp` are always checked.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::SystemTime;
use thiserror::Error;
use ulid::Ulid;

type HmacSha256 = Hmac<Sha256>;

pub const MIN_SECRET_LEN: usize = 32;
pub const DEFAULT_TTL_SECONDS: i64 = 24 * 60 * 60;
pub const DEFAULT_ISSUER: &str = "portaria";

const ALG: &str = "HS256";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALG.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Who a token is issued for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: i64,
    pub email: String,
    #[serde(rename = "tipo")]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    #[serde(rename = "tipo")]
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub iss: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("token secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
}

/// Signing settings.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: SecretString,
    pub ttl_seconds: i64,
    pub issuer: String,
}

impl TokenConfig {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("issuer", &self.issuer)
            .finish()
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[must_use]
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Issues and verifies session tokens with one shared secret.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    config: TokenConfig,
}

impl TokenIssuer {
    /// # Errors
    /// Returns `WeakSecret` if the secret is shorter than [`MIN_SECRET_LEN`] bytes.
    pub fn new(config: TokenConfig) -> Result<Self, Error> {
        if config.secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(Error::WeakSecret);
        }
        Ok(Self { config })
    }

    fn mac(&self) -> Result<HmacSha256, Error> {
        HmacSha256::new_from_slice(self.config.secret.expose_secret().as_bytes())
            .map_err(|_| Error::WeakSecret)
    }

    /// Build claims for `subject` valid from `now` for the configured TTL.
    #[must_use]
    pub fn claims_for(&self, subject: &TokenSubject, now: i64) -> Claims {
        Claims {
            user_id: subject.id,
            email: subject.email.clone(),
            role: subject.role.clone(),
            iat: now,
            exp: now.saturating_add(self.config.ttl_seconds),
            jti: Ulid::new().to_string(),
            iss: self.config.issuer.clone(),
        }
    }

    /// Issue a token for `subject`.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded.
    pub fn generate(&self, subject: &TokenSubject, now: i64) -> Result<String, Error> {
        self.sign(&self.claims_for(subject, now))
    }

    /// Sign already-built claims.
    ///
    /// # Errors
    /// Returns an error if the header or claims cannot be encoded.
    pub fn sign(&self, claims: &Claims) -> Result<String, Error> {
        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, not HS256, badly signed,
    /// from another issuer, or expired at `now`.
    pub fn validate(&self, token: &str, now: i64) -> Result<Claims, Error> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
        if parts.next().is_some() {
            return Err(Error::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != ALG {
            return Err(Error::UnsupportedAlg(header.alg));
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| Error::InvalidSignature)?;

        let claims: Claims = b64d_json(claims_b64)?;
        if claims.iss != self.config.issuer {
            return Err(Error::InvalidIssuer);
        }
        if claims.exp <= now {
            return Err(Error::Expired);
        }

        Ok(claims)
    }
}
