//! Credential Store: user records keyed by email.
//!
//! [`CredentialStore`] is the seam between the login flow and persistence.
//! [`PgStore`] reads the application's `usuarios` table; [`MemoryStore`]
//! keeps records in process for tests and embedding.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::token::TokenSubject;
use serde::{Deserialize, Serialize};
use std::{future::Future, pin::Pin};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

pub trait CredentialStore: Send + Sync {
    /// Round-trip to the backend.
    fn ping(&self) -> StoreFuture<'_, ()>;

    fn count_users(&self) -> StoreFuture<'_, i64>;

    /// Look up a user by normalized email.
    fn find_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<UserRecord>>;

    fn find_by_id(&self, id: i64) -> StoreFuture<'_, Option<UserRecord>>;

    /// Stamp the user's last successful login with the current time.
    fn record_login(&self, id: i64) -> StoreFuture<'_, ()>;
}

/// A row of `usuarios`.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub password_hash: String,
    pub active: bool,
    pub last_login_at: Option<i64>,
}

impl UserRecord {
    /// Public projection, without the credential hash.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }

    #[must_use]
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            id: self.id,
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("password_hash", &"***")
            .field("active", &self.active)
            .field("last_login_at", &self.last_login_at)
            .finish()
    }
}

/// User as returned to clients (`usuario` / `data.user`).
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "tipo")]
    pub role: String,
}

/// Input for creating a user; the password is hashed on insert.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
    pub password: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    fn record() -> UserRecord {
        UserRecord {
            id: 7,
            name: "Administrador".to_string(),
            email: "admin@imperio.com.br".to_string(),
            role: "admin".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            active: true,
            last_login_at: None,
        }
    }

    #[test]
    fn profile_uses_wire_names() -> Result<()> {
        let value = serde_json::to_value(record().profile())?;
        let name = value
            .get("nome")
            .and_then(serde_json::Value::as_str)
            .context("missing nome")?;
        assert_eq!(name, "Administrador");
        assert_eq!(
            value.get("tipo").and_then(serde_json::Value::as_str),
            Some("admin")
        );
        assert_eq!(value.get("id").and_then(serde_json::Value::as_i64), Some(7));
        assert!(value.get("password_hash").is_none());
        Ok(())
    }

    #[test]
    fn subject_matches_record() {
        let subject = record().subject();
        assert_eq!(subject.id, 7);
        assert_eq!(subject.email, "admin@imperio.com.br");
        assert_eq!(subject.role, "admin");
    }

    #[test]
    fn hash_failure_is_not_an_outage() {
        let err = StoreError::Hash("output size".to_string());
        assert_eq!(err.to_string(), "password hashing failed: output size");
        assert!(!matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn debug_hides_hash() {
        let debug = format!("{:?}", record());
        assert!(!debug.contains("argon2id"));
    }
}
