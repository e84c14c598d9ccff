use super::{CredentialStore, NewUser, StoreError, StoreFuture, UserRecord};
use crate::{password::hash_password, token::now_unix_seconds, validator::normalize_email};
use anyhow::{anyhow, Result};
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, Ordering},
};
use tokio::sync::RwLock;

/// In-process store. Ids are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<i64, UserRecord>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user, hashing the password.
    ///
    /// # Errors
    /// Returns an error if hashing fails or the email is already taken.
    pub async fn insert(&self, user: NewUser) -> Result<UserRecord> {
        let email = normalize_email(&user.email);
        let password_hash = hash_password(&user.password)?;

        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == email) {
            return Err(anyhow!("email already registered: {email}"));
        }
        let id = users.keys().next_back().map_or(1, |last| last + 1);
        let record = UserRecord {
            id,
            name: user.name,
            email,
            role: user.role,
            password_hash,
            active: true,
            last_login_at: None,
        };
        users.insert(id, record.clone());
        Ok(record)
    }

    /// Returns `false` if no user has this id.
    pub async fn set_active(&self, id: i64, active: bool) -> bool {
        self.users
            .write()
            .await
            .get_mut(&id)
            .map(|record| record.active = active)
            .is_some()
    }

    /// Make every call fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

impl CredentialStore for MemoryStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check_available() })
    }

    fn count_users(&self) -> StoreFuture<'_, i64> {
        Box::pin(async move {
            self.check_available()?;
            let users = self.users.read().await;
            Ok(i64::try_from(users.len()).unwrap_or(i64::MAX))
        })
    }

    fn find_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<UserRecord>> {
        Box::pin(async move {
            self.check_available()?;
            let email = normalize_email(email);
            let users = self.users.read().await;
            Ok(users.values().find(|record| record.email == email).cloned())
        })
    }

    fn find_by_id(&self, id: i64) -> StoreFuture<'_, Option<UserRecord>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.users.read().await.get(&id).cloned())
        })
    }

    fn record_login(&self, id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check_available()?;
            if let Some(record) = self.users.write().await.get_mut(&id) {
                record.last_login_at = Some(now_unix_seconds());
            }
            Ok(())
        })
    }
}
