//! Login facade over the credential store and the token issuer.

use crate::{
    password::verify_password,
    store::{CredentialStore, UserProfile},
    token::{now_unix_seconds, Claims, TokenIssuer, TokenSubject},
    validator::normalize_email,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use utoipa::ToSchema;

/// Successful login: a session token and the user it was issued for.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub token: String,
    pub usuario: UserProfile,
}

#[derive(Clone)]
pub struct Auth {
    store: Arc<dyn CredentialStore>,
    tokens: TokenIssuer,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl Auth {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Check an email/password pair.
    ///
    /// Unknown email, inactive account and wrong password all give `Ok(None)`
    /// so callers cannot tell them apart.
    ///
    /// # Errors
    /// Returns an error if the store cannot be queried or the token cannot be issued.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<LoginResult>> {
        let email = normalize_email(email);

        let Some(user) = self
            .store
            .find_by_email(&email)
            .await
            .context("failed to look up user")?
        else {
            debug!("user not found");
            return Ok(None);
        };

        if !user.active {
            debug!(user_id = user.id, "user inactive");
            return Ok(None);
        }

        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                debug!(user_id = user.id, "password mismatch");
                return Ok(None);
            }
            Err(e) => {
                error!(user_id = user.id, "unusable stored password hash: {e}");
                return Ok(None);
            }
        }

        if let Err(e) = self.store.record_login(user.id).await {
            warn!(user_id = user.id, "failed to record last login: {e}");
        }

        let token = self.generate_token(&user.subject())?;

        Ok(Some(LoginResult {
            token,
            usuario: user.profile(),
        }))
    }

    /// Issue a session token for `subject`.
    ///
    /// # Errors
    /// Returns an error if the token cannot be encoded.
    pub fn generate_token(&self, subject: &TokenSubject) -> Result<String> {
        self.tokens
            .generate(subject, now_unix_seconds())
            .context("failed to generate token")
    }

    /// Claims of a valid token, or `None`.
    #[must_use]
    pub fn validate_token(&self, token: &str) -> Option<Claims> {
        match self.tokens.validate(token, now_unix_seconds()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!("token rejected: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        store::{MemoryStore, NewUser},
        token::TokenConfig,
    };
    use secrecy::SecretString;

    async fn setup() -> (Arc<MemoryStore>, Auth) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(NewUser {
                name: "Administrador".to_string(),
                email: "admin@imperio.com.br".to_string(),
                role: "admin".to_string(),
                password: "admin123".to_string(),
            })
            .await
            .unwrap();
        let tokens = TokenIssuer::new(TokenConfig::new(SecretString::from(
            "0123456789abcdef0123456789abcdef".to_string(),
        )))
        .unwrap();
        let auth = Auth::new(store.clone(), tokens);
        (store, auth)
    }

    #[tokio::test]
    async fn login_success_returns_token_and_profile() {
        let (store, auth) = setup().await;
        let result = auth
            .login("Admin@Imperio.com.br", "admin123")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.usuario.id, 1);
        assert_eq!(result.usuario.name, "Administrador");
        assert_eq!(result.usuario.email, "admin@imperio.com.br");
        assert_eq!(result.usuario.role, "admin");

        let claims = auth.validate_token(&result.token).unwrap();
        assert_eq!(claims.user_id, 1);
        assert_eq!(claims.email, "admin@imperio.com.br");

        let stamped = store.find_by_id(1).await.unwrap().unwrap();
        assert!(stamped.last_login_at.is_some());
    }

    #[tokio::test]
    async fn login_failures_are_none() {
        let (store, auth) = setup().await;
        assert!(auth.login("admin@imperio.com.br", "wrong").await.unwrap().is_none());
        assert!(auth.login("nobody@imperio.com.br", "admin123").await.unwrap().is_none());

        store.set_active(1, false).await;
        assert!(auth.login("admin@imperio.com.br", "admin123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_store_outage_is_error() {
        let (store, auth) = setup().await;
        store.set_unavailable(true);
        assert!(auth.login("admin@imperio.com.br", "admin123").await.is_err());
    }

    #[tokio::test]
    async fn generate_and_validate_token() {
        let (_store, auth) = setup().await;
        let token = auth
            .generate_token(&TokenSubject {
                id: 1,
                email: "test@test.com".to_string(),
                role: "admin".to_string(),
            })
            .unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.user_id, 1);
        assert_eq!(claims.email, "test@test.com");
        assert!(auth.validate_token("garbage").is_none());
    }
}
