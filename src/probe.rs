//! `portaria login`: replay one login and print what the API would answer.
//!
//! Unlike `doctor`, every step here is fatal: the first failure is returned
//! as an error and the process exits non-zero. Input is validated before any
//! credential store or network call is made.

use crate::{
    api::types::{ErrorResponse, LoginResponse},
    auth::Auth,
    diagnostics::token_preview,
    store::{CredentialStore, PgStore},
    token::{TokenConfig, TokenIssuer},
    validator::{mask_password, validate_login, Credentials, LoginRequest, ValidationError},
    APP_USER_AGENT,
};
use anyhow::{Context, Result};
use serde_json::json;
use std::{io::Write, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("could not reach the credential store: {0}")]
    Connect(String),
    #[error("Invalid email or password")]
    Rejected,
    #[error("remote login failed with HTTP {status}: {message}")]
    Remote { status: u16, message: String },
}

/// Where the login is sent.
#[derive(Clone)]
pub enum Target {
    /// Straight to the database through [`Auth`].
    Local { dsn: String, token: TokenConfig },
    /// `POST {url}/api/auth/login` on a running server.
    Remote { url: String },
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { token, .. } => f
                .debug_struct("Local")
                .field("dsn", &"***")
                .field("token", token)
                .finish(),
            Self::Remote { url } => f.debug_struct("Remote").field("url", url).finish(),
        }
    }
}

/// Validate, log in against `target` and print the response.
///
/// # Errors
/// Returns a [`ProbeError`] (wrapped in `anyhow`) for rejected input or
/// credentials, and any I/O or transport failure.
#[instrument(skip(out, request))]
pub async fn run<W: Write>(
    out: &mut W,
    request: &LoginRequest,
    target: &Target,
) -> Result<LoginResponse> {
    let credentials = validate(out, request)?;

    match target {
        Target::Local { dsn, token } => {
            let issuer = TokenIssuer::new(token.clone()).context("invalid token configuration")?;
            let store = PgStore::connect(dsn, 1)
                .await
                .map_err(|e| ProbeError::Connect(e.to_string()))?;
            let store: Arc<dyn CredentialStore> = Arc::new(store);
            let auth = Auth::new(store, issuer);
            login_local(out, &credentials, &auth).await
        }
        Target::Remote { url } => login_remote(out, url, &credentials).await,
    }
}

/// Print and check the login input.
///
/// # Errors
/// Returns [`ProbeError::Validation`] for a malformed email or empty password.
pub fn validate<W: Write>(out: &mut W, request: &LoginRequest) -> Result<Credentials> {
    writeln!(out, "=== LOGIN ===")?;
    writeln!(out, "Email: {}", request.email.trim())?;

    let credentials = match validate_login(request) {
        Ok(credentials) => credentials,
        Err(e) => {
            writeln!(out, "✗ {e}")?;
            return Err(ProbeError::from(e).into());
        }
    };

    writeln!(out, "Password: {}", mask_password(&credentials.password))?;
    writeln!(out, "✓ input is valid")?;
    Ok(credentials)
}

/// Log in through the [`Auth`] facade.
///
/// # Errors
/// Returns [`ProbeError::Rejected`] for invalid credentials, or the store error.
pub async fn login_local<W: Write>(
    out: &mut W,
    credentials: &Credentials,
    auth: &Auth,
) -> Result<LoginResponse> {
    writeln!(out, "Calling Auth::login...")?;

    let result = auth
        .login(&credentials.email, &credentials.password)
        .await
        .context("login failed")?;

    let Some(result) = result else {
        writeln!(out, "✗ {}", ProbeError::Rejected)?;
        return Err(ProbeError::Rejected.into());
    };

    let response = LoginResponse::from(result);
    print_response(out, &response)?;
    Ok(response)
}

/// Log in through a running server.
///
/// # Errors
/// Returns [`ProbeError::Remote`] for a non-2xx answer or `success: false`,
/// or the transport error.
pub async fn login_remote<W: Write>(
    out: &mut W,
    url: &str,
    credentials: &Credentials,
) -> Result<LoginResponse> {
    let endpoint = format!("{}/api/auth/login", url.trim_end_matches('/'));
    writeln!(out, "POST {endpoint}")?;

    let client = reqwest::Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(Duration::from_secs(10))
        .build()?;

    let response = client
        .post(&endpoint)
        .json(&json!({
            "email": credentials.email,
            "password": credentials.password,
        }))
        .send()
        .await
        .with_context(|| format!("request to {endpoint} failed"))?;

    let status = response.status();
    let body = response.text().await?;
    debug!(status = status.as_u16(), "remote login answered");

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map_or_else(|_| body.clone(), |error| error.message);
        writeln!(out, "✗ HTTP {}: {message}", status.as_u16())?;
        return Err(ProbeError::Remote {
            status: status.as_u16(),
            message,
        }
        .into());
    }

    let response: LoginResponse =
        serde_json::from_str(&body).context("unexpected login response body")?;
    if !response.success {
        return Err(ProbeError::Remote {
            status: status.as_u16(),
            message: response.message,
        }
        .into());
    }

    print_response(out, &response)?;
    Ok(response)
}

fn print_response<W: Write>(out: &mut W, response: &LoginResponse) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "=== RESPONSE ===")?;
    writeln!(out, "{}", serde_json::to_string_pretty(response)?)?;
    writeln!(out)?;
    writeln!(out, "=== DETAILS ===")?;
    writeln!(out, "Token: {}", token_preview(&response.data.token))?;
    writeln!(out, "Token length: {}", response.data.token.len())?;
    writeln!(out, "User ID: {}", response.data.user.id)?;
    writeln!(out, "Name: {}", response.data.user.name)?;
    writeln!(out, "Email: {}", response.data.user.email)?;
    writeln!(out, "Role: {}", response.data.user.role)?;
    Ok(())
}
