//! # Portaria (Login Authority & Diagnostics)
//!
//! `portaria` owns the email/password login flow of a small web application:
//! it validates login input, verifies Argon2 credential hashes stored in the
//! `usuarios` table, and issues HS256 session tokens.
//!
//! ## Collaborators
//!
//! - **Credential Store** ([`store`]): user records (identity, credential hash, role).
//! - **Token Issuer/Verifier** ([`token`]): signed, expiring session tokens.
//! - **Input Validator** ([`validator`]): email shape and password presence.
//!
//! The [`auth::Auth`] facade ties them together and is shared by the HTTP API
//! ([`api`]) and the two operator tools:
//!
//! - `portaria doctor` ([`diagnostics`]) walks configuration, database and
//!   token checks, reporting each failure inline and always exiting `0`.
//! - `portaria login` ([`probe`]) replays a login request and prints the JSON
//!   response the API would return, exiting `1` on the first failure.

pub mod api;
pub mod auth;
pub mod cli;
pub mod diagnostics;
pub mod password;
pub mod probe;
pub mod store;
pub mod token;
pub mod validator;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
