use crate::{
    api,
    auth::Auth,
    cli::globals::GlobalArgs,
    diagnostics::redact_dsn,
    store::{CredentialStore, PgStore},
    token::TokenIssuer,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub globals: GlobalArgs,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the token settings are unusable, the database is
/// unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let dsn = args.globals.require_dsn()?;
    let tokens = TokenIssuer::new(args.globals.require_token()?.clone())
        .context("invalid token configuration")?;

    let store = PgStore::connect(dsn, MAX_CONNECTIONS)
        .await
        .context("Failed to connect to database")?;
    let store: Arc<dyn CredentialStore> = Arc::new(store);

    let auth = Arc::new(Auth::new(store, tokens));

    api::serve(args.port, auth).await
}

fn log_startup_args(args: &Args) {
    let token = args.globals.token.as_ref();
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "dsn",
            args.globals
                .dsn
                .as_deref()
                .map_or_else(|| "none".to_string(), redact_dsn),
        ),
        ("jwt_secret_set", token.is_some().to_string()),
        (
            "jwt_ttl_seconds",
            token.map_or_else(|| "n/a".to_string(), |t| t.ttl_seconds.to_string()),
        ),
        (
            "jwt_issuer",
            token.map_or_else(|| "n/a".to_string(), |t| t.issuer.clone()),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_commit_truncates() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("abc"), "abc");
        assert_eq!(short_commit(" unknown "), "unknown");
    }
}
