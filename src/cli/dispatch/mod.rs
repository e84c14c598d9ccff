//! Map parsed CLI arguments to the [`Action`] to run.

use crate::{
    cli::{
        actions::{doctor, login, server, Action},
        commands::{self, auth},
        globals::GlobalArgs,
    },
    probe::Target,
    validator::LoginRequest,
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::server::NAME, sub)) => {
            let globals = globals(sub);
            // fail before telemetry output starts scrolling
            globals.require_dsn()?;
            globals.require_token()?;
            Ok(Action::Server(server::Args {
                port: sub
                    .get_one::<u16>(commands::server::ARG_PORT)
                    .copied()
                    .unwrap_or(8080),
                globals,
            }))
        }
        Some((commands::doctor::NAME, sub)) => Ok(Action::Doctor(doctor::Args {
            check_paths: sub
                .get_many::<PathBuf>(commands::doctor::ARG_CHECK_PATH)
                .map(|paths| paths.cloned().collect())
                .unwrap_or_default(),
            probe_email: sub
                .get_one::<String>(commands::doctor::ARG_PROBE_EMAIL)
                .cloned()
                .unwrap_or_else(|| commands::doctor::DEFAULT_PROBE_EMAIL.to_string()),
            probe_password: sub
                .get_one::<String>(commands::doctor::ARG_PROBE_PASSWORD)
                .map(|password| SecretString::from(password.clone())),
            api_url: sub
                .get_one::<String>(commands::doctor::ARG_API_URL)
                .cloned()
                .unwrap_or_else(|| commands::doctor::DEFAULT_API_URL.to_string()),
            globals: globals(sub),
        })),
        Some((commands::login::NAME, sub)) => {
            let request = LoginRequest {
                email: sub
                    .get_one::<String>(commands::login::ARG_EMAIL)
                    .cloned()
                    .context("missing required argument: --email")?,
                password: sub.get_one::<String>(commands::login::ARG_PASSWORD).cloned(),
                senha: sub.get_one::<String>(commands::login::ARG_SENHA).cloned(),
            };

            let target = if let Some(url) = sub.get_one::<String>(commands::login::ARG_URL) {
                Target::Remote { url: url.clone() }
            } else {
                let globals = globals(sub);
                Target::Local {
                    dsn: globals.require_dsn()?.to_string(),
                    token: globals.require_token()?.clone(),
                }
            };

            Ok(Action::Login(login::Args { request, target }))
        }
        Some((name, _)) => Err(anyhow!("unknown subcommand: {name}")),
        None => Err(anyhow!("missing subcommand")),
    }
}

fn globals(matches: &clap::ArgMatches) -> GlobalArgs {
    let options = auth::Options::parse(matches);
    GlobalArgs::new(options.dsn, options.token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn dispatch(args: &[&str]) -> Result<Action> {
        temp_env::with_vars(
            [
                ("PORTARIA_DSN", None::<&str>),
                ("PORTARIA_JWT_SECRET", None),
                ("PORTARIA_PROBE_EMAIL", None),
                ("PORTARIA_PROBE_PASSWORD", None),
            ],
            || {
                let matches = commands::new().try_get_matches_from(args)?;
                handler(&matches)
            },
        )
    }

    #[test]
    fn server_requires_dsn_and_secret() {
        let err = dispatch(&["portaria", "server", "--jwt-secret", SECRET]).err();
        assert!(err.is_some_and(|e| e.to_string().contains("--dsn")));

        let err = dispatch(&["portaria", "server", "--dsn", "postgres://localhost/app"]).err();
        assert!(err.is_some_and(|e| e.to_string().contains("--jwt-secret")));
    }

    #[test]
    fn server_action() -> Result<()> {
        let action = dispatch(&[
            "portaria",
            "--dsn",
            "postgres://localhost/app",
            "--jwt-secret",
            SECRET,
            "server",
            "-p",
            "3000",
        ])?;
        assert!(matches!(action, Action::Server(server::Args { port: 3000, .. })));
        Ok(())
    }

    #[test]
    fn doctor_runs_without_configuration() -> Result<()> {
        let action = dispatch(&["portaria", "doctor"])?;
        let Action::Doctor(args) = action else {
            return Err(anyhow!("expected doctor action"));
        };
        assert!(args.globals.dsn.is_none());
        assert!(args.globals.token.is_none());
        assert!(args.probe_password.is_none());
        assert!(args.check_paths.is_empty());
        Ok(())
    }

    #[test]
    fn login_remote_needs_no_database() -> Result<()> {
        let action = dispatch(&[
            "portaria",
            "login",
            "--email",
            "admin@example.com",
            "--senha",
            "s3cret",
            "--url",
            "http://localhost:8080",
        ])?;
        let Action::Login(args) = action else {
            return Err(anyhow!("expected login action"));
        };
        assert!(matches!(args.target, Target::Remote { .. }));
        assert_eq!(args.request.senha.as_deref(), Some("s3cret"));
        assert!(args.request.password.is_none());
        Ok(())
    }

    #[test]
    fn login_local_needs_database() {
        let err = dispatch(&["portaria", "login", "--email", "admin@example.com"]).err();
        assert!(err.is_some_and(|e| e.to_string().contains("--dsn")));
    }
}
