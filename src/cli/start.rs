use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;

/// Map verbosity count to tracing level
const fn get_verbosity_level(verbosity: u8) -> Option<tracing::Level> {
    match verbosity {
        0 => None,
        1 => Some(tracing::Level::WARN),
        2 => Some(tracing::Level::INFO),
        3 => Some(tracing::Level::DEBUG),
        _ => Some(tracing::Level::TRACE),
    }
}

/// `-v` may be given before or after the subcommand.
fn verbosity(matches: &clap::ArgMatches) -> u8 {
    let top = matches
        .get_one::<u8>(commands::logging::ARG_VERBOSITY)
        .copied()
        .unwrap_or(0);
    let sub = matches
        .subcommand()
        .and_then(|(_, sub)| sub.get_one::<u8>(commands::logging::ARG_VERBOSITY).copied())
        .unwrap_or(0);
    top.max(sub)
}

/// Main entry point for the CLI - builds and returns the Action
///
/// # Errors
///
/// Returns an error if argument parsing, telemetry initialization, or action dispatch fails
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(get_verbosity_level(verbosity(&matches)))?;

    dispatch::handler(&matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(get_verbosity_level(0), None);
        assert_eq!(get_verbosity_level(1), Some(tracing::Level::WARN));
        assert_eq!(get_verbosity_level(3), Some(tracing::Level::DEBUG));
        assert_eq!(get_verbosity_level(9), Some(tracing::Level::TRACE));
    }

    #[test]
    fn verbosity_after_subcommand() {
        temp_env::with_vars([("PORTARIA_LOG_LEVEL", None::<&str>)], || {
            let matches = commands::new().get_matches_from(["portaria", "doctor", "-vv"]);
            assert_eq!(verbosity(&matches), 2);
        });
    }
}
