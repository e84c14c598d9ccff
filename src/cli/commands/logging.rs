use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("PORTARIA_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_numbers() {
        let parser = validator_log_level();
        let command = Command::new("t").arg(Arg::new("level").long("level").value_parser(parser));
        for (value, expected) in [("warn", 1u8), ("DEBUG", 3), ("4", 4)] {
            let matches = command
                .clone()
                .try_get_matches_from(["t", "--level", value])
                .ok();
            assert_eq!(
                matches.and_then(|m| m.get_one::<u8>("level").copied()),
                Some(expected)
            );
        }
        assert!(command
            .try_get_matches_from(["t", "--level", "loud"])
            .is_err());
    }
}
