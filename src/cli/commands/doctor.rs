use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

pub const NAME: &str = "doctor";
pub const ARG_CHECK_PATH: &str = "check-path";
pub const ARG_PROBE_EMAIL: &str = "probe-email";
pub const ARG_PROBE_PASSWORD: &str = "probe-password";
pub const ARG_API_URL: &str = "api-url";

pub const DEFAULT_PROBE_EMAIL: &str = "admin@example.com";
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[must_use]
pub fn command() -> Command {
    Command::new(NAME)
        .about("Check configuration, database and tokens step by step (always exits 0)")
        .arg(
            Arg::new(ARG_CHECK_PATH)
                .long(ARG_CHECK_PATH)
                .help("File or directory that must exist; may be repeated")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_PROBE_EMAIL)
                .long(ARG_PROBE_EMAIL)
                .help("Account looked up in the database and used for the login check")
                .env("PORTARIA_PROBE_EMAIL")
                .default_value(DEFAULT_PROBE_EMAIL),
        )
        .arg(
            Arg::new(ARG_PROBE_PASSWORD)
                .long(ARG_PROBE_PASSWORD)
                .help("Password for the probe account; the login check is skipped without it")
                .env("PORTARIA_PROBE_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of a running server, used in the curl hint")
                .env("PORTARIA_API_URL")
                .default_value(DEFAULT_API_URL),
        )
}
