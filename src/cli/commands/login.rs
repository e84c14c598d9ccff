use clap::{Arg, Command};

pub const NAME: &str = "login";
pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_SENHA: &str = "senha";
pub const ARG_URL: &str = "url";

#[must_use]
pub fn command() -> Command {
    Command::new(NAME)
        .about("Replay a login and print the JSON response (exits 1 on failure)")
        .arg(
            Arg::new(ARG_EMAIL)
                .short('e')
                .long(ARG_EMAIL)
                .help("Account email")
                .env("PORTARIA_PROBE_EMAIL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Account password")
                .env("PORTARIA_PROBE_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SENHA)
                .long(ARG_SENHA)
                .help("Account password, legacy field name; wins over --password"),
        )
        .arg(
            Arg::new(ARG_URL)
                .short('u')
                .long(ARG_URL)
                .help("Send the login to a running server instead of the database")
                .long_help(
                    "Base URL of a running server, example: http://localhost:8080. Without it the login goes straight to the database and needs --dsn and --jwt-secret.",
                ),
        )
}
