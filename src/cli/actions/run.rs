use crate::cli::actions::{doctor, login, server, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
        Action::Doctor(args) => doctor::execute(args).await,
        Action::Login(args) => login::execute(args).await,
    }
}
