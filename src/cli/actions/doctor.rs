use crate::{
    cli::globals::GlobalArgs,
    diagnostics::{self, DoctorOptions},
    store::{CredentialStore, PgStore},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc};

pub struct Args {
    pub check_paths: Vec<PathBuf>,
    pub probe_email: String,
    pub probe_password: Option<SecretString>,
    pub api_url: String,
    pub globals: GlobalArgs,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("check_paths", &self.check_paths)
            .field("probe_email", &self.probe_email)
            .field("probe_password", &self.probe_password.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .field("globals", &self.globals)
            .finish()
    }
}

/// Execute the doctor action. Failed checks are printed, never returned.
/// # Errors
/// Only if stdout cannot be written.
pub async fn execute(args: Args) -> Result<()> {
    let options = DoctorOptions {
        check_paths: args.check_paths,
        dsn: args.globals.dsn,
        token: args.globals.token,
        probe_email: args.probe_email,
        probe_password: args.probe_password,
        api_url: args.api_url,
    };

    let report = diagnostics::run(&options, connect).await;

    println!("{report}");

    Ok(())
}

async fn connect(dsn: String) -> Result<Arc<dyn CredentialStore>> {
    let store = PgStore::connect(&dsn, 1)
        .await
        .context("Failed to connect to database")?;
    Ok(Arc::new(store))
}
