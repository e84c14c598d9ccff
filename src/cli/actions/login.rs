use crate::{
    probe::{self, Target},
    validator::LoginRequest,
};
use anyhow::Result;

pub struct Args {
    pub request: LoginRequest,
    pub target: Target,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("email", &self.request.email)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Execute the login probe.
/// # Errors
/// Returns the first failed step; the process then exits non-zero.
pub async fn execute(args: Args) -> Result<()> {
    let mut out = std::io::stdout();
    probe::run(&mut out, &args.request, &args.target).await?;
    Ok(())
}
