//! Deploy scripts, run in order and selected by tag.

mod lottery;
mod mocks;

use std::future::Future;

use anyhow::Result;

pub use lottery::DeployLottery;
pub use mocks::DeployMocks;

use crate::DeployEnvironment;

/// Separator logged after a script finishes its main work.
pub(crate) const SEPARATOR: &str = "_____________________________________";

/// Labels used to select which scripts run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::VariantNames,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Tag {
    All,
    Mocks,
    Lottery,
}

/// A step of the deployment pipeline.
pub trait DeployScript {
    /// The script name, used for logging.
    const NAME: &'static str;

    /// Tags that select this script.
    const TAGS: &'static [Tag];

    /// Run the script against the environment.
    fn run(&self, env: &mut DeployEnvironment) -> impl Future<Output = Result<()>>;
}

/// Whether a script carrying `script_tags` runs when `requested` tags are asked for.
///
/// No requested tags selects every script.
pub fn is_selected(script_tags: &[Tag], requested: &[Tag]) -> bool {
    requested.is_empty() || requested.iter().any(|tag| script_tags.contains(tag))
}

async fn run_script<S: DeployScript>(
    script: &S,
    env: &mut DeployEnvironment,
    tags: &[Tag],
) -> Result<()> {
    if !is_selected(S::TAGS, tags) {
        tracing::debug!(script = S::NAME, "Skipping script, no matching tag");
        return Ok(());
    }

    tracing::debug!(script = S::NAME, "Running script");
    script.run(env).await
}

/// Run the deployment pipeline: mocks first, then the Lottery.
pub async fn run_scripts(env: &mut DeployEnvironment, tags: &[Tag]) -> Result<()> {
    run_script(&DeployMocks, env, tags).await?;
    run_script(&DeployLottery, env, tags).await?;
    Ok(())
}
