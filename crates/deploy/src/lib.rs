//! lottery-deploy - Deployment library for the VRF-backed Lottery contract.
//!
//! This crate deploys a VRF coordinator mock on development networks, deploys the
//! Lottery wired to either the mock or the live coordinator, and submits the
//! Lottery source to an Etherscan-compatible explorer on public networks.

pub mod artifacts;
pub mod config;
pub mod contracts;
pub mod scripts;
pub mod verify;

mod deployments;
mod environment;
mod fingerprint;
mod network;
mod params;

pub use artifacts::{Artifact, ArtifactStore, BuildInfo};
pub use config::{NetworkConfig, ProjectConfig};
pub use deployments::{DeploymentRecord, DeploymentStore};
pub use environment::{DeployEnvironment, DeployOptions, DeployResult};
pub use fingerprint::DeploymentFingerprint;
pub use network::Network;
pub use params::ChainParams;
pub use scripts::{DeployScript, Tag, run_scripts};
pub use verify::{EtherscanClient, VerificationOutcome, VerifyError};

use anyhow::Result;

/// Connect to `network`, then run the scripts selected by `tags`.
pub async fn deploy(config: ProjectConfig, network: &str, tags: &[Tag], reset: bool) -> Result<()> {
    tracing::info!(network, tags = ?tags, reset, "Starting deployment...");

    let mut env = DeployEnvironment::new(config, network, reset).await?;
    run_scripts(&mut env, tags).await?;

    tracing::info!("✓ Deployment complete!");
    for (name, record) in env.deployments.records() {
        tracing::info!("{:<24} {}", name, record.address);
    }

    Ok(())
}
