use alloy::sol_types::SolConstructor;
use anyhow::Result;

use super::{DeployScript, SEPARATOR, Tag};
use crate::{
    DeployEnvironment, DeployOptions,
    contracts::{BASE_FEE, GAS_PRICE_LINK, VRF_COORDINATOR_V2_MOCK, VRFCoordinatorV2Mock},
};

/// Deploys the VRF coordinator mock on development networks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployMocks;

impl DeployScript for DeployMocks {
    const NAME: &'static str = "00-deploy-mocks";
    const TAGS: &'static [Tag] = &[Tag::All, Tag::Mocks];

    async fn run(&self, env: &mut DeployEnvironment) -> Result<()> {
        tracing::info!("{}", env.network.name);

        if !env.network.is_development {
            return Ok(());
        }

        tracing::info!("Local network detected, deploying mocks");

        let args = VRFCoordinatorV2Mock::constructorCall {
            baseFee: BASE_FEE,
            gasPriceLink: GAS_PRICE_LINK,
        }
        .abi_encode();
        env.deploy(VRF_COORDINATOR_V2_MOCK, DeployOptions::new(args))
            .await?;

        tracing::info!("VRFCoordinatorV2Mock deployed");
        tracing::info!("{}", SEPARATOR);

        Ok(())
    }
}
