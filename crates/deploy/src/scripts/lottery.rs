use alloy::{
    network::ReceiptResponse,
    primitives::{Address, B256, U256},
    rpc::types::TransactionReceipt,
    sol_types::SolConstructor,
};
use anyhow::{Context, Result};

use super::{DeployScript, SEPARATOR, Tag};
use crate::{
    DeployEnvironment, DeployOptions,
    contracts::{
        LOTTERY, Lottery, VRF_COORDINATOR_V2_MOCK, VRF_SUB_FUND_AMOUNT, VRFCoordinatorV2Mock,
    },
    verify,
};

/// Confirmations waited for after the Lottery is created.
const LOTTERY_CONFIRMATIONS: u64 = 1;

/// Deploys the Lottery, wiring it to the mock or to the live VRF coordinator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployLottery;

/// Resolved Lottery constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotteryArgs {
    pub vrf_coordinator_v2: Address,
    pub admin: Address,
    pub entrance_fee: U256,
    pub gas_lane: B256,
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
}

impl LotteryArgs {
    pub fn abi_encode(&self) -> Vec<u8> {
        Lottery::constructorCall {
            vrfCoordinatorV2: self.vrf_coordinator_v2,
            admin: self.admin,
            entranceFee: self.entrance_fee,
            gasLane: self.gas_lane,
            subscriptionId: self.subscription_id,
            callbackGasLimit: self.callback_gas_limit,
        }
        .abi_encode()
    }
}

impl DeployScript for DeployLottery {
    const NAME: &'static str = "01-deploy-lottery";
    const TAGS: &'static [Tag] = &[Tag::All, Tag::Lottery];

    async fn run(&self, env: &mut DeployEnvironment) -> Result<()> {
        let chain_id = env.network.chain_id;
        let deployer = env.network.deployer;

        let (vrf_coordinator_v2, subscription_id) = if env.network.is_development {
            let mock_address = env.get_contract(VRF_COORDINATOR_V2_MOCK)?;
            tracing::info!("ADDRESS {}", mock_address);

            let mock = VRFCoordinatorV2Mock::new(mock_address, env.network.provider.clone());
            let receipt = mock
                .createSubscription()
                .from(deployer)
                .send()
                .await
                .context("Failed to send createSubscription")?
                .get_receipt()
                .await
                .context("Failed to get the createSubscription receipt")?;
            let subscription_id = subscription_created(&receipt)?;

            mock.fundSubscription(subscription_id, VRF_SUB_FUND_AMOUNT)
                .from(deployer)
                .send()
                .await
                .context("Failed to send fundSubscription")?
                .get_receipt()
                .await
                .context("Failed to get the fundSubscription receipt")?;

            (mock_address, subscription_id)
        } else {
            tracing::info!("Network detected, deploying Lottery");
            let params = env.config.chain_params(chain_id)?;
            (params.coordinator(chain_id)?, params.subscription(chain_id)?)
        };
        tracing::info!("VRFCoordinatorV2 address: {}", vrf_coordinator_v2);

        let params = env.config.chain_params(chain_id)?;
        tracing::info!("SUB ID: {}", subscription_id);
        tracing::debug!(interval = params.interval, "Upkeep interval");

        let args = LotteryArgs {
            vrf_coordinator_v2,
            admin: env.config.lottery.admin,
            entrance_fee: params.entrance_fee,
            gas_lane: params.gas_lane,
            subscription_id,
            callback_gas_limit: params.callback_gas_limit,
        };

        let lottery = env
            .deploy(
                LOTTERY,
                DeployOptions::new(args.abi_encode()).wait_confirmations(LOTTERY_CONFIRMATIONS),
            )
            .await?;

        if env.network.is_development && env.config.lottery.register_consumer {
            VRFCoordinatorV2Mock::new(vrf_coordinator_v2, env.network.provider.clone())
                .addConsumer(subscription_id, lottery.address)
                .from(deployer)
                .send()
                .await
                .context("Failed to send addConsumer")?
                .get_receipt()
                .await
                .context("Failed to get the addConsumer receipt")?;
            tracing::info!(
                subscription_id,
                consumer = %lottery.address,
                "Lottery registered as VRF consumer"
            );
        }

        if !env.network.is_development {
            if let Some(explorer) = env.explorer()? {
                tracing::info!("Verifying Lottery contract");
                if let Err(err) = verify::verify_contract(
                    &explorer,
                    &env.artifacts,
                    &env.config.compiler_versions(),
                    LOTTERY,
                    lottery.address,
                    &lottery.constructor_args,
                )
                .await
                {
                    tracing::error!(error = ?err, "Lottery verification failed");
                }
                tracing::info!("{}", SEPARATOR);
            }
        }

        Ok(())
    }
}

/// The subscription id from the `SubscriptionCreated` event of a receipt.
fn subscription_created(receipt: &TransactionReceipt) -> Result<u64> {
    if !receipt.status() {
        anyhow::bail!(
            "createSubscription transaction {} reverted",
            receipt.transaction_hash
        );
    }

    receipt
        .inner
        .logs()
        .iter()
        .find_map(|log| log.log_decode::<VRFCoordinatorV2Mock::SubscriptionCreated>().ok())
        .map(|event| event.inner.data.subId)
        .context("createSubscription emitted no SubscriptionCreated event")
}
