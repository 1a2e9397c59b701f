//! Per-chain Lottery parameters.

use alloy::primitives::{Address, B256, U256, address, b256};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// 0.01 ether, in wei.
const DEFAULT_ENTRANCE_FEE: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);
const DEFAULT_CALLBACK_GAS_LIMIT: u32 = 500_000;
const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Lottery constructor and upkeep parameters for one chain.
///
/// Development chains leave `vrf_coordinator_v2` and `subscription_id` unset,
/// both come from the locally deployed mock instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub name: String,
    /// Ticket price, in wei.
    pub entrance_fee: U256,
    /// VRF key hash selecting the maximum gas price paid for a fulfillment.
    pub gas_lane: B256,
    /// Gas limit of the VRF fulfillment callback.
    pub callback_gas_limit: u32,
    /// Seconds between upkeeps.
    pub interval: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrf_coordinator_v2: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<u64>,
}

impl ChainParams {
    /// The parameter table shipped with the project, keyed by chain id.
    pub fn builtin() -> Vec<(u64, ChainParams)> {
        vec![
            (
                5,
                ChainParams {
                    name: "goerli".to_string(),
                    entrance_fee: DEFAULT_ENTRANCE_FEE,
                    gas_lane: b256!(
                        "0x79d3d8832d904592c0bf9818b621522c988bb8b0c05cdc3b15aea1b6e8db0c15"
                    ),
                    callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
                    interval: DEFAULT_INTERVAL_SECS,
                    vrf_coordinator_v2: Some(address!(
                        "0x2ca8e0c643bde4c2e08ab1fa0da3401adad7734d"
                    )),
                    subscription_id: None,
                },
            ),
            (
                11155111,
                ChainParams {
                    name: "sepolia".to_string(),
                    entrance_fee: DEFAULT_ENTRANCE_FEE,
                    gas_lane: b256!(
                        "0x474e34a077df58807dbe9c96d3c009b23b3c6d0cce433e59bbf5b34f823bc56c"
                    ),
                    callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
                    interval: DEFAULT_INTERVAL_SECS,
                    vrf_coordinator_v2: Some(address!(
                        "0x8103b0a8a00be2ddc778e6e7eaa21791cd364625"
                    )),
                    subscription_id: None,
                },
            ),
            (
                31337,
                ChainParams {
                    name: "hardhat".to_string(),
                    entrance_fee: DEFAULT_ENTRANCE_FEE,
                    gas_lane: b256!(
                        "0x79d3d8832d904592c0bf9818b621522c988bb8b0c05cdc3b15aea1b6e8db0c15"
                    ),
                    callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
                    interval: DEFAULT_INTERVAL_SECS,
                    vrf_coordinator_v2: None,
                    subscription_id: None,
                },
            ),
        ]
    }

    /// The live VRF coordinator of a public chain.
    pub fn coordinator(&self, chain_id: u64) -> Result<Address> {
        self.vrf_coordinator_v2.ok_or_else(|| {
            anyhow::anyhow!(
                "No VRF coordinator configured for {} (chain id {}). \
                 Set chains.{}.vrf_coordinator_v2",
                self.name,
                chain_id,
                chain_id
            )
        })
    }

    /// The funded VRF subscription of a public chain.
    pub fn subscription(&self, chain_id: u64) -> Result<u64> {
        self.subscription_id.ok_or_else(|| {
            anyhow::anyhow!(
                "No VRF subscription id configured for {} (chain id {}). \
                 Set chains.{}.subscription_id",
                self.name,
                chain_id,
                chain_id
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entrance_fee_is_one_hundredth_ether() {
        assert_eq!(
            DEFAULT_ENTRANCE_FEE,
            U256::from(10u64).pow(U256::from(16u64))
        );
    }

    #[test]
    fn test_builtin_table() {
        let table = ChainParams::builtin();
        let chain_ids: Vec<u64> = table.iter().map(|(id, _)| *id).collect();
        assert_eq!(chain_ids, vec![5, 11155111, 31337]);

        for (_, params) in &table {
            assert_eq!(params.callback_gas_limit, 500_000);
            assert_eq!(params.interval, 30);
        }
    }

    #[test]
    fn test_development_chain_has_no_live_oracle() {
        let (_, hardhat) = ChainParams::builtin()
            .into_iter()
            .find(|(id, _)| *id == 31337)
            .unwrap();

        let err = hardhat.coordinator(31337).unwrap_err().to_string();
        assert!(err.contains("chains.31337.vrf_coordinator_v2"));
        assert!(hardhat.subscription(31337).is_err());
    }

    #[test]
    fn test_public_chain_requires_subscription() {
        let (_, mut goerli) = ChainParams::builtin()
            .into_iter()
            .find(|(id, _)| *id == 5)
            .unwrap();

        assert!(goerli.coordinator(5).is_ok());
        let err = goerli.subscription(5).unwrap_err().to_string();
        assert!(err.contains("goerli"));

        goerli.subscription_id = Some(42);
        assert_eq!(goerli.subscription(5).unwrap(), 42);
    }
}
