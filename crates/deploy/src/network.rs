//! Connection to the target chain: endpoint, local node and deployer account.

use std::time::Duration;

use alloy::{
    network::EthereumWallet,
    node_bindings::{Anvil, AnvilInstance},
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
};
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use anyhow::{Context, Result};
use backon::{ConstantBuilder, Retryable};
use url::Url;

use crate::config::{NetworkConfig, ProjectConfig};

/// Delay between attempts to reach the endpoint.
const NODE_READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Attempts to reach the endpoint before giving up.
const NODE_READY_MAX_POLLS: usize = 30;

/// A connected network, ready to send deployment transactions.
pub struct Network {
    /// The network name from the configuration.
    pub name: String,
    /// The chain id reported by the endpoint.
    pub chain_id: u64,
    /// Whether mocks stand in for external oracles on this network.
    pub is_development: bool,
    /// Confirmations forced for every deployment, if configured.
    pub confirmations: Option<u64>,
    /// The JSON-RPC endpoint.
    pub url: Url,
    /// Provider that signs (or lets the node sign) for the deployer.
    pub provider: DynProvider,
    /// The named `deployer` account.
    pub deployer: Address,
    /// Local node started for networks without an endpoint. Dropping it stops the node.
    node: Option<AnvilInstance>,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("name", &self.name)
            .field("chain_id", &self.chain_id)
            .field("is_development", &self.is_development)
            .field("url", &self.url.as_str())
            .field("deployer", &self.deployer)
            .field("ephemeral", &self.is_ephemeral())
            .finish()
    }
}

impl Network {
    /// Connect to the named network.
    ///
    /// Networks without a URL get a fresh local node that lives as long as the
    /// returned value. The endpoint must report the configured chain id.
    pub async fn connect(config: &ProjectConfig, name: &str) -> Result<Self> {
        let network = config.network(name)?;

        let (url, node) = match network.rpc_url()? {
            Some(url) => (url, None),
            None if network.live => {
                anyhow::bail!(
                    "Network '{}' has no RPC url configured. Set networks.{}.url",
                    name,
                    name
                );
            }
            None => {
                let node = spawn_local_node(name, network)?;
                (node.endpoint_url(), Some(node))
            }
        };

        let node_provider = ProviderBuilder::new().connect_http(url.clone());

        let probe = &node_provider;
        let chain_id = (|| async move { probe.get_chain_id().await })
            .retry(
                ConstantBuilder::default()
                    .with_delay(NODE_READY_POLL_INTERVAL)
                    .with_max_times(NODE_READY_MAX_POLLS),
            )
            .notify(|e, delay| {
                tracing::trace!(
                    error = %e,
                    network = name,
                    ?delay,
                    "Endpoint not ready, retrying..."
                );
            })
            .await
            .with_context(|| {
                format!("Timeout waiting for network '{name}' at {url} to be ready")
            })?;

        if chain_id != network.chain_id {
            anyhow::bail!(
                "Network '{}' is configured with chain id {} but the endpoint reports {}",
                name,
                network.chain_id,
                chain_id
            );
        }

        let deployer_index = config.named_accounts.deployer;
        let (provider, deployer) = match local_signer(network, deployer_index)? {
            Some(signer) => {
                let deployer = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(url.clone())
                    .erased();
                (provider, deployer)
            }
            None => {
                let accounts = node_provider
                    .get_accounts()
                    .await
                    .context("Failed to list node accounts")?;
                let deployer = accounts.get(deployer_index as usize).copied().with_context(|| {
                    format!(
                        "Network '{}' exposes {} accounts, none at deployer index {}",
                        name,
                        accounts.len(),
                        deployer_index
                    )
                })?;
                (node_provider.erased(), deployer)
            }
        };

        tracing::info!(
            network = name,
            chain_id,
            url = %url,
            deployer = %deployer,
            ephemeral = node.is_some(),
            "Connected to network"
        );

        Ok(Self {
            name: name.to_string(),
            chain_id,
            is_development: config.is_development(name),
            confirmations: network.confirmations,
            url,
            provider,
            deployer,
            node,
        })
    }

    /// Whether the chain only lives for the duration of this process.
    pub fn is_ephemeral(&self) -> bool {
        self.node.is_some()
    }
}

/// Start a throwaway anvil node for the network.
fn spawn_local_node(name: &str, network: &NetworkConfig) -> Result<AnvilInstance> {
    let mut anvil = Anvil::new().chain_id(network.chain_id);
    if network.allow_unlimited_contract_size {
        anvil = anvil.arg("--disable-code-size-limit");
    }

    tracing::info!(network = name, chain_id = network.chain_id, "Starting local node...");

    anvil
        .try_spawn()
        .with_context(|| {
            format!("Failed to start a local node for network '{name}'. Is anvil installed?")
        })
}

/// The deployer signer held by this process, if the network configures one.
///
/// Without a private key or mnemonic, the node's own unlocked accounts are used.
fn local_signer(network: &NetworkConfig, index: u32) -> Result<Option<PrivateKeySigner>> {
    if let Some(key) = network.private_key() {
        let signer = key
            .parse::<PrivateKeySigner>()
            .context("Failed to parse deployer private key")?;
        return Ok(Some(signer));
    }

    if let Some(phrase) = network.mnemonic() {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .index(index)
            .context("Invalid deployer account index")?
            .build()
            .context("Failed to derive deployer from mnemonic")?;
        return Ok(Some(signer));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

    fn network_config() -> NetworkConfig {
        NetworkConfig {
            chain_id: 31337,
            url: Some("http://127.0.0.1:8545".to_string()),
            private_key: None,
            mnemonic: None,
            live: false,
            allow_unlimited_contract_size: false,
            confirmations: None,
        }
    }

    #[test]
    fn test_no_secret_means_node_accounts() {
        assert!(local_signer(&network_config(), 0).unwrap().is_none());
    }

    #[test]
    fn test_private_key_signer() {
        let mut config = network_config();
        config.private_key = Some(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
        );

        let signer = local_signer(&config, 0).unwrap().unwrap();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_mnemonic_signer_uses_deployer_index() {
        let mut config = network_config();
        config.mnemonic = Some(TEST_MNEMONIC.to_string());

        let signer = local_signer(&config, 1).unwrap().unwrap();
        assert_eq!(
            signer.address(),
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_invalid_private_key() {
        let mut config = network_config();
        config.private_key = Some("not-a-key".to_string());
        assert!(local_signer(&config, 0).is_err());
    }

    #[tokio::test]
    async fn test_live_network_requires_url() {
        let config = ProjectConfig::default();
        let err = Network::connect(&config, "goerli").await.unwrap_err();
        assert!(err.to_string().contains("networks.goerli.url"));
    }
}
