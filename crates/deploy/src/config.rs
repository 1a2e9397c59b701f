//! Project configuration: compilers, networks, explorer credentials and named accounts.
//!
//! Configuration is layered with figment, lowest priority first:
//! 1. built-in defaults ([`ProjectConfig::default`])
//! 2. the TOML project file (`lottery.toml` unless another path is given)
//! 3. `LOTTERY_`-prefixed environment variables, `__` separating nested keys
//!    (e.g. `LOTTERY_NETWORKS__LOCALHOST__URL`)
//! 4. the plain environment variables the project has always used
//!    (`GOERLI_RPC_URL`, `GOERLI_PRIVATE_KEY`, `ETHERSCAN_API_KEY`)

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy::primitives::{Address, address};
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{params::ChainParams, verify::DEFAULT_API_URL};

/// The default name of the project configuration file.
pub const CONFIG_FILENAME: &str = "lottery.toml";

/// Prefix of the environment variables that override configuration keys.
pub const ENV_PREFIX: &str = "LOTTERY_";

/// Plain environment variables and the configuration key they populate.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("GOERLI_RPC_URL", "networks.goerli.url"),
    ("GOERLI_PRIVATE_KEY", "networks.goerli.private_key"),
    ("ETHERSCAN_API_KEY", "etherscan.api_key"),
];

const REDACTED: &str = "<redacted>";

/// The admin account handed to the Lottery constructor unless configured otherwise.
pub const DEFAULT_LOTTERY_ADMIN: Address =
    address!("0x3718c360aa8ea1aa6706a960875bb405aeabee57");

/// Root configuration of the deployment project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Solidity compiler settings the artifacts were built with.
    pub solidity: SolidityConfig,
    /// Network used when none is given on the command line.
    pub default_network: String,
    /// Networks on which mocks are deployed instead of using live oracles.
    pub development_chains: Vec<String>,
    /// Known networks, by name.
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Block explorer used for source verification.
    pub etherscan: EtherscanConfig,
    /// Named account indices.
    pub named_accounts: NamedAccounts,
    /// Project directories.
    pub paths: PathsConfig,
    /// Lottery deployment settings that do not vary per chain.
    pub lottery: LotteryConfig,
    /// Per-chain Lottery parameters, keyed by decimal chain id.
    pub chains: BTreeMap<String, ChainParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidityConfig {
    pub compilers: Vec<CompilerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    pub version: String,
}

/// Configuration of a single network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain id the endpoint is expected to report.
    pub chain_id: u64,
    /// JSON-RPC endpoint. When absent, an ephemeral local node is started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Hex-encoded private key of the deployer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// BIP-39 mnemonic; the deployer is derived at the named account index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    /// Whether this network is a public network.
    #[serde(default)]
    pub live: bool,
    /// Lift the contract size limit on locally started nodes.
    #[serde(default)]
    pub allow_unlimited_contract_size: bool,
    /// Confirmations to wait for every deployment on this network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
}

impl NetworkConfig {
    /// The parsed RPC URL, if one is configured.
    pub fn rpc_url(&self) -> Result<Option<Url>> {
        non_empty(&self.url)
            .map(|url| Url::parse(url).with_context(|| format!("Invalid network url: {url}")))
            .transpose()
    }

    pub fn private_key(&self) -> Option<&str> {
        non_empty(&self.private_key)
    }

    pub fn mnemonic(&self) -> Option<&str> {
        non_empty(&self.mnemonic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtherscanConfig {
    /// API key. Verification is skipped when it is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of the Etherscan-compatible API.
    pub api_url: String,
}

impl EtherscanConfig {
    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAccounts {
    /// Index of the deployer among the network's accounts.
    pub deployer: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Compiled contract artifacts (Hardhat layout).
    pub artifacts: PathBuf,
    /// Where deployment records are kept, one directory per network.
    pub deployments: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryConfig {
    /// Admin account passed to the Lottery constructor.
    pub admin: Address,
    /// Add the Lottery as a consumer of the mock subscription on development chains.
    pub register_consumer: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let networks = BTreeMap::from([
            (
                "hardhat".to_string(),
                NetworkConfig {
                    chain_id: 31337,
                    url: None,
                    private_key: None,
                    mnemonic: None,
                    live: false,
                    allow_unlimited_contract_size: true,
                    confirmations: None,
                },
            ),
            (
                "localhost".to_string(),
                NetworkConfig {
                    chain_id: 31337,
                    url: Some("http://127.0.0.1:8545/".to_string()),
                    private_key: None,
                    mnemonic: None,
                    live: false,
                    allow_unlimited_contract_size: false,
                    confirmations: None,
                },
            ),
            (
                "goerli".to_string(),
                NetworkConfig {
                    chain_id: 5,
                    url: None,
                    private_key: None,
                    mnemonic: None,
                    live: true,
                    allow_unlimited_contract_size: false,
                    confirmations: None,
                },
            ),
        ]);

        Self {
            solidity: SolidityConfig {
                compilers: ["0.8.4", "0.8.17"]
                    .into_iter()
                    .map(|version| CompilerConfig {
                        version: version.to_string(),
                    })
                    .collect(),
            },
            default_network: "hardhat".to_string(),
            development_chains: vec!["hardhat".to_string(), "localhost".to_string()],
            networks,
            etherscan: EtherscanConfig {
                api_key: None,
                api_url: DEFAULT_API_URL.to_string(),
            },
            named_accounts: NamedAccounts { deployer: 0 },
            paths: PathsConfig {
                artifacts: PathBuf::from("artifacts"),
                deployments: PathBuf::from("deployments"),
            },
            lottery: LotteryConfig {
                admin: DEFAULT_LOTTERY_ADMIN,
                register_consumer: true,
            },
            chains: ChainParams::builtin()
                .into_iter()
                .map(|(chain_id, params)| (chain_id.to_string(), params))
                .collect(),
        }
    }
}

impl ProjectConfig {
    /// Build the layered figment for the given project file.
    pub fn figment(path: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        for (var, key) in LEGACY_ENV_KEYS {
            figment = figment.merge(Env::raw().only(&[*var]).map(move |_| (*key).into()));
        }

        figment
    }

    /// Load the configuration.
    ///
    /// An explicitly given file must exist. Without one, `lottery.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) if !path.exists() => {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(CONFIG_FILENAME),
        };

        let config: Self = Self::figment(&path)
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Look up a network by name.
    pub fn network(&self, name: &str) -> Result<&NetworkConfig> {
        self.networks.get(name).with_context(|| {
            format!(
                "Unknown network '{}'. Known networks: {}",
                name,
                self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }

    /// Whether mocks stand in for the oracle on the named network.
    pub fn is_development(&self, name: &str) -> bool {
        self.development_chains.iter().any(|chain| chain == name)
    }

    /// Lottery parameters for a chain id.
    pub fn chain_params(&self, chain_id: u64) -> Result<&ChainParams> {
        self.chains
            .get(&chain_id.to_string())
            .with_context(|| format!("No network parameters configured for chain id {chain_id}"))
    }

    pub fn compiler_versions(&self) -> Vec<&str> {
        self.solidity
            .compilers
            .iter()
            .map(|compiler| compiler.version.as_str())
            .collect()
    }

    /// A copy with every secret replaced, suitable for printing.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for network in config.networks.values_mut() {
            if network.private_key().is_some() {
                network.private_key = Some(REDACTED.to_string());
            }
            if network.mnemonic().is_some() {
                network.mnemonic = Some(REDACTED.to_string());
            }
        }
        if config.etherscan.api_key().is_some() {
            config.etherscan.api_key = Some(REDACTED.to_string());
        }
        config
    }
}

/// Empty values count as unset, so `GOERLI_RPC_URL=` behaves like a missing variable.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = ProjectConfig::default();
        assert_eq!(config.default_network, "hardhat");
        assert_eq!(config.compiler_versions(), vec!["0.8.4", "0.8.17"]);
        assert!(config.is_development("hardhat"));
        assert!(config.is_development("localhost"));
        assert!(!config.is_development("goerli"));
        assert_eq!(config.network("goerli").unwrap().chain_id, 5);
        assert_eq!(config.network("localhost").unwrap().chain_id, 31337);
        assert!(config.network("hardhat").unwrap().allow_unlimited_contract_size);
        assert_eq!(config.named_accounts.deployer, 0);
        assert_eq!(config.lottery.admin, DEFAULT_LOTTERY_ADMIN);
    }

    #[test]
    fn test_unknown_network_lists_known_ones() {
        let config = ProjectConfig::default();
        let err = config.network("mainnet").unwrap_err().to_string();
        assert!(err.contains("mainnet"));
        assert!(err.contains("goerli, hardhat, localhost"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        Jail::expect_with(|jail| {
            // Deployment credentials exported by the developer's shell must not leak in.
            jail.clear_env();

            let config = ProjectConfig::load(None).expect("defaults should load");
            assert_eq!(config, ProjectConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_missing_explicit_file() {
        Jail::expect_with(|_jail| {
            let result = ProjectConfig::load(Some(Path::new("missing.toml")));
            assert!(result.is_err());
            Ok(())
        });
    }

    #[test]
    fn test_toml_overrides_merge_with_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                CONFIG_FILENAME,
                r#"
                default_network = "localhost"

                [networks.sepolia]
                chain_id = 11155111
                url = "https://rpc.sepolia.org"
                live = true

                [chains.11155111]
                subscription_id = 1234
                "#,
            )?;

            let config = ProjectConfig::load(None).expect("config should load");
            assert_eq!(config.default_network, "localhost");
            // Built-in networks survive the merge.
            assert!(config.networks.contains_key("goerli"));
            let sepolia = config.network("sepolia").unwrap();
            assert_eq!(
                sepolia.rpc_url().unwrap().unwrap().as_str(),
                "https://rpc.sepolia.org/"
            );
            let params = config.chain_params(11155111).unwrap();
            assert_eq!(params.subscription_id, Some(1234));
            assert!(params.vrf_coordinator_v2.is_some());
            Ok(())
        });
    }

    #[test]
    fn test_legacy_env_variables() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("GOERLI_RPC_URL", "https://goerli.example.org");
            jail.set_env(
                "GOERLI_PRIVATE_KEY",
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            );
            jail.set_env("ETHERSCAN_API_KEY", "ABCDEF");

            let config = ProjectConfig::load(None).expect("config should load");
            let goerli = config.network("goerli").unwrap();
            assert_eq!(goerli.url.as_deref(), Some("https://goerli.example.org"));
            assert!(goerli.private_key().is_some());
            assert_eq!(config.etherscan.api_key(), Some("ABCDEF"));
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_overrides() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("LOTTERY_DEFAULT_NETWORK", "goerli");
            jail.set_env("LOTTERY_NAMED_ACCOUNTS__DEPLOYER", "3");

            let config = ProjectConfig::load(None).expect("config should load");
            assert_eq!(config.default_network, "goerli");
            assert_eq!(config.named_accounts.deployer, 3);
            Ok(())
        });
    }

    #[test]
    fn test_empty_values_are_unset() {
        let network = NetworkConfig {
            chain_id: 5,
            url: Some(String::new()),
            private_key: Some("  ".to_string()),
            mnemonic: None,
            live: true,
            allow_unlimited_contract_size: false,
            confirmations: None,
        };
        assert!(network.rpc_url().unwrap().is_none());
        assert!(network.private_key().is_none());
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut config = ProjectConfig::default();
        config.etherscan.api_key = Some("secret".to_string());
        config.networks.get_mut("goerli").unwrap().private_key = Some("0x01".to_string());

        let redacted = config.redacted();
        assert_eq!(redacted.etherscan.api_key.as_deref(), Some(REDACTED));
        assert_eq!(
            redacted.networks["goerli"].private_key.as_deref(),
            Some(REDACTED)
        );
        // Unset secrets stay unset.
        assert!(redacted.networks["localhost"].private_key.is_none());
    }
}
