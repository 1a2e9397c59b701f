//! The environment deploy scripts run in.

use alloy::{
    network::{ReceiptResponse, TransactionBuilder},
    primitives::{Address, B256, Bytes},
    providers::Provider,
    rpc::types::TransactionRequest,
};
use anyhow::{Context, Result};

use crate::{
    ArtifactStore, DeploymentFingerprint, DeploymentRecord, DeploymentStore, EtherscanClient,
    Network, ProjectConfig,
};

/// Options of a single contract deployment.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// ABI-encoded constructor arguments.
    pub args: Bytes,
    /// Confirmations to wait for after the creation transaction is mined.
    pub wait_confirmations: u64,
}

impl DeployOptions {
    pub fn new(args: impl Into<Bytes>) -> Self {
        Self {
            args: args.into(),
            wait_confirmations: 0,
        }
    }

    pub fn wait_confirmations(mut self, confirmations: u64) -> Self {
        self.wait_confirmations = confirmations;
        self
    }
}

/// Outcome of [`DeployEnvironment::deploy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    pub address: Address,
    pub transaction_hash: B256,
    /// ABI-encoded constructor arguments the contract was created with.
    pub constructor_args: Bytes,
    /// `false` when an identical earlier deployment was reused.
    pub newly_deployed: bool,
}

/// Everything a deploy script needs: the connected network, the artifacts and
/// the deployment records of the network.
#[derive(Debug)]
pub struct DeployEnvironment {
    pub config: ProjectConfig,
    pub network: Network,
    pub artifacts: ArtifactStore,
    pub deployments: DeploymentStore,
}

impl DeployEnvironment {
    /// Connect to `network_name` and load its deployment records.
    ///
    /// With `reset`, records from earlier runs are discarded first.
    pub async fn new(config: ProjectConfig, network_name: &str, reset: bool) -> Result<Self> {
        let network = Network::connect(&config, network_name).await?;

        let deployments = if network.is_ephemeral() {
            DeploymentStore::in_memory()
        } else {
            let root = &config.paths.deployments;
            if reset {
                DeploymentStore::reset(root, network_name)?;
            }
            let store = DeploymentStore::open(root, network_name)?;
            store.ensure_chain_id(network.chain_id)?;
            store
        };

        let artifacts = ArtifactStore::new(&config.paths.artifacts);

        Ok(Self {
            config,
            network,
            artifacts,
            deployments,
        })
    }

    /// Deploy a contract from its artifact, reusing an identical earlier deployment.
    pub async fn deploy(&mut self, name: &str, options: DeployOptions) -> Result<DeployResult> {
        let artifact = self.artifacts.artifact(name)?;
        let args = artifact.describe_constructor_args(&options.args)?;
        let fingerprint =
            DeploymentFingerprint::new(name, &artifact.bytecode, &options.args).compute_hash();

        let previous = self.deployments.get(name).cloned();
        if let Some(previous) = &previous {
            if previous.fingerprint == fingerprint && self.has_code(previous.address).await? {
                tracing::info!(
                    contract = name,
                    address = %previous.address,
                    "reusing \"{}\" at {}",
                    name,
                    previous.address
                );
                return Ok(DeployResult {
                    address: previous.address,
                    transaction_hash: previous.transaction_hash,
                    constructor_args: previous.constructor_args.clone(),
                    newly_deployed: false,
                });
            }
        }

        let mut code = artifact.bytecode.to_vec();
        code.extend_from_slice(&options.args);

        let tx = TransactionRequest::default()
            .with_from(self.network.deployer)
            .with_deploy_code(code);

        let pending = self
            .network
            .provider
            .send_transaction(tx)
            .await
            .with_context(|| format!("Failed to send deployment transaction for {name}"))?;
        let transaction_hash = *pending.tx_hash();

        tracing::debug!(
            contract = name,
            tx_hash = %transaction_hash,
            ?args,
            "Deployment transaction sent"
        );

        let confirmations = self
            .network
            .confirmations
            .unwrap_or(options.wait_confirmations)
            .max(1);
        let receipt = pending
            .with_required_confirmations(confirmations)
            .get_receipt()
            .await
            .with_context(|| format!("Failed to get the deployment receipt of {name}"))?;

        if !receipt.status() {
            anyhow::bail!("Deployment transaction {transaction_hash} of {name} reverted");
        }

        let address = receipt
            .contract_address
            .with_context(|| format!("Deployment receipt of {name} has no contract address"))?;

        tracing::info!(
            contract = name,
            tx_hash = %transaction_hash,
            address = %address,
            gas_used = receipt.gas_used,
            "deploying \"{}\" (tx: {})...: deployed at {} with {} gas",
            name,
            transaction_hash,
            address,
            receipt.gas_used
        );

        let record = DeploymentRecord {
            address,
            abi: artifact.abi,
            transaction_hash,
            args,
            constructor_args: options.args.clone(),
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            fingerprint,
            num_deployments: previous.map_or(1, |p| p.num_deployments + 1),
            deployed_at: chrono::Utc::now().to_rfc3339(),
        };
        self.deployments.save(name, record)?;

        Ok(DeployResult {
            address,
            transaction_hash,
            constructor_args: options.args,
            newly_deployed: true,
        })
    }

    /// The address of a contract deployed earlier on this network.
    pub fn get_contract(&self, name: &str) -> Result<Address> {
        self.deployments
            .get(name)
            .map(|record| record.address)
            .with_context(|| format!("No deployment found for {name}"))
    }

    /// The verification client, when an explorer API key is configured.
    pub fn explorer(&self) -> Result<Option<EtherscanClient>> {
        let Some(api_key) = self.config.etherscan.api_key() else {
            return Ok(None);
        };

        EtherscanClient::new(&self.config.etherscan.api_url, api_key, self.network.chain_id)
            .map(Some)
    }

    async fn has_code(&self, address: Address) -> Result<bool> {
        let code = self
            .network
            .provider
            .get_code_at(address)
            .await
            .with_context(|| format!("Failed to fetch code at {address}"))?;
        Ok(!code.is_empty())
    }
}
