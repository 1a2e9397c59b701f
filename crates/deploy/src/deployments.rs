//! Deployment records, one JSON file per contract and network.
//!
//! Records live at `<deployments>/<network>/<Contract>.json`, next to a
//! `.chainId` file holding the chain the records belong to.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy::{
    json_abi::JsonAbi,
    primitives::{Address, B256, Bytes},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CHAIN_ID_FILENAME: &str = ".chainId";

/// What is known about a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub address: Address,
    pub abi: JsonAbi,
    pub transaction_hash: B256,
    /// Constructor arguments, human readable.
    pub args: Vec<String>,
    /// Constructor arguments, ABI-encoded.
    pub constructor_args: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// See [`crate::DeploymentFingerprint`].
    pub fingerprint: String,
    /// How many times the contract was deployed on this network.
    pub num_deployments: u64,
    /// RFC 3339 timestamp of the deployment.
    pub deployed_at: String,
}

/// The deployment records of one network.
///
/// Records of ephemeral networks are only kept in memory.
#[derive(Debug, Clone, Default)]
pub struct DeploymentStore {
    dir: Option<PathBuf>,
    records: BTreeMap<String, DeploymentRecord>,
}

impl DeploymentStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the records of a network. A missing directory is an empty store.
    pub fn open(root: &Path, network: &str) -> Result<Self> {
        let dir = root.join(network);
        let mut records = BTreeMap::new();

        if dir.exists() {
            for entry in std::fs::read_dir(&dir)
                .with_context(|| format!("Failed to read deployments from {}", dir.display()))?
            {
                let path = entry?.path();
                let Some(name) = record_name(&path) else {
                    continue;
                };

                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let record: DeploymentRecord =
                    serde_json::from_str(&content).with_context(|| {
                        format!("Failed to parse deployment record {}", path.display())
                    })?;
                records.insert(name, record);
            }
        }

        tracing::debug!(
            network,
            dir = %dir.display(),
            records = records.len(),
            "Deployment records loaded"
        );

        Ok(Self {
            dir: Some(dir),
            records,
        })
    }

    /// Delete every record of a network.
    pub fn reset(root: &Path, network: &str) -> Result<()> {
        let dir = root.join(network);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove {}", dir.display()))?;
            tracing::info!(network, dir = %dir.display(), "Deployment records reset");
        }
        Ok(())
    }

    /// Check the records belong to `chain_id`, claiming an empty store for it.
    pub fn ensure_chain_id(&self, chain_id: u64) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let path = dir.join(CHAIN_ID_FILENAME);
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let stored: u64 = content
                .trim()
                .parse()
                .with_context(|| format!("Invalid chain id in {}", path.display()))?;

            if stored != chain_id {
                anyhow::bail!(
                    "Deployments in {} belong to chain {} but the network reports chain {}. \
                     Run again with --reset to discard them",
                    dir.display(),
                    stored,
                    chain_id
                );
            }
            return Ok(());
        }

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        std::fs::write(&path, chain_id.to_string())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DeploymentRecord> {
        self.records.get(name)
    }

    /// Store a record, writing it to disk unless the store is in memory.
    pub fn save(&mut self, name: &str, record: DeploymentRecord) -> Result<()> {
        if let Some(dir) = &self.dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let path = dir.join(format!("{name}.json"));
            let json = serde_json::to_string_pretty(&record)
                .context("Failed to serialize deployment record")?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        self.records.insert(name.to_string(), record);
        Ok(())
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &DeploymentRecord)> {
        self.records.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The contract name of a record file, `None` for anything else in the directory.
fn record_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if file_name.starts_with('.') {
        return None;
    }
    file_name.strip_suffix(".json").map(str::to_string)
}
