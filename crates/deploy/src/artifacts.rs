//! Compiled contract artifacts in the Hardhat layout.
//!
//! ```text
//! artifacts/
//! ├── build-info/<hash>.json
//! └── contracts/Lottery.sol/
//!     ├── Lottery.json
//!     └── Lottery.dbg.json
//! ```

use std::path::{Path, PathBuf};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

const BUILD_INFO_DIR: &str = "build-info";
const DEBUG_SUFFIX: &str = ".dbg.json";

/// A compiled contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    /// Source file the contract is declared in, relative to the project root.
    pub source_name: String,
    pub abi: JsonAbi,
    /// Creation code, without constructor arguments.
    pub bytecode: Bytes,
    /// Where the artifact was read from.
    #[serde(skip)]
    pub path: PathBuf,
}

impl Artifact {
    /// The `source:Name` identifier explorers expect.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Decode ABI-encoded constructor arguments into readable strings.
    ///
    /// Fails when the encoding does not match the artifact's constructor.
    pub fn describe_constructor_args(&self, encoded: &[u8]) -> Result<Vec<String>> {
        let Some(constructor) = self.abi.constructor() else {
            if encoded.is_empty() {
                return Ok(Vec::new());
            }
            anyhow::bail!(
                "{} has no constructor but {} bytes of arguments were given",
                self.contract_name,
                encoded.len()
            );
        };

        let values = constructor.abi_decode_input(encoded).with_context(|| {
            format!(
                "Constructor arguments do not match the {} artifact ABI",
                self.contract_name
            )
        })?;

        Ok(values.iter().map(format_value).collect())
    }
}

/// Compiler input and version of one build.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_version: String,
    /// Full version including the commit, e.g. `0.8.17+commit.8df45f5f`.
    pub solc_long_version: String,
    /// The standard JSON input the compiler was invoked with.
    pub input: Value,
}

#[derive(Debug, Deserialize)]
struct DebugFile {
    #[serde(rename = "buildInfo")]
    build_info: PathBuf,
}

/// Read access to the artifacts directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find and parse the artifact of a contract.
    pub fn artifact(&self, name: &str) -> Result<Artifact> {
        let file_name = format!("{name}.json");
        let mut matches = Vec::new();
        find_files(&self.root, &file_name, &mut matches).with_context(|| {
            format!("Failed to read artifacts directory {}", self.root.display())
        })?;

        let path = match matches.as_slice() {
            [] => anyhow::bail!(
                "No artifact found for {} in {}. Compile the contracts first",
                name,
                self.root.display()
            ),
            [path] => path.clone(),
            _ => anyhow::bail!(
                "Multiple artifacts named {}: {}",
                name,
                matches
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut artifact: Artifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;

        if artifact.bytecode.is_empty() {
            anyhow::bail!(
                "{} has no bytecode. Abstract contracts and interfaces cannot be deployed",
                name
            );
        }

        artifact.path = path;
        Ok(artifact)
    }

    /// Load the build that produced an artifact.
    pub fn build_info(&self, artifact: &Artifact) -> Result<BuildInfo> {
        let debug_path = artifact
            .path
            .with_file_name(format!("{}{}", artifact.contract_name, DEBUG_SUFFIX));
        let content = std::fs::read_to_string(&debug_path)
            .with_context(|| format!("Failed to read {}", debug_path.display()))?;
        let debug: DebugFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", debug_path.display()))?;

        let parent = debug_path
            .parent()
            .context("Debug file path must have a parent directory")?;
        let build_info_path = parent.join(&debug.build_info);
        let content = std::fs::read_to_string(&build_info_path)
            .with_context(|| format!("Failed to read build info {}", build_info_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse build info {}", build_info_path.display()))
    }
}

/// Warn when a build used a compiler that is not part of the project configuration.
pub fn check_compiler(build: &BuildInfo, configured: &[&str]) -> bool {
    let known = configured.contains(&build.solc_version.as_str());
    if !known {
        tracing::warn!(
            solc_version = %build.solc_version,
            configured = ?configured,
            "Artifacts were built with a compiler that is not configured"
        );
    }
    known
}

fn find_files(dir: &Path, file_name: &str, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == BUILD_INFO_DIR) {
                continue;
            }
            find_files(&path, file_name, found)?;
        } else if path.file_name().is_some_and(|n| n == file_name) {
            found.push(path);
        }
    }
    Ok(())
}

fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Address(address) => address.to_checksum(None),
        DynSolValue::Uint(value, _) => value.to_string(),
        DynSolValue::Int(value, _) => value.to_string(),
        DynSolValue::Bool(value) => value.to_string(),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::String(value) => value.clone(),
        DynSolValue::Array(values)
        | DynSolValue::FixedArray(values)
        | DynSolValue::Tuple(values) => format!(
            "[{}]",
            values.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::{
        primitives::{U256, address},
        sol_types::SolValue,
    };
    use tempdir::TempDir;

    /// Creation code that deploys a contract whose runtime code is a single `STOP`.
    pub(crate) const STOP_CONTRACT_BYTECODE: &str = "0x6001600c60003960016000f300";

    /// Write a Hardhat-style artifact (and its build info) for a contract taking
    /// `(address owner, uint256 value)`.
    pub(crate) fn write_fixture(root: &Path, name: &str) {
        let dir = root.join(format!("contracts/{name}.sol"));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::create_dir_all(root.join(BUILD_INFO_DIR)).unwrap();

        let artifact = serde_json::json!({
            "_format": "hh-sol-artifact-1",
            "contractName": name,
            "sourceName": format!("contracts/{name}.sol"),
            "abi": [{
                "type": "constructor",
                "stateMutability": "nonpayable",
                "inputs": [
                    {"name": "owner", "type": "address", "internalType": "address"},
                    {"name": "value", "type": "uint256", "internalType": "uint256"}
                ]
            }],
            "bytecode": STOP_CONTRACT_BYTECODE,
            "deployedBytecode": "0x00",
            "linkReferences": {},
            "deployedLinkReferences": {}
        });
        std::fs::write(
            dir.join(format!("{name}.json")),
            serde_json::to_string_pretty(&artifact).unwrap(),
        )
        .unwrap();

        let debug = serde_json::json!({
            "_format": "hh-sol-dbg-1",
            "buildInfo": "../../build-info/0123abcd.json"
        });
        std::fs::write(
            dir.join(format!("{name}{DEBUG_SUFFIX}")),
            serde_json::to_string(&debug).unwrap(),
        )
        .unwrap();

        let build_info = serde_json::json!({
            "_format": "hh-sol-build-info-1",
            "solcVersion": "0.8.17",
            "solcLongVersion": "0.8.17+commit.8df45f5f",
            "input": {
                "language": "Solidity",
                "sources": {
                    format!("contracts/{name}.sol"): {"content": "contract X {}"}
                },
                "settings": {"optimizer": {"enabled": false, "runs": 200}}
            },
            "output": {}
        });
        std::fs::write(
            root.join(BUILD_INFO_DIR).join("0123abcd.json"),
            serde_json::to_string(&build_info).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_artifact_lookup() {
        let temp_dir = TempDir::new("lottery-artifacts").unwrap();
        write_fixture(temp_dir.path(), "Fixture");

        let store = ArtifactStore::new(temp_dir.path());
        let artifact = store.artifact("Fixture").unwrap();

        assert_eq!(artifact.contract_name, "Fixture");
        assert_eq!(artifact.fully_qualified_name(), "contracts/Fixture.sol:Fixture");
        assert_eq!(artifact.bytecode.len(), 13);
        assert!(artifact.abi.constructor().is_some());
    }

    #[test]
    fn test_missing_artifact() {
        let temp_dir = TempDir::new("lottery-artifacts").unwrap();
        write_fixture(temp_dir.path(), "Fixture");

        let store = ArtifactStore::new(temp_dir.path());
        let err = store.artifact("Lottery").unwrap_err().to_string();
        assert!(err.contains("No artifact found for Lottery"));
    }

    #[test]
    fn test_duplicate_artifacts_are_rejected() {
        let temp_dir = TempDir::new("lottery-artifacts").unwrap();
        write_fixture(temp_dir.path(), "Fixture");
        let other = temp_dir.path().join("contracts/test");
        std::fs::create_dir_all(&other).unwrap();
        write_fixture(&other, "Fixture");

        let store = ArtifactStore::new(temp_dir.path());
        let err = store.artifact("Fixture").unwrap_err().to_string();
        assert!(err.contains("Multiple artifacts named Fixture"));
    }

    #[test]
    fn test_build_info() {
        let temp_dir = TempDir::new("lottery-artifacts").unwrap();
        write_fixture(temp_dir.path(), "Fixture");

        let store = ArtifactStore::new(temp_dir.path());
        let artifact = store.artifact("Fixture").unwrap();
        let build = store.build_info(&artifact).unwrap();

        assert_eq!(build.solc_long_version, "0.8.17+commit.8df45f5f");
        assert!(build.input["sources"]["contracts/Fixture.sol"].is_object());
        assert!(check_compiler(&build, &["0.8.4", "0.8.17"]));
        assert!(!check_compiler(&build, &["0.8.4"]));
    }

    #[test]
    fn test_describe_constructor_args() {
        let temp_dir = TempDir::new("lottery-artifacts").unwrap();
        write_fixture(temp_dir.path(), "Fixture");
        let artifact = ArtifactStore::new(temp_dir.path()).artifact("Fixture").unwrap();

        let owner = address!("0x3718c360aa8ea1aa6706a960875bb405aeabee57");
        let encoded = (owner, U256::from(500_000u64)).abi_encode_params();

        let args = artifact.describe_constructor_args(&encoded).unwrap();
        assert_eq!(
            args,
            vec![
                "0x3718c360Aa8EA1Aa6706a960875BB405AEAbEE57".to_string(),
                "500000".to_string()
            ]
        );

        assert!(artifact.describe_constructor_args(&encoded[..32]).is_err());
    }
}
