//! Source verification on Etherscan-compatible block explorers.

use std::time::Duration;

use alloy::primitives::Address;
use anyhow::Context;
use backon::{ConstantBuilder, ExponentialBuilder, Retryable};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::ArtifactStore;

/// Etherscan multichain API. The target chain is selected with the `chainid` parameter.
pub const DEFAULT_API_URL: &str = "https://api.etherscan.io/v2/api";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_MAX_POLLS: usize = 20;
const SUBMIT_MIN_DELAY: Duration = Duration::from_secs(5);
const SUBMIT_MAX_ATTEMPTS: usize = 5;

const CODE_FORMAT: &str = "solidity-standard-json-input";

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("verification is still pending")]
    Pending,
    #[error("explorer has not indexed the contract yet: {0}")]
    NotIndexed(String),
    #[error("explorer rejected the verification: {0}")]
    Rejected(String),
    #[error("explorer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected explorer response: {0}")]
    InvalidResponse(String),
}

/// Successful end states of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum VerificationOutcome {
    #[strum(to_string = "verified")]
    Verified,
    #[strum(to_string = "already verified")]
    AlreadyVerified,
}

/// Accepted submission, or a contract the explorer already knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Guid(String),
    AlreadyVerified,
}

/// Everything the explorer needs to rebuild and compare a contract.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub address: Address,
    /// `source:Name`.
    pub contract_name: String,
    /// `v<solcLongVersion>`.
    pub compiler_version: String,
    /// The standard JSON compiler input.
    pub source: Value,
    /// ABI-encoded constructor arguments.
    pub constructor_args: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: Value,
}

impl ExplorerResponse {
    fn result_text(&self) -> String {
        match &self.result {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Client of an Etherscan-compatible verification API.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    client: reqwest::Client,
    api_url: Url,
    api_key: String,
    chain_id: u64,
    poll_interval: Duration,
    max_polls: usize,
    submit_min_delay: Duration,
}

impl EtherscanClient {
    pub fn new(api_url: &str, api_key: &str, chain_id: u64) -> anyhow::Result<Self> {
        let api_url =
            Url::parse(api_url).with_context(|| format!("Invalid explorer API url: {api_url}"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url,
            api_key: api_key.to_string(),
            chain_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
            submit_min_delay: SUBMIT_MIN_DELAY,
        })
    }

    /// Change how often and how long the verification status is polled.
    pub fn with_polling(mut self, interval: Duration, max_polls: usize) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self.submit_min_delay = interval;
        self
    }

    /// Whether the explorer already has source code for `address`.
    pub async fn is_verified(&self, address: Address) -> Result<bool, VerifyError> {
        let address = address.to_string();
        let response: ExplorerResponse = self
            .client
            .get(self.api_url.clone())
            .query(&[
                ("chainid", self.chain_id.to_string().as_str()),
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", address.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        has_source_code(&response)
    }

    /// Submit source code for verification.
    pub async fn submit(&self, request: &VerificationRequest) -> Result<Submission, VerifyError> {
        let source = serde_json::to_string(&request.source)
            .map_err(|e| VerifyError::InvalidResponse(e.to_string()))?;
        let address = request.address.to_string();
        let constructor_args = hex::encode(&request.constructor_args);

        let response: ExplorerResponse = self
            .client
            .post(self.api_url.clone())
            .query(&[("chainid", self.chain_id.to_string())])
            .form(&[
                ("apikey", self.api_key.as_str()),
                ("module", "contract"),
                ("action", "verifysourcecode"),
                ("contractaddress", address.as_str()),
                ("sourceCode", source.as_str()),
                ("codeformat", CODE_FORMAT),
                ("contractname", request.contract_name.as_str()),
                ("compilerversion", request.compiler_version.as_str()),
                // Etherscan's spelling.
                ("constructorArguements", constructor_args.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        classify_submission(&response)
    }

    /// Query the status of a submission once.
    pub async fn check_status(&self, guid: &str) -> Result<VerificationOutcome, VerifyError> {
        let response: ExplorerResponse = self
            .client
            .get(self.api_url.clone())
            .query(&[
                ("chainid", self.chain_id.to_string().as_str()),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        classify_status(&response)
    }

    /// Verify a contract, waiting for the explorer to finish.
    pub async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, VerifyError> {
        if self.is_verified(request.address).await? {
            return Ok(VerificationOutcome::AlreadyVerified);
        }

        let submission = (|| self.submit(request))
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(self.submit_min_delay)
                    .with_max_times(SUBMIT_MAX_ATTEMPTS),
            )
            .when(|e| matches!(e, VerifyError::NotIndexed(_)))
            .notify(|e, delay| {
                tracing::info!(error = %e, ?delay, "Explorer not ready, retrying submission...");
            })
            .await?;

        let guid = match submission {
            Submission::Guid(guid) => guid,
            Submission::AlreadyVerified => return Ok(VerificationOutcome::AlreadyVerified),
        };

        tracing::info!(
            address = %request.address,
            contract = %request.contract_name,
            guid = %guid,
            "Submitted source code for verification"
        );

        (|| self.check_status(&guid))
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.poll_interval)
                    .with_max_times(self.max_polls),
            )
            .when(|e| matches!(e, VerifyError::Pending))
            .notify(|_, delay| {
                tracing::debug!(?delay, "Verification pending");
            })
            .await
    }
}

/// Verify a recorded deployment of `name` using its compiler input from the artifacts.
pub async fn verify_contract(
    explorer: &EtherscanClient,
    artifacts: &ArtifactStore,
    compilers: &[&str],
    name: &str,
    address: Address,
    constructor_args: &[u8],
) -> anyhow::Result<VerificationOutcome> {
    let artifact = artifacts.artifact(name)?;
    let build = artifacts.build_info(&artifact)?;
    crate::artifacts::check_compiler(&build, compilers);

    let request = VerificationRequest {
        address,
        contract_name: artifact.fully_qualified_name(),
        compiler_version: format!("v{}", build.solc_long_version),
        source: build.input,
        constructor_args: constructor_args.to_vec(),
    };

    let outcome = explorer
        .verify(&request)
        .await
        .with_context(|| format!("Failed to verify {name} at {address}"))?;

    match outcome {
        VerificationOutcome::AlreadyVerified => {
            tracing::info!(contract = name, address = %address, "Already verified!");
        }
        VerificationOutcome::Verified => {
            tracing::info!(contract = name, address = %address, "Successfully verified contract");
        }
    }

    Ok(outcome)
}

fn has_source_code(response: &ExplorerResponse) -> Result<bool, VerifyError> {
    if response.status != "1" {
        return Err(VerifyError::InvalidResponse(format!(
            "{}: {}",
            response.message,
            response.result_text()
        )));
    }

    let source = response
        .result
        .get(0)
        .and_then(|entry| entry.get("SourceCode"))
        .and_then(Value::as_str)
        .ok_or_else(|| VerifyError::InvalidResponse(response.result.to_string()))?;

    Ok(!source.is_empty())
}

fn classify_submission(response: &ExplorerResponse) -> Result<Submission, VerifyError> {
    let text = response.result_text();
    if response.status == "1" {
        return Ok(Submission::Guid(text));
    }

    let lower = text.to_lowercase();
    if lower.contains("already verified") {
        Ok(Submission::AlreadyVerified)
    } else if lower.contains("unable to locate contractcode")
        || lower.contains("does not have bytecode")
    {
        Err(VerifyError::NotIndexed(text))
    } else {
        Err(VerifyError::Rejected(text))
    }
}

fn classify_status(response: &ExplorerResponse) -> Result<VerificationOutcome, VerifyError> {
    let text = response.result_text();
    let lower = text.to_lowercase();

    if lower.contains("already verified") {
        Ok(VerificationOutcome::AlreadyVerified)
    } else if lower.starts_with("pass") {
        Ok(VerificationOutcome::Verified)
    } else if lower.contains("pending") || lower.contains("in queue") {
        Err(VerifyError::Pending)
    } else {
        Err(VerifyError::Rejected(text))
    }
}
