//! lottery is a CLI tool to deploy the VRF-backed Lottery contract.

mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;

use cli::{Cli, Command, DeployArgs, NetworkArgs, VerifyArgs};
use lottery_deploy::{DeploymentStore, EtherscanClient, ProjectConfig, verify};

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env feed both clap and the configuration.
    let dotenv = dotenv::dotenv();

    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    let config = ProjectConfig::load(cli.config.as_deref().map(Path::new))?;

    match cli.command {
        Command::Deploy(args) => deploy(config, args).await,
        Command::Verify(args) => verify_deployment(config, args).await,
        Command::Deployments(args) => list_deployments(&config, args),
        Command::Config => {
            let toml = toml::to_string_pretty(&config.redacted())
                .context("Failed to serialize configuration to TOML")?;
            println!("{toml}");
            Ok(())
        }
    }
}

fn network_name(config: &ProjectConfig, args: NetworkArgs) -> String {
    args.network.unwrap_or_else(|| config.default_network.clone())
}

async fn deploy(config: ProjectConfig, args: DeployArgs) -> Result<()> {
    let network = network_name(&config, args.network);
    lottery_deploy::deploy(config, &network, &args.tags, args.reset).await
}

async fn verify_deployment(config: ProjectConfig, args: VerifyArgs) -> Result<()> {
    let network = network_name(&config, args.network);
    if config.is_development(&network) {
        anyhow::bail!("Network '{network}' is a development network, there is nothing to verify");
    }

    let chain_id = config.network(&network)?.chain_id;
    let api_key = config
        .etherscan
        .api_key()
        .context("No explorer API key configured. Set ETHERSCAN_API_KEY")?;

    let store = DeploymentStore::open(&config.paths.deployments, &network)?;
    let record = store
        .get(&args.contract)
        .with_context(|| format!("No deployment of {} recorded on {}", args.contract, network))?;

    let explorer = EtherscanClient::new(&config.etherscan.api_url, api_key, chain_id)?;
    let artifacts = lottery_deploy::ArtifactStore::new(&config.paths.artifacts);

    tracing::info!(
        network,
        contract = %args.contract,
        address = %record.address,
        "Verifying contract"
    );

    verify::verify_contract(
        &explorer,
        &artifacts,
        &config.compiler_versions(),
        &args.contract,
        record.address,
        &record.constructor_args,
    )
    .await?;

    Ok(())
}

fn list_deployments(config: &ProjectConfig, args: NetworkArgs) -> Result<()> {
    let network = network_name(config, args);
    let store = DeploymentStore::open(&config.paths.deployments, &network)?;

    if store.is_empty() {
        tracing::info!(network, "No deployments recorded");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Contract",
        "Address",
        "Transaction",
        "Block",
        "Gas used",
        "Deployed at",
    ]);
    for (name, record) in store.records() {
        table.add_row(vec![
            name.to_string(),
            record.address.to_string(),
            record.transaction_hash.to_string(),
            record
                .block_number
                .map(|block| block.to_string())
                .unwrap_or_default(),
            record.gas_used.to_string(),
            record.deployed_at.clone(),
        ]);
    }

    println!("{table}");
    Ok(())
}
