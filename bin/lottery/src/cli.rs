use clap::{Args, Parser, Subcommand};
use lottery_deploy::Tag;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "lottery")]
#[command(
    author,
    version,
    about = "Deploy the VRF-backed Lottery contract and its local mocks"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(
        short,
        long,
        global = true,
        env = "LOTTERY_VERBOSITY",
        default_value_t = LevelFilter::INFO
    )]
    pub verbosity: LevelFilter,

    /// Path to the project configuration file.
    ///
    /// If not provided, `lottery.toml` in the current directory is used when present.
    #[arg(long, alias = "conf", global = true, env = "LOTTERY_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the deploy scripts against a network.
    Deploy(DeployArgs),
    /// Submit the source of a recorded deployment to the block explorer.
    Verify(VerifyArgs),
    /// List the recorded deployments of a network.
    Deployments(NetworkArgs),
    /// Print the resolved configuration, secrets redacted.
    Config,
}

#[derive(Debug, Clone, Args)]
pub struct NetworkArgs {
    /// The network to use. Defaults to the configured `default_network`.
    #[arg(short, long, env = "LOTTERY_NETWORK")]
    pub network: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    #[clap(flatten)]
    pub network: NetworkArgs,

    /// Only run scripts carrying one of these tags.
    #[arg(long, value_delimiter = ',', default_value = "all")]
    pub tags: Vec<Tag>,

    /// Discard deployment records of the network before deploying.
    #[arg(long)]
    pub reset: bool,
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    #[clap(flatten)]
    pub network: NetworkArgs,

    /// The contract to verify.
    #[arg(default_value = lottery_deploy::contracts::LOTTERY)]
    pub contract: String,
}
