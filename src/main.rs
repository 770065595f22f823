use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use carbon_placement::api::event_dto::EventDto;
use carbon_placement::config::OptimizerConfig;
use carbon_placement::domain::clock::clock::{SharedClock, UtcClock};
use carbon_placement::domain::data_access::data_access_facade::DataAccessFacade;
use carbon_placement::domain::migrator::redeploy::{LocalRedeployer, RedeployCollaborator, RemoteRedeployer};
use carbon_placement::domain::store::remote_table::DirectoryTableStore;
use carbon_placement::handler::{self, HandlerContext, MANAGE_DEPLOYMENTS, RUN_DEPLOYMENT_MIGRATOR};
use carbon_placement::logger;

#[derive(Parser)]
#[command(name = "carbon-placement")]
#[command(author, version, about = "Carbon-aware placement of serverless workflows", long_about = None)]
struct Cli {
    /// Directory holding one JSON file per table
    #[arg(long, default_value = "tables")]
    tables_dir: String,

    /// Optimizer configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<String>,

    /// Deploy service receiving redeploy requests; staging is promoted locally when omitted
    #[arg(long)]
    redeploy_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check workflows and re-solve those whose budget allows it
    ManageDeployments {
        /// Only check this workflow
        #[arg(long)]
        workflow_id: Option<String>,
    },
    /// Hand pending staging records to the redeploy collaborator
    RunDeploymentMigrator,
    /// Handle a raw JSON event, e.g. '{"action": "manage_deployments"}'
    Event { json: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => OptimizerConfig::from_file(path).with_context(|| format!("loading optimizer config '{}'", path))?,
        None => OptimizerConfig::default(),
    };
    config.validate()?;

    let store = DirectoryTableStore::new(&cli.tables_dir).with_context(|| format!("opening tables under '{}'", cli.tables_dir))?;
    let facade = DataAccessFacade::new(Arc::new(store));
    let clock = SharedClock(Arc::new(UtcClock));

    let collaborator: Arc<dyn RedeployCollaborator> = match &cli.redeploy_endpoint {
        Some(endpoint) => Arc::new(RemoteRedeployer::new(endpoint.clone())?),
        None => Arc::new(LocalRedeployer::new(facade.clone(), clock.clone())),
    };
    let ctx = HandlerContext { facade, config, clock, collaborator };

    let response = match cli.command {
        Commands::ManageDeployments { workflow_id } => handler::handle(&EventDto { action: MANAGE_DEPLOYMENTS.to_string(), workflow_id }, &ctx).await,
        Commands::RunDeploymentMigrator => handler::handle(&EventDto { action: RUN_DEPLOYMENT_MIGRATOR.to_string(), workflow_id: None }, &ctx).await,
        Commands::Event { json } => handler::handle_json(&json, &ctx).await,
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    if response.status != 200 {
        anyhow::bail!("request failed with status {}", response.status);
    }
    Ok(())
}
