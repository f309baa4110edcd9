mod checklist;
mod console;
mod report;
mod task;

use anyhow::{Context, Result};
use checklist::{handle_checklist_command, handle_comment_command, ChecklistCommand, CommentCommand};
use clap::{Parser, Subcommand};
use console::{StderrNotifier, StdinConfirmer};
use report::{handle_category_command, handle_cost_command, CategoryCommand, CostCommand};
use site_client::{
    ClientConfig, ConfigOverrides, Confirmer, FixedConfirmer, QueryCache, RestClient, Session,
};
use site_core::EntityId;
use std::io;
use std::sync::Arc;
use task::{handle_task_command, TaskCommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "site")]
#[command(about = "Construction site operations CLI", long_about = None)]
struct Cli {
    /// Base URL of the site API.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Project to scope listings and new tasks to.
    #[arg(long, global = true)]
    project: Option<EntityId>,
    /// Answer yes to every confirmation.
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },
    /// Checklist board for a task
    Checklist {
        #[command(subcommand)]
        action: ChecklistCommand,
    },
    /// Comment threads on checklist items
    Comment {
        #[command(subcommand)]
        action: CommentCommand,
    },
    /// Category names and colors
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Labor and material cost roll-ups
    Cost {
        #[command(subcommand)]
        action: CostCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = ClientConfig::load(&ConfigOverrides {
        api_url: cli.api_url,
        timeout_secs: cli.timeout_secs,
        project: cli.project,
    })
    .context("Failed to load configuration")?;
    debug!(event = "cli_config", api_url = %config.base_url, timeout = ?config.request_timeout);

    let confirmer: Arc<dyn Confirmer> = if cli.yes {
        Arc::new(FixedConfirmer(true))
    } else {
        Arc::new(StdinConfirmer)
    };
    let session = Session::new(
        Arc::new(RestClient::from_config(&config)),
        Arc::new(QueryCache::new()),
        Arc::new(StderrNotifier),
        confirmer,
    );
    let project = config.default_project;

    match cli.command {
        Commands::Task { action } => handle_task_command(&session, project, action).await,
        Commands::Checklist { action } => handle_checklist_command(&session, action).await,
        Commands::Comment { action } => handle_comment_command(&session, action).await,
        Commands::Category { action } => handle_category_command(&session, project, action).await,
        Commands::Cost { action } => handle_cost_command(&session, project, action).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(std::env::var("SITE_LOG_LEVEL").unwrap_or_else(|_| "warn".into()))
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
