mod manifest;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use teamlink_auth::DeviceTokenProvider;
use teamlink_config::{load as load_config, AppConfig};
use teamlink_graph::GraphClient;
use teamlink_messaging::{write_frame, Dispatcher, HostResponse};
use teamlink_provision::{ChatProvisioner, ChatSpec, RetryPolicy};
use tracing::{error, info};

use crate::manifest::HostManifest;

#[derive(Parser)]
#[command(name = "teamlink-host")]
#[command(about = "Teams chat creation host (native messaging by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve native messaging frames on stdin/stdout (default)
    Run,
    /// Create a single chat from the command line
    Create {
        /// Chat topic
        #[arg(long)]
        name: String,
        /// Owner email address
        #[arg(long)]
        owner: String,
        /// Member email address, repeatable
        #[arg(long = "member")]
        members: Vec<String>,
        /// Issue link to pin in the chat
        #[arg(long)]
        link: Option<String>,
        /// Issue key, used as the pinned link text
        #[arg(long)]
        key: Option<String>,
        /// Issue title, used in the greeting
        #[arg(long)]
        title: Option<String>,
        /// Assignee display name
        #[arg(long)]
        assignee: Option<String>,
        /// Assignee email address
        #[arg(long)]
        assignee_email: Option<String>,
    },
    /// Print the native messaging host manifest
    Manifest {
        /// Extension origin allowed to start the host, repeatable
        #[arg(long = "allowed-origin")]
        allowed_origins: Vec<String>,
        /// Write the manifest to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_host().await,
        Commands::Create {
            name,
            owner,
            members,
            link,
            key,
            title,
            assignee,
            assignee_email,
        } => {
            run_create(ChatSpec {
                name,
                owner_email: owner,
                member_emails: members,
                issue_link: link,
                issue_key: key,
                issue_title: title,
                assignee,
                assignee_email,
            })
            .await
        }
        Commands::Manifest {
            allowed_origins,
            output,
        } => write_manifest(allowed_origins, output),
    }
}

async fn run_host() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging).context("failed to initialise tracing")?;

    info!("starting teamlink host");

    let dispatcher = Dispatcher::new(build_provisioner(&config)?);

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();

    if let Err(loop_error) = teamlink_messaging::run_host_loop(&dispatcher, &mut stdin, &mut stdout).await {
        // The loop only fails when a response could not be written. Try
        // one last error frame so the extension sees a failure rather
        // than a silent disconnect.
        error!(%loop_error, "host loop failed");
        let farewell = HostResponse::failure(format!("Host error: {loop_error}"));
        let _ = write_frame(&mut stdout, &farewell).await;
        anyhow::bail!("host loop failed: {loop_error}");
    }

    info!("teamlink host shut down");
    Ok(())
}

async fn run_create(spec: ChatSpec) -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging).context("failed to initialise tracing")?;

    let provisioner = build_provisioner(&config)?;
    let report = provisioner
        .provision(&spec)
        .await
        .with_context(|| format!("failed to provision chat '{}'", spec.name))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn write_manifest(allowed_origins: Vec<String>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let manifest = HostManifest::for_current_exe(allowed_origins)?;
    let json = manifest.to_json()?;

    match output {
        Some(path) => {
            std::fs::write(&path, format!("{json}\n"))
                .with_context(|| format!("failed to write manifest to {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn build_provisioner(config: &AppConfig) -> anyhow::Result<ChatProvisioner> {
    let tokens = DeviceTokenProvider::new(&config.auth).context("failed to build token provider")?;
    let graph = GraphClient::new(&config.graph).context("failed to build Graph client")?;
    Ok(ChatProvisioner::new(
        Arc::new(tokens),
        graph,
        RetryPolicy::from_config(&config.retry),
    ))
}
