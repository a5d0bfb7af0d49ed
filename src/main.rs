/// gkeup - ephemeral GKE clusters
///
/// Creates a Google Kubernetes Engine cluster, waits for it to be ready and
/// deletes it again if anything goes wrong along the way.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gkeup::config::ProvisionConfig;
use gkeup::gke::{list_latest_patch_versions, ClusterManager, ClusterRef, GkeClient, GoogleTokenSource};
use gkeup::utils::context::BuildContext;

#[derive(Parser)]
#[command(name = "gkeup")]
#[command(about = "Provision ephemeral GKE clusters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "cluster.yaml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a cluster and wait until it is ready
    Create {
        /// Override the cluster name from the configuration
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a cluster
    Delete {
        /// Name of the cluster to delete
        #[arg(long)]
        name: String,
    },

    /// Show cluster status
    Status {
        /// Name of the cluster
        #[arg(long)]
        name: String,
    },

    /// List the latest offered patch for each Kubernetes minor version
    Versions,

    /// Generate example configuration file
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gkeup={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Create { ref name } => create_cluster(&cli, name.clone()).await,
        Commands::Delete { ref name } => delete_cluster(&cli, name).await,
        Commands::Status { ref name } => show_status(&cli, name).await,
        Commands::Versions => list_versions(&cli).await,
        Commands::Init => init_config(&cli).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// GKE API client authenticated with the configured credentials
fn gke_client(config: &ProvisionConfig) -> Result<GkeClient> {
    let credentials = config.load_credentials()?;
    let tokens = GoogleTokenSource::new(&credentials)?;
    Ok(GkeClient::new(Arc::new(tokens))?)
}

/// Create a cluster
async fn create_cluster(cli: &Cli, name: Option<String>) -> Result<()> {
    let config = ProvisionConfig::from_file(&cli.config).context("Failed to load configuration")?;
    let credentials = config.load_credentials()?;

    let mut builder = config.builder(credentials)?;
    if let Some(name) = name {
        builder = builder.with_name(name);
    }

    info!("Cluster name: {}", builder.name);

    let ctx = BuildContext::with_timeout(config.timeout());
    let cancel = ctx.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling build");
            cancel.cancel();
        }
    });

    let cluster = match builder.build(&ctx).await {
        Ok(cluster) => cluster,
        Err(e) if e.is_orphan_risk() => {
            return Err(e).context("Cluster may still be running and must be deleted manually");
        }
        Err(e) => return Err(e).context("Failed to build cluster"),
    };

    info!("✓ Cluster created successfully!");
    info!("");
    info!("Cluster: {}", cluster.cluster_ref());
    if let Some(version) = cluster.version() {
        info!("Kubernetes version: {}", version);
    }
    info!("API server: {}", cluster.config().cluster_url);
    info!("");
    info!("Delete it with:");
    info!("  gkeup delete --name {}", cluster.name());

    Ok(())
}

/// Delete a cluster
async fn delete_cluster(cli: &Cli, name: &str) -> Result<()> {
    let config = ProvisionConfig::from_file(&cli.config).context("Failed to load configuration")?;
    let client = gke_client(&config)?;
    let cluster = ClusterRef::new(&config.project, &config.location, name);

    info!("Deleting cluster {}", cluster);
    let operation = client
        .delete_cluster(&cluster)
        .await
        .context(format!("Failed to delete cluster {}", name))?;

    info!("✓ Deletion accepted ({})", operation.name);

    Ok(())
}

/// Show cluster status
async fn show_status(cli: &Cli, name: &str) -> Result<()> {
    let config = ProvisionConfig::from_file(&cli.config).context("Failed to load configuration")?;
    let client = gke_client(&config)?;
    let cluster = ClusterRef::new(&config.project, &config.location, name);

    let snapshot = client
        .get_cluster(&cluster)
        .await
        .context(format!("Failed to get cluster {}", name))?;

    info!("Cluster: {}", cluster);
    info!("  Status: {}", snapshot.status);
    if let Some(message) = snapshot.status_message.as_deref().filter(|m| !m.is_empty()) {
        info!("  Message: {}", message);
    }
    info!(
        "  Version: {}",
        snapshot.current_master_version.as_deref().unwrap_or("N/A")
    );
    info!(
        "  Endpoint: {}",
        snapshot.endpoint.as_deref().unwrap_or("N/A")
    );

    Ok(())
}

/// List offered Kubernetes versions
async fn list_versions(cli: &Cli) -> Result<()> {
    let config = ProvisionConfig::from_file(&cli.config).context("Failed to load configuration")?;
    let client = gke_client(&config)?;

    let catalog = list_latest_patch_versions(&client, &config.project, &config.location)
        .await
        .context("Failed to list Kubernetes versions")?;

    let mut versions: Vec<_> = catalog.into_values().collect();
    versions.sort();

    info!(
        "Kubernetes versions offered in {}/{}:",
        config.project, config.location
    );
    for version in versions.iter().rev() {
        info!("  {} -> {}", version.major_minor(), version);
    }

    Ok(())
}

/// Initialize example configuration file
async fn init_config(cli: &Cli) -> Result<()> {
    if cli.config.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}",
            cli.config.display()
        );
    }

    let example_config = ProvisionConfig::example();
    let yaml = serde_yaml::to_string(&example_config)?;

    tokio::fs::write(&cli.config, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", cli.config.display());
    info!("");
    info!("Next steps:");
    info!("  1. Edit the configuration file to match your project");
    info!("  2. Point at your service account key:");
    info!("     export GOOGLE_APPLICATION_CREDENTIALS=/path/to/key.json");
    info!("  3. Create the cluster:");
    info!("     gkeup create");

    Ok(())
}
