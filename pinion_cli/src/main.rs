use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;
use directories::ProjectDirs;
use pinion_core::{ContentId, PinQuery, PinStatus};
use pinion_node::config::NodeConfig;
use pinion_node::{admin, build_deps, run_node};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the node config file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node and run all workers on their schedules
    Start,
    /// Trigger a single worker run now
    Run {
        #[command(subcommand)]
        cmd: RunCmd,
    },
    /// Single-pin administration
    Pin {
        #[command(subcommand)]
        cmd: PinCmd,
    },
    /// Show repository usage and pin counts
    Status,
}

#[derive(Subcommand)]
enum RunCmd {
    Discovery,
    Validation,
    Migration,
    Cleanup,
}

#[derive(Subcommand)]
enum PinCmd {
    /// Pin an identifier locally and start tracking it
    Add { id: String },
    /// Unpin an identifier and stop tracking it
    Rm { id: String },
    /// Migrate one identifier right now, skipping the age gate
    Migrate { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.tracing_level_filter())
        .init();

    let config = load_config(cli.config)?;

    match cli.cmd {
        Commands::Start => run_node(config).await,
        Commands::Run { cmd } => {
            let deps = build_deps(&config)?;
            match cmd {
                RunCmd::Discovery => println!("{:?}", admin::run_discovery(&deps).await?),
                RunCmd::Validation => println!("{:?}", admin::run_validation(&deps).await?),
                RunCmd::Migration => println!(
                    "{:?}",
                    admin::run_migration(&deps, config.migration.clone()).await?
                ),
                RunCmd::Cleanup => println!(
                    "{:?}",
                    admin::run_cleanup(&deps, config.cleanup.clone()).await?
                ),
            }
            Ok(())
        }
        Commands::Pin { cmd } => {
            let deps = build_deps(&config)?;
            match cmd {
                PinCmd::Add { id } => {
                    let id: ContentId = id.parse()?;
                    if admin::pin_add(&deps, &id).await? {
                        println!("now tracking {id}");
                    } else {
                        println!("{id} was already tracked");
                    }
                }
                PinCmd::Rm { id } => {
                    let id: ContentId = id.parse()?;
                    admin::pin_remove(&deps, &id).await?;
                    println!("stopped tracking {id}");
                }
                PinCmd::Migrate { id } => {
                    let id: ContentId = id.parse()?;
                    admin::force_migrate(&deps, config.migration.clone(), &id).await?;
                    println!("migrated {id}");
                }
            }
            Ok(())
        }
        Commands::Status => status(&config).await,
    }
}

fn load_config(path: Option<PathBuf>) -> Result<NodeConfig> {
    let path = match path {
        Some(path) => path,
        None => ProjectDirs::from("cache", "pinion", "pinion")
            .context("could not determine the config directory")?
            .config_dir()
            .join("config.toml"),
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
}

async fn status(config: &NodeConfig) -> Result<()> {
    let deps = build_deps(config)?;

    if deps.daemon.is_running().await? {
        let stat = deps.daemon.repo_stat().await?;
        println!(
            "repo: {} of {} bytes used",
            stat.used_bytes, stat.capacity_bytes
        );
    } else {
        println!("storage daemon is not reachable");
    }

    let pending = deps
        .registry
        .count(&PinQuery::default().with_status(PinStatus::Pending))
        .await?;
    let accepted = deps
        .registry
        .count(
            &PinQuery::default()
                .with_status(PinStatus::Accepted)
                .with_migrated(false),
        )
        .await?;
    let migrated = deps
        .registry
        .count(&PinQuery::default().with_migrated(true))
        .await?;
    let unpinned = deps
        .registry
        .count(&PinQuery::default().with_unpinned(true))
        .await?;
    println!("pins: {pending} pending, {accepted} awaiting migration, {migrated} migrated ({unpinned} released locally)");
    Ok(())
}
