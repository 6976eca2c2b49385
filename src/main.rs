use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use replication_harness::ClusterObserver;
use replication_harness::ContainerRuntime;
use replication_harness::DatabaseIdentity;
use replication_harness::DockerCli;
use replication_harness::Error;
use replication_harness::FailureAction;
use replication_harness::HarnessConfig;
use replication_harness::ProcessRunner;
use replication_harness::RecoveryAction;
use replication_harness::Result;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

const LOG_FILE_NAME: &str = "replication-harness.log";

/// Observe and perturb the leader of a replicated database running under docker compose
#[derive(Parser, Debug)]
#[command(name = "replication-harness", version)]
struct Cli {
    /// Hex identity of the database under test
    #[arg(long, global = true)]
    database: Option<String>,

    /// Extra TOML configuration applied over `CONFIG_PATH` and defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to `<dir>/replication-harness.log` instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current leader
    Leader,
    /// Print every replica of the database
    Replicas,
    /// Wait until the leader moves off `--previous` (or until any leader exists)
    WaitLeader {
        #[arg(long)]
        previous: Option<u64>,
        #[arg(long)]
        attempts: Option<usize>,
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Kill or disconnect the leader's container
    FailLeader {
        #[arg(long, default_value = "kill")]
        action: String,
    },
    /// Start or reconnect a container
    Restore {
        #[arg(long)]
        container: String,
        #[arg(long, default_value = "start")]
        action: String,
    },
    /// Write row `--id` through the leader and read it back
    Health {
        #[arg(long)]
        id: u64,
    },
    /// Kill every follower container
    FailFollowers,
    /// Promote the CLI login to control-database admin
    AddAdmin,
    /// Move leadership to a replica
    PreferLeader {
        #[arg(long)]
        replica: u64,
    },
    /// Ping the leader's HTTP endpoint
    Ping,
    /// Mint a root token in the control container
    RootToken,
    /// Restart compose services
    Restart {
        #[arg(required = true)]
        services: Vec<String>,
    },
    /// Print `docker inspect` output for a container
    Inspect { container: String },
    /// docker compose up -d
    Up,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initializing Logs
    let _guard = init_observability(cli.log_dir.as_deref())?;

    let config = load_config(cli.config.as_deref())?;

    tokio::select! {
        result = run(cli.command, cli.database, config) => {
            if let Err(e) = &result {
                error!("command failed: {}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<HarnessConfig> {
    let config = HarnessConfig::new()?;
    let config = match path {
        Some(path) => config.with_override_config(&path.to_string_lossy())?,
        None => config,
    };
    config.validate()
}

async fn run(
    command: Command,
    database: Option<String>,
    config: HarnessConfig,
) -> Result<()> {
    // Commands that only touch the compose project
    match &command {
        Command::Up => {
            return docker(&config).compose_up().await;
        }
        Command::RootToken => {
            println!("{}", docker(&config).generate_root_token().await?);
            return Ok(());
        }
        Command::Restart { services } => {
            return docker(&config).compose_restart(services.clone()).await;
        }
        Command::Inspect { container } => {
            let details = docker(&config).inspect_container(container).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
            return Ok(());
        }
        _ => {}
    }

    let identity = database
        .as_deref()
        .ok_or_else(|| Error::Fatal("--database is required for this command".to_string()))
        .and_then(DatabaseIdentity::parse)?;
    let observer = ClusterObserver::from_config(identity, &config)?;

    match command {
        Command::Leader => {
            let leader = observer.get_leader_info().await?;
            println!("{}", serde_json::to_string_pretty(&leader)?);
        }
        Command::Replicas => {
            let replicas = observer.get_all_replicas().await?;
            println!("{}", serde_json::to_string_pretty(&replicas)?);
        }
        Command::WaitLeader {
            previous,
            attempts,
            delay_ms,
        } => {
            let attempts = attempts.unwrap_or(config.retry.leader_change.max_retries);
            let delay = delay_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| config.retry.leader_change.delay());
            match observer.wait_for_leader_change(previous, attempts, delay).await? {
                Some(node_id) => println!("{node_id}"),
                None => return Err(Error::Fatal(format!("no leader change after {attempts} polls"))),
            }
        }
        Command::FailLeader { action } => {
            let action: FailureAction = action.parse()?;
            println!("{}", observer.fail_leader(action).await?);
        }
        Command::Restore { container, action } => {
            let action: RecoveryAction = action.parse()?;
            observer.restore_leader(&container, action).await?;
        }
        Command::Health { id } => {
            observer.ensure_leader_health(id).await?;
            info!("Leader committed row {}", id);
        }
        Command::FailFollowers => {
            for id in observer.fail_followers().await? {
                println!("{id}");
            }
        }
        Command::AddAdmin => {
            println!("0x{}", observer.add_admin().await?);
        }
        Command::PreferLeader { replica } => {
            observer.prefer_leader(replica).await?;
        }
        Command::Ping => {
            observer.ping_leader().await?;
        }
        Command::Up | Command::RootToken | Command::Restart { .. } | Command::Inspect { .. } => {}
    }

    Ok(())
}

fn docker(config: &HarnessConfig) -> DockerCli {
    DockerCli::new(Arc::new(ProcessRunner), &config.docker, &config.control_plane)
}

pub fn init_observability(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_dir) = log_dir else {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter);
        tracing_subscriber::registry().with(stderr_layer).init();
        return Ok(None);
    };

    std::fs::create_dir_all(log_dir)
        .map_err(|e| Error::Fatal(format!("cannot create log dir {}: {e}", log_dir.display())))?;
    let log_file = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter);
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(Some(guard))
}
