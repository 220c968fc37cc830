//! fleetd — the fleetgrid daemon and operator CLI.
//!
//! Single binary for both the long-running orchestrator (`fleetd run`)
//! and one-shot fleet operations against the same system root:
//!
//! ```text
//! fleetd run --root /srv/fleet
//! fleetd start-all
//! fleetd start lobby
//! fleetd stop lobby-2
//! fleetd status
//! fleetd template add lobby --max-ram-mb 1024 --max-players 20 --server-min 2 --server-max 4
//! fleetd console lobby-1
//! ```

mod daemon;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use fleet_core::TemplateSpec;
use fleetgrid_launcher::{Decommissioner, Provisioner};
use fleetgrid_process::{ProcessController, ScreenController};
use fleetgrid_registry::LivenessRegistry;
use fleetgrid_status::StatusAggregator;
use fleetgrid_workspace::{FleetPaths, TemplateStore};

#[derive(Parser)]
#[command(name = "fleetd", about = "fleetgrid orchestrator daemon")]
struct Cli {
    /// System root holding templates, instances and config.
    #[arg(long, global = true, default_value = "system")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon (renewal loop + local HTTP API).
    Run,

    /// Bring every template up to its configured minimum.
    StartAll,

    /// Launch one additional instance of a template.
    Start { template: String },

    /// Stop every instance and wipe the instance area.
    StopAll,

    /// Stop one instance.
    Stop { name: String },

    /// Print the status of every instance.
    Status,

    /// Manage templates.
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Attach to a running instance's console.
    Console { name: String },
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// Create or overwrite a template spec.
    Add {
        name: String,
        /// Fixed worker heap size in megabytes.
        #[arg(long)]
        max_ram_mb: i32,
        /// Player capacity per instance.
        #[arg(long)]
        max_players: i32,
        /// Minimum instances to keep running.
        #[arg(long)]
        server_min: i32,
        /// Scale-up cap; 0 disables demand scaling.
        #[arg(long, default_value = "0")]
        server_max: i32,
        /// Optional display name stored in the spec.
        #[arg(long)]
        display_name: Option<String>,
    },

    /// List templates with their specs.
    List,

    /// Delete a template and its payload. Running instances are untouched.
    Remove { name: String },
}

/// Everything the commands need, assembled once from the system root.
struct Orchestrator {
    paths: FleetPaths,
    store: TemplateStore,
    registry: LivenessRegistry,
    process: Arc<dyn ProcessController>,
    provisioner: Provisioner,
    decommissioner: Decommissioner,
    aggregator: StatusAggregator,
}

impl Orchestrator {
    fn new(root: PathBuf, base_port: u16) -> Self {
        let paths = FleetPaths::new(root);
        let store = TemplateStore::new(paths.clone());
        let registry = LivenessRegistry::new();
        let process: Arc<dyn ProcessController> = Arc::new(ScreenController::new());
        let provisioner = Provisioner::new(
            paths.clone(),
            store.clone(),
            process.clone(),
            registry.clone(),
        )
        .with_base_port(base_port);
        let decommissioner =
            Decommissioner::new(paths.clone(), process.clone(), registry.clone());
        let aggregator = StatusAggregator::new(paths.clone(), store.clone(), registry.clone());
        Self {
            paths,
            store,
            registry,
            process,
            provisioner,
            decommissioner,
            aggregator,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetd=debug,fleetgrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run => daemon::run(cli.root).await,
        Command::StartAll => {
            let orch = orchestrator_for(cli.root);
            let launched = orch.provisioner.start_all()?;
            info!(launched, "cold start complete");
            Ok(())
        }
        Command::Start { template } => {
            let orch = orchestrator_for(cli.root);
            let name = orch.provisioner.start_template_server(&template)?;
            info!(instance = %name, "instance started");
            Ok(())
        }
        Command::StopAll => {
            let orch = orchestrator_for(cli.root);
            let stopped = orch.decommissioner.stop_all().await?;
            info!(stopped, "all instances stopped");
            Ok(())
        }
        Command::Stop { name } => {
            let orch = orchestrator_for(cli.root);
            if orch.decommissioner.stop(&name).await? {
                info!(instance = %name, "instance stopped");
            } else {
                anyhow::bail!("no such instance: {name}");
            }
            Ok(())
        }
        Command::Status => {
            let orch = orchestrator_for(cli.root);
            print_statuses(&orch)?;
            Ok(())
        }
        Command::Template(cmd) => {
            let orch = orchestrator_for(cli.root);
            run_template_command(&orch, cmd)
        }
        Command::Console { name } => {
            let orch = orchestrator_for(cli.root);
            if !orch.process.list().contains(&name) {
                anyhow::bail!("no running session for: {name}");
            }
            orch.process.attach(&name);
            Ok(())
        }
    }
}

/// One-shot commands read the config only for the base port; the rest of
/// the config concerns the daemon.
fn orchestrator_for(root: PathBuf) -> Orchestrator {
    let config = fleet_core::DaemonConfig::load_from(&root.join("config.yml"));
    Orchestrator::new(root, config.base_port)
}

fn print_statuses(orch: &Orchestrator) -> anyhow::Result<()> {
    let statuses = orch.aggregator.list_statuses()?;
    if statuses.is_empty() {
        println!("no instances");
        return Ok(());
    }
    println!(
        "{:<20} {:<16} {:<7} {:<8} {:<9}",
        "NAME", "TEMPLATE", "PORT", "ONLINE", "PLAYERS"
    );
    for s in statuses {
        let port = s.port.map_or_else(|| "-".to_string(), |p| p.to_string());
        println!(
            "{:<20} {:<16} {:<7} {:<8} {}/{}",
            s.name, s.template, port, s.online, s.current_players, s.max_players
        );
    }
    Ok(())
}

fn run_template_command(orch: &Orchestrator, cmd: TemplateCommand) -> anyhow::Result<()> {
    match cmd {
        TemplateCommand::Add {
            name,
            max_ram_mb,
            max_players,
            server_min,
            server_max,
            display_name,
        } => {
            if max_ram_mb <= 0 {
                anyhow::bail!("--max-ram-mb must be positive");
            }
            let spec = TemplateSpec {
                name: display_name,
                max_ram_mb,
                max_players,
                server_min,
                server_max,
            };
            orch.store.save(&name, &spec)?;
            info!(template = %name, "template saved");
            Ok(())
        }
        TemplateCommand::List => {
            for name in orch.paths.list_templates()? {
                match orch.store.load(&name) {
                    Ok(spec) => println!(
                        "{:<16} ram={}M players={} min={} max={}",
                        name, spec.max_ram_mb, spec.max_players, spec.server_min, spec.server_max
                    ),
                    Err(e) => println!("{name:<16} (unreadable: {e})"),
                }
            }
            Ok(())
        }
        TemplateCommand::Remove { name } => {
            if !orch.paths.template_exists(&name) {
                anyhow::bail!("no such template: {name}");
            }
            orch.paths.delete_template(&name)?;
            info!(template = %name, "template removed");
            Ok(())
        }
    }
}
