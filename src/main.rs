use clap::{Parser, Subcommand};
use flowsteer::config::{self, Config};
use flowsteer::control::{ControlChannel, StaticHosts, StaticTopology};
use flowsteer::steering::{Orchestrator, RuleInstaller, SteeringPlan, SteeringRequest};
use flowsteer::telemetry::{init_logging, MetricsRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "flowsteer")]
#[command(about = "Steer a UDP flow through a filtering middlebox on an OpenFlow network")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and print the steering rules without touching any switch
    Plan {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Wait for the switches to connect and install the steering rules
    Steer {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Run the middlebox filter on an interface
    Middlebox {
        /// UDP port the middlebox inspects (the server's port)
        middlebox_port: u16,
        /// Interface of the middlebox host, e.g. h3-eth0
        iface_name: String,
        /// Comma-separated keyword file
        #[arg(long, alias = "blacklist", default_value = "blacklist.txt")]
        denylist: PathBuf,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate config.toml
    Validate {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Plan { config } => cmd_plan(&config),
        Commands::Steer { config } => cmd_steer(&config),
        Commands::Middlebox {
            middlebox_port,
            iface_name,
            denylist,
        } => cmd_middlebox(middlebox_port, &iface_name, &denylist),
        Commands::Config {
            action: ConfigAction::Validate { config },
        } => cmd_config_validate(&config),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

/// Loads, validates and applies the logging section.
fn load_config(path: &Path) -> Result<Config, String> {
    let config = config::load(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    init_logging(Some(&config.logging));

    let result = config::validate(&config);
    result.print_diagnostics();
    if result.has_errors() {
        return Err(format!(
            "{}: {} validation error(s)",
            path.display(),
            result.errors.len()
        ));
    }

    Ok(config)
}

fn steering_request(config: &Config) -> Result<SteeringRequest, String> {
    config
        .steering
        .as_ref()
        .map(|s| s.request())
        .ok_or_else(|| "config has no [steering] section".to_string())
}

fn build_plan(config: &Config) -> Result<SteeringPlan, String> {
    let request = steering_request(config)?;
    let topology = StaticTopology::from_config(config);
    let hosts = StaticHosts::from_config(config).map_err(|e| e.to_string())?;

    Orchestrator::new(&topology, &hosts)
        .with_host_ports(config.controller.host_port_policy())
        .plan(&request)
        .map_err(|e| e.to_string())
}

fn print_plan(plan: &SteeringPlan) {
    println!("client    s{} {} {}", plan.client.dpid, plan.client.mac, plan.client.ip);
    println!(
        "middlebox s{} {} {}",
        plan.middlebox.dpid, plan.middlebox.mac, plan.middlebox.ip
    );
    println!("server    s{} {} {}", plan.server.dpid, plan.server.mac, plan.server.ip);
    println!();
    println!("client -> middlebox: {}", plan.to_middlebox);
    println!("middlebox -> server: {}", plan.to_server);
    println!("client -> server:    {} (direct)", plan.direct);
    if !plan.uncovered.is_empty() {
        let uncovered: Vec<String> = plan.uncovered.iter().map(|d| format!("s{}", d)).collect();
        println!("not on the detour:   {}", uncovered.join(", "));
    }
    println!();
    for planned in &plan.rules {
        println!("[{}] s{}: {}", planned.segment, planned.dpid, planned.rule);
    }
}

fn cmd_plan(config_path: &Path) -> Result<(), String> {
    let config = load_config(config_path)?;
    let plan = build_plan(&config)?;
    print_plan(&plan);
    Ok(())
}

fn cmd_steer(config_path: &Path) -> Result<(), String> {
    let config = load_config(config_path)?;

    // Every resolver failure surfaces here, before any switch is contacted.
    let plan = build_plan(&config)?;
    print_plan(&plan);

    let mut channel = ControlChannel::bind(&config.controller.listen).map_err(|e| {
        format!(
            "Failed to listen on {}: {}",
            config.controller.listen, e
        )
    })?;
    let switches = plan.switches();
    info!(
        "Waiting up to {}s for switches {:?}",
        config.controller.connect_timeout_secs, switches
    );
    channel
        .wait_for(&switches, config.controller.connect_timeout())
        .map_err(|e| e.to_string())?;

    let metrics = Arc::new(MetricsRegistry::new());
    let installer =
        RuleInstaller::new(config.controller.install_mode).with_metrics(metrics.clone());
    let report = installer
        .install(&mut channel, &plan)
        .map_err(|e| e.to_string())?;

    println!(
        "Installed {} rules on {} switches",
        report.installed,
        switches.len()
    );
    metrics.log_summary();
    Ok(())
}

fn cmd_middlebox(port: u16, iface_name: &str, denylist_path: &Path) -> Result<(), String> {
    use flowsteer::capture::AfPacketSocket;
    use flowsteer::middlebox::{Denylist, MiddleboxFilter, MiddleboxListener};
    use tokio_util::sync::CancellationToken;
    use tracing::warn;

    init_logging(None);

    let denylist = Denylist::load(denylist_path);
    let filter = MiddleboxFilter::new(port, denylist);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to create runtime: {}", e))?;

    rt.block_on(async move {
        let socket = AfPacketSocket::bind(iface_name)
            .map_err(|e| format!("Failed to open {}: {}", iface_name, e))?;
        info!("Opened {} (ifindex {})", socket.name(), socket.ifindex());

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => on_interrupt.cancel(),
                Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
            }
        });

        let mut listener = MiddleboxListener::new(socket, filter);
        listener.run(cancel).await.map_err(|e| e.to_string())
    })
}

fn cmd_config_validate(config_path: &Path) -> Result<(), String> {
    init_logging(None);
    info!("Validating {}...", config_path.display());

    let config = config::load(config_path).map_err(|e| e.to_string())?;
    let result = config::validate(&config);
    result.print_diagnostics();

    if result.has_errors() {
        return Err(format!("{} error(s) found", result.errors.len()));
    }

    println!(
        "Configuration is valid ({} links, {} hosts)",
        config.links.len(),
        config.hosts.len()
    );
    Ok(())
}
