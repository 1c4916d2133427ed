// # vmdnsctl - VM DNS control
//
// The vmdnsctl binary is a THIN integration layer. All discovery, decision
// and retry logic lives in vmdns-core; this file only:
//
// 1. Parses the command line
// 2. Loads credentials (file + environment overrides)
// 3. Initializes tracing and the runtime
// 4. Wires the libvirt host integrations and the DNS provider into the engine
// 5. Maps the outcome to an exit code
//
// ## Usage
//
// ```bash
// vmdnsctl start web1
// vmdnsctl clone web2 --template debian-12
// vmdnsctl --dry-run --log-level debug start web1
// ```
//
// ## Configuration
//
// Credentials are read from the first of `--config <PATH>`,
// `/etc/vmdns/credentials.conf` and `credentials.conf` next to the binary.
// Every key can be overridden by an environment variable of the same name:
//
// - `CF_API_TOKEN`: Cloudflare API token (required)
// - `CF_DOMAIN`: Domain whose zone holds the VM records (required)
// - `CF_EMAIL`: Account email, switches to global API key authentication
// - `CF_ZONE_ID`: Zone ID, skips the zone lookup
// - `VMDNS_MODE=dry-run`: Read everything, change nothing
// - `VMDNS_TEMPLATE`: Default template for `clone`
// - `VMDNS_SWEEP_SUBNET`: Subnet pinged to prime the neighbor cache after a clone
// - `VMDNS_LOG_LEVEL`: Log level when `--log-level` is not given
//
// ## Exit Codes
//
// - 0: The VM is up and its record is converged
// - 1: Any fatal condition (arguments, credentials, zone, discovery, API, guest)
//
// All diagnostics, usage errors included, are written to stdout.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use vmdns_core::engine::{RunReport, Workflow};
use vmdns_core::{ProviderRegistry, SystemResolver, UpsertOutcome, VmDnsEngine, VmId, credentials};
use vmdns_host_libvirt::{IpNeighborTable, SshGuestConfigurator, VirshHypervisor};

/// Environment variable consulted when `--log-level` is absent
const LOG_LEVEL_ENV: &str = "VMDNS_LOG_LEVEL";

/// Exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VmdnsExitCode {
    /// VM up and DNS converged
    Success = 0,
    /// Any fatal condition
    Failure = 1,
}

impl From<VmdnsExitCode> for ExitCode {
    fn from(code: VmdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "vmdnsctl",
    version,
    about = "Start or clone a libvirt VM and publish its IPv4 address in DNS"
)]
struct Cli {
    /// Credential file (KEY=VALUE lines)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Perform every read but change no DNS record and no guest setting
    #[arg(long, global = true)]
    dry_run: bool,

    /// trace, debug, info, warn or error
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start an existing VM (if needed) and publish its address
    Start {
        /// libvirt domain name
        vm: String,
    },
    /// Clone a template into a new VM, publish its address and set its hostname
    Clone {
        /// Name of the new domain
        name: String,
        /// Template domain to clone (default: VMDNS_TEMPLATE)
        #[arg(long, short)]
        template: Option<String>,
    },
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(anyhow!(
            "Log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            other
        )),
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures; usage errors share
            // stdout with the rest of the diagnostics
            let code = if e.use_stderr() {
                VmdnsExitCode::Failure
            } else {
                VmdnsExitCode::Success
            };
            print!("{}", e);
            return code.into();
        }
    };

    let level_name = cli
        .log_level
        .clone()
        .or_else(|| std::env::var(LOG_LEVEL_ENV).ok())
        .unwrap_or_else(|| "info".to_string());
    let log_level = match parse_level(&level_name) {
        Ok(level) => level,
        Err(e) => {
            println!("Configuration error: {}", e);
            return VmdnsExitCode::Failure.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        println!("Failed to set tracing subscriber: {}", e);
        return VmdnsExitCode::Failure.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return VmdnsExitCode::Failure.into();
        }
    };

    let code = rt.block_on(async {
        match run(cli).await {
            Ok(report) => {
                summarize(&report);
                VmdnsExitCode::Success
            }
            Err(e) => {
                error!("{:#}", e);
                VmdnsExitCode::Failure
            }
        }
    });

    code.into()
}

/// Resolve the requested workflow; `clone` falls back to the configured template
fn workflow_for(command: Command, default_template: Option<&str>) -> Result<(VmId, Workflow)> {
    match command {
        Command::Start { vm } => Ok((VmId::new(vm)?, Workflow::Start)),
        Command::Clone { name, template } => {
            let template = template
                .or_else(|| default_template.map(str::to_string))
                .ok_or_else(|| {
                    anyhow!(
                        "No template given. Pass --template or set {}",
                        credentials::keys::TEMPLATE
                    )
                })?;
            Ok((VmId::new(name)?, Workflow::Clone { template }))
        }
    }
}

async fn run(cli: Cli) -> Result<RunReport> {
    let (mut config, path) =
        credentials::load(cli.config.as_deref(), |key| std::env::var(key).ok())?;
    match path {
        Some(path) => info!("Loaded credentials from {}", path.display()),
        None => info!("Loaded configuration from the environment"),
    }

    if cli.dry_run {
        config.engine.dry_run = true;
    }
    if config.engine.dry_run {
        warn!("DRY-RUN mode: no DNS record or guest setting will be changed");
    }

    let (vm, workflow) = workflow_for(cli.command, config.host.default_template.as_deref())?;

    let registry = ProviderRegistry::new();
    #[cfg(feature = "cloudflare")]
    vmdns_provider_cloudflare::register(&registry);
    let provider = registry.create_provider(&config.provider)?;
    info!(
        "Managing {} in {} via {}",
        vm,
        config.provider.domain(),
        provider.provider_name()
    );

    let hypervisor = Arc::new(VirshHypervisor::new(config.host.libvirt_uri.clone()));
    let neighbors = Arc::new(IpNeighborTable::new());
    let guest = SshGuestConfigurator::new(
        config.host.ssh_user.clone(),
        config.host.ssh_identity.clone(),
    );

    let engine = VmDnsEngine::new(
        hypervisor,
        neighbors,
        provider,
        Box::new(SystemResolver),
        Box::new(guest),
        config,
    )?;

    Ok(engine.run(&vm, &workflow).await?)
}

fn summarize(report: &RunReport) {
    let action = match &report.reconciliation.outcome {
        UpsertOutcome::Skipped => "already up to date",
        UpsertOutcome::Created { .. } => "created",
        UpsertOutcome::Updated { .. } => "updated",
        UpsertOutcome::DryRun => "would change (dry-run)",
    };
    info!("{} -> {}: {}", report.fqdn, report.address, action);
    if report.hostname_set {
        info!("{} is rebooting with its new hostname", report.vm);
    }
}
