use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use phasegate_core::{Manifest, Revision};
use phasegate_kubehub::KubeBackend;
use phasegate_validate::{validate_revision, ObjectValidator, PhaseValidator, ValidatorConfig};
use serde::de::DeserializeOwned;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "phasegatectl", version, about = "Validate rollout revisions before they are applied")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Static preflight of a whole revision (no cluster access)
    Revision {
        /// Revision document (YAML): name, revision, phases[].objects[]
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
    /// Dry-run validation of one phase against the current kube context
    Phase {
        /// Revision document (YAML)
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
        /// Phase name within the revision
        #[arg(long = "phase")]
        phase: String,
        /// Owner object (YAML); its namespace bounds the phase unless escalation is allowed
        #[arg(long = "owner")]
        owner: PathBuf,
        /// Allow objects outside the owner's namespace (overrides PHASEGATE_ALLOW_NS_ESCALATION)
        #[arg(long = "allow-ns-escalation")]
        allow_ns_escalation: bool,
    },
}

fn init_tracing() {
    let env = std::env::var("PHASEGATE_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("PHASEGATE_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid PHASEGATE_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

enum Verdict { Valid, Invalid }

/// Prints the outcome; `found` carries the human report and its serializable form.
fn print_verdict<R: serde::Serialize>(output: Output, found: Option<(String, R)>) -> Result<Verdict> {
    let Some((human, report)) = found else {
        match output {
            Output::Human => println!("valid"),
            Output::Json => println!("{}", serde_json::json!({ "valid": true })),
        }
        return Ok(Verdict::Valid);
    };
    match output {
        Output::Human => print!("{human}"),
        Output::Json => println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "valid": false, "report": report }))?),
    }
    Ok(Verdict::Invalid)
}

async fn run(cli: Cli) -> Result<Verdict> {
    match cli.command {
        Commands::Revision { file } => {
            let rev: Revision = load_yaml(&file)?;
            info!(revision = %rev.name, number = rev.revision, phases = rev.phases.len(), "revision preflight");
            let found = validate_revision(&rev).map(|e| (e.report(), e.to_report()));
            print_verdict(cli.output, found)
        }
        Commands::Phase { file, phase, owner, allow_ns_escalation } => {
            let rev: Revision = load_yaml(&file)?;
            let owner: Manifest = load_yaml(&owner)?;
            let phase = rev
                .phases
                .iter()
                .find(|p| p.name == phase)
                .ok_or_else(|| anyhow!("phase {:?} not found in revision {:?}", phase, rev.name))?;

            let mut cfg = ValidatorConfig::from_env();
            if allow_ns_escalation {
                cfg = cfg.with_namespace_escalation(true);
            }
            let backend = Arc::new(KubeBackend::connect().await?);
            let validator = PhaseValidator::new(ObjectValidator::new(backend.clone(), backend, &cfg));

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received; cancelling validation");
                    on_signal.cancel();
                }
            });

            info!(phase = %phase.name, objects = phase.objects.len(), owner_ns = owner.namespace(), "phase validation");
            let found = validator.validate(&cancel, &owner, phase).await?.map(|e| (e.report(), e.to_report()));
            print_verdict(cli.output, found)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(Verdict::Valid) => ExitCode::SUCCESS,
        Ok(Verdict::Invalid) => ExitCode::from(1),
        Err(e) => {
            error!(error = ?e, "validation could not complete");
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
