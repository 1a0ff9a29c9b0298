//! grace - graceful termination checker
//!
//! Stops each container and reports how it terminated.
//!
//! ## Usage
//!
//! ```sh
//! grace web                         # Docker container (default platform)
//! grace docker/web docker/db        # several containers, in order
//! grace -n shop pod/api-7c9d        # every container of a pod
//! ```
//!
//! Exit status is non-zero if any target failed or the run was interrupted.

use clap::{Parser, ValueEnum};
use grace::{FailurePolicy, ProbeSettings, Target, constants, report, runner};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// Validates if containerized applications terminate gracefully.
#[derive(Parser, Debug)]
#[command(name = "grace", version, about)]
struct Cli {
    /// Containers to stop, as [docker/|pod/]NAME
    #[arg(required = true, value_name = "CONTAINER")]
    containers: Vec<String>,

    /// Path to the kubeconfig file [default: $KUBECONFIG, then ~/.kube/config]
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Kubernetes namespace
    #[arg(short, long, env = "GRACE_NAMESPACE", default_value = constants::DEFAULT_NAMESPACE)]
    namespace: String,

    /// Image of the injected debug container
    #[arg(long, env = "GRACE_DEBUG_IMAGE", default_value = constants::DEFAULT_DEBUG_IMAGE)]
    debug_image: String,

    /// Milliseconds between pod status checks
    #[arg(long, default_value_t = constants::DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    poll_interval_ms: u64,

    /// Seconds allowed past the grace period before giving up on a container
    #[arg(long, default_value_t = constants::DEFAULT_POLL_HEADROOM.as_secs())]
    poll_headroom_secs: u64,

    /// Seconds allowed for the debug container to start
    #[arg(long, default_value_t = constants::DEFAULT_SIDECAR_START_TIMEOUT.as_secs())]
    sidecar_timeout_secs: u64,

    /// Seconds allowed for the signal session
    #[arg(long, default_value_t = constants::DEFAULT_EXEC_TIMEOUT.as_secs())]
    exec_timeout_secs: u64,

    /// Continue with the remaining containers after a failure
    #[arg(short, long)]
    keep_going: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            namespace: self.namespace.clone(),
            kubeconfig: self.kubeconfig.clone(),
            debug_image: self.debug_image.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_headroom: Duration::from_secs(self.poll_headroom_secs),
            sidecar_start_timeout: Duration::from_secs(self.sidecar_timeout_secs),
            exec_timeout: Duration::from_secs(self.exec_timeout_secs),
        }
    }

    fn policy(&self) -> FailurePolicy {
        if self.keep_going {
            FailurePolicy::Isolate
        } else {
            FailurePolicy::Abort
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(cli: Cli) -> grace::Result<bool> {
    let targets = cli
        .containers
        .iter()
        .map(|c| Target::parse(c))
        .collect::<grace::Result<Vec<_>>>()?;

    let outcome = runner::run(&targets, &cli.settings(), cli.policy()).await?;

    let rows = report::rows(&outcome.results);
    match cli.output {
        OutputFormat::Table => report::write_table(std::io::stdout().lock(), &rows)?,
        OutputFormat::Json => report::write_json(std::io::stdout().lock(), &rows)?,
    }

    for failure in &outcome.failures {
        eprintln!("error: {}: {}", failure.target, failure.error);
    }
    Ok(outcome.is_success())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    tokio::select! {
        result = execute(cli) => match result {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("error: interrupted");
            ExitCode::from(130)
        }
    }
}
