use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

use commands::onboard::TenantArgs;
use settings::{RunSettings, SecretArgs, TargetArgs};

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Layered stack deployment orchestrator")]
struct Cli {
    /// Run configuration file [default: strata.yaml, optional]
    #[arg(long, global = true, env = "STRATA_CONFIG")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply the platform, services and (with a tenant) application layers.
    Deploy {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        secret: SecretArgs,
    },

    /// Create and apply a tenant's application stack.
    Onboard {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        tenant: TenantArgs,
        #[command(flatten)]
        secret: SecretArgs,
    },

    /// Check a deployment request and list every problem found.
    Validate {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show the effective environment, tier and stack names for a target.
    Resolve {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show what a deploy would write, without touching any stack.
    Plan {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        secret: SecretArgs,
    },
}

impl Command {
    fn target(&self) -> &TargetArgs {
        match self {
            Command::Deploy { target, .. }
            | Command::Onboard { target, .. }
            | Command::Validate { target }
            | Command::Resolve { target }
            | Command::Plan { target, .. } => target,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("✖ {err:#}");
            ExitCode::from(commands::exit_code_for(&err))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = RunSettings::load(cli.config.as_deref(), cli.cmd.target(), cli.json)?;

    match &cli.cmd {
        Command::Deploy { secret, .. } => commands::deploy::run(&settings, &secret.admin_password).await,
        Command::Onboard { tenant, secret, .. } => {
            commands::onboard::run(&settings, tenant, &secret.admin_password).await
        }
        Command::Validate { .. } => commands::validate::run(&settings),
        Command::Resolve { .. } => commands::resolve::run(&settings),
        Command::Plan { secret, .. } => commands::plan::run(&settings, &secret.admin_password),
    }
}
