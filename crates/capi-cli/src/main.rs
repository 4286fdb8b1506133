//! capictl — place and inspect workloads on a capi-managed cluster.
//!
//! # Usage
//!
//! ```text
//! capictl --capi http://capi:8081/proto/v0 submit --task api.toml
//! capictl state --format json
//! capictl host --host sas1-1234
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

#[derive(Parser)]
#[command(
    name = "capictl",
    about = "Place and inspect workloads on a capi-managed cluster",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Tool configuration file. Missing file means defaults.
    #[arg(long, global = true, default_value = "capi.toml")]
    config: PathBuf,

    /// Control plane base url, overrides the config file.
    #[arg(long, global = true)]
    capi: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Place a task on the first host with enough free capacity.
    Submit {
        /// Task file (TOML).
        #[arg(short, long)]
        task: PathBuf,
        /// Maximum placement attempts.
        #[arg(long)]
        retries: Option<u32>,
        /// Also exclude hosts whose transition was rejected.
        #[arg(long)]
        exclude_on_apply_failure: bool,
        /// Network identity to use instead of the allocator.
        #[arg(long, requires = "hostname")]
        ip: Option<String>,
        #[arg(long, requires = "ip")]
        hostname: Option<String>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Show the compact cluster snapshot.
    State {
        #[arg(long)]
        host_filter: Option<String>,
        #[arg(long)]
        workload_filter: Option<String>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Show one host in detail.
    Host {
        #[arg(long)]
        host: String,
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Find where a task's workloads are running.
    TaskInfo {
        #[arg(short, long)]
        task: PathBuf,
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Remove every running workload of a task.
    Destroy {
        #[arg(short, long)]
        task: PathBuf,
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("capi=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = settings::load(&cli.config, cli.capi.as_deref())?;

    match cli.command {
        Commands::Submit {
            task,
            retries,
            exclude_on_apply_failure,
            ip,
            hostname,
            format,
        } => {
            let overrides = settings::SubmitOverrides {
                retries,
                exclude_on_apply_failure,
                ip,
                hostname,
            };
            commands::submit::submit(&config, &task, overrides, format).await
        }
        Commands::State {
            host_filter,
            workload_filter,
            format,
        } => {
            commands::state::state(&config, host_filter, workload_filter, format).await
        }
        Commands::Host { host, format } => commands::state::host(&config, &host, format).await,
        Commands::TaskInfo { task, format } => {
            commands::task::task_info(&config, &task, format).await
        }
        Commands::Destroy { task, format } => commands::task::destroy(&config, &task, format).await,
    }
}
