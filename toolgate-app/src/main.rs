use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use toolgate_app::commands;
use toolgate_app::config::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "toolgate", version, about = "Policy gateway for agent tool calls")]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "toolgate.yaml", global = true)]
    config: PathBuf,

    /// Override the bind address
    #[arg(long, global = true)]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve,
    /// Validate config, rules and the evidence log
    Check,
    /// Write a starter config and rules file
    Init {
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Init { force }) = &cli.command {
        return commands::init::run(&cli.config, *force);
    }

    let mut config = Config::load(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    init_logging(&config.log_level);

    match cli.command {
        Some(Command::Check) => {
            if !commands::check::run(&config).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Init { .. }) => Ok(()),
        Some(Command::Serve) | None => commands::serve::run(config).await,
    }
}
