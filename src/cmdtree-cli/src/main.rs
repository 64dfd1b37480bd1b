//! `cmdtree`: runs and completes commands of the demo tree.

mod args;
mod demo;
mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use cmdtree_engine::{EngineConfig, InvocationOutcome};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands};

fn init_logging(cli: &Cli) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directives = cli.log_directives(rust_log.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .unwrap_or_else(|_| EnvFilter::new(cli.effective_log_level().as_filter_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(prefix) = &cli.prefix {
        config.prefix = prefix.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = load_config(&cli)?;
    let dispatcher = demo::dispatcher(config).context("invalid command tree")?;
    let sender = cli.build_sender();
    info!(sender = sender.id(), prefix = %dispatcher.config().prefix, "starting");

    match cli.command {
        Some(Commands::Run { input }) => {
            let line = input.join(" ");
            if let InvocationOutcome::Completed(Some(value)) = dispatcher.invoke(&sender, &line)? {
                println!("{value}");
            }
        }
        Some(Commands::Complete { input }) => {
            for suggestion in dispatcher.suggest(sender.as_ref(), &input)? {
                println!("{suggestion}");
            }
        }
        Some(Commands::Repl) | None => {
            let stdin = std::io::stdin();
            repl::run(&dispatcher, &sender, stdin.lock(), std::io::stdout())?;
        }
    }
    Ok(())
}
