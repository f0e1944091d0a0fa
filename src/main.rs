mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scip_apex=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index(args) => {
            let cwd = std::env::current_dir()?;
            cli::index_directory(&args, &cwd, std::env::args().collect())?;
        }
        Commands::Stats { index } => {
            cli::show_stats(&index)?;
        }
    }

    Ok(())
}
