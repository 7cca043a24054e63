//! Zest CLI - drive the generation gateway from the command line.
//!
//! Reads request envelopes from files or stdin, prints JSON results on
//! stdout and signals the outcome through the exit code:
//!
//! | code | meaning                 |
//! |------|-------------------------|
//! | 0    | success                 |
//! | 1    | other error             |
//! | 2    | invalid request         |
//! | 3    | moderation rejection    |
//! | 4    | no backend could answer |

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::Mode;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate(args) => {
            let service = commands::build_service(&config)?;
            commands::execute_request(&service, Mode::Generate, &args.request).await
        }
        Commands::Refine(args) => {
            let service = commands::build_service(&config)?;
            commands::execute_request(&service, Mode::Refine, &args.request).await
        }
        Commands::Moderate { prompt, request } => {
            let service = commands::build_service(&config)?;
            commands::execute_moderate(&service, prompt, request)
        }
        Commands::Models => commands::execute_models(&commands::build_service(&config)?),
        Commands::Normalize { input, format } => commands::execute_normalize(&input, format),
        Commands::CheckConfig => commands::execute_check_config(&config),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    tracing::debug!("zest v{}", env!("CARGO_PKG_VERSION"));

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("Error: {:#}", e);
            commands::EXIT_FAILURE
        }
    };

    std::process::exit(code);
}
