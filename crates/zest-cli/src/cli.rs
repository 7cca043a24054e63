//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use zest_core::OutputFormat;

/// Zest generation gateway
#[derive(Parser, Debug)]
#[command(name = "zest")]
#[command(about = "Moderate, route and normalize HTML/CSS generation requests", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Gateway configuration file (YAML). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "zest_runtime=trace". RUST_LOG wins when set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a page from a request
    Generate(RequestArgs),

    /// Refine an existing page; the request prompt is the instruction
    Refine(RequestArgs),

    /// Run only the moderation gate
    Moderate {
        /// Prompt text to check
        #[arg(long, conflicts_with = "request")]
        prompt: Option<String>,

        /// Moderation request JSON file, or "-" for stdin
        #[arg(long, required_unless_present = "prompt")]
        request: Option<PathBuf>,
    },

    /// List configured providers and their models
    Models,

    /// Normalize a raw backend reply into HTML and CSS
    Normalize {
        /// Raw reply file, or "-" for stdin
        #[arg(long)]
        input: PathBuf,

        /// Output format hint
        #[arg(long, default_value = "html_css", value_parser = parse_format)]
        format: OutputFormat,
    },

    /// Validate the configuration and print the effective settings
    CheckConfig,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Generation request JSON file, or "-" for stdin
    #[arg(long)]
    pub request: PathBuf,
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    value.parse()
}
