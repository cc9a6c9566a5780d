//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fraudet-server")]
#[command(about = "Fraudet model-serving API", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Bundle prefix in the remote store
    #[arg(short, long)]
    pub bundle: Option<String>,

    /// Use a local directory as the bundle store
    #[arg(long)]
    pub store_root: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'l', long, default_value = "0.0.0.0")]
    pub listen: String,

    /// Listen port
    #[arg(short = 'P', long, default_value = "8080")]
    pub port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
