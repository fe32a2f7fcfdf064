use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "shipwatch", version, about = "Shipment tracking service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default if no subcommand given).
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Data directory holding orders.json and settings.json.
        #[arg(long, env = "SHIPWATCH_DATA_DIR", default_value = ".shipwatch")]
        data_dir: PathBuf,
    },
}
