use crate::config::toml_config::SamConfig;
use crate::protocol::SignatureType;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "i2p-sam")]
#[command(about = "Talk to an I2P router through its SAM v3 bridge")]
pub struct Cli {
    /// SAM bridge address [default: 127.0.0.1:7656]
    #[arg(long, global = true)]
    pub sam: Option<String>,

    /// TOML settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Seconds to wait for each bridge reply
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Generate a new destination key pair
    GenDest {
        #[arg(long, default_value = "EdDSA_SHA512_Ed25519")]
        signature_type: SignatureType,

        /// Write the keys as JSON instead of printing them
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Resolve a name to its destination
    Lookup { name: String },
    /// Fetch a page from an eepsite
    Get {
        /// host or host:port, port 80 when omitted
        target: String,

        #[arg(long, default_value = "/")]
        path: String,
    },
    /// Run an echo service until Ctrl-C
    Serve {
        /// Keys file from gen-dest; a transient destination when omitted
        #[arg(long)]
        keys: Option<PathBuf>,
    },
}

impl Cli {
    /// Loads the settings file, if any, and applies the command line
    /// overrides on top of it.
    pub fn resolve_config(&self) -> Result<SamConfig> {
        let mut config = match &self.config {
            Some(path) => SamConfig::from_file(path)?,
            None => SamConfig::default(),
        };
        if let Some(sam) = &self.sam {
            config.bridge.endpoint = sam.clone();
        }
        if let Some(timeout) = self.timeout {
            config.bridge.reply_timeout_seconds = Some(timeout);
        }
        config.validate()?;
        Ok(config)
    }
}
