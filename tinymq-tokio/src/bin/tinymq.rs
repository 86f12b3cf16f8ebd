use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tinymq_core::crypto;
use tinymq_tokio::{BrokerConfig, BrokerServer};

/// Minimal QoS 0 MQTT broker
#[derive(Debug, Parser)]
#[command(name = "tinymq", version, about)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port, overrides the configuration file
    #[arg(short, long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encrypt a password for the `auth.password` setting
    EncryptPassword {
        password: String,
        /// Base64 key matching `auth.key`; the built-in key when omitted
        #[arg(long)]
        key: Option<String>,
    },
    /// Print a new random base64 key for `auth.key`
    GenerateKey,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Some(Command::GenerateKey) => {
            println!("{}", crypto::generate_key());
            return Ok(());
        }
        Some(Command::EncryptPassword { password, key }) => {
            let key = match key {
                Some(encoded) => crypto::decode_key(&encoded)?,
                None => crypto::DEFAULT_KEY,
            };
            println!("{}", crypto::encrypt_password(&password, &key)?);
            return Ok(());
        }
        None => {}
    }

    let mut config = match &cli.config {
        Some(path) => BrokerConfig::load(path)?,
        None => BrokerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }

    log::info!("Starting tinymq broker");
    BrokerServer::new(config).run().await?;
    Ok(())
}
