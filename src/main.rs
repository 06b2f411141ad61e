//! Sockldap - Directory-backed SOCKS5 authentication
//!
//! This is the main entry point for the Sockldap application. It checks one
//! credential through the configured authenticator, the same way a SOCKS5
//! server would on a client connection.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use sockldap::auth::{encode_request, negotiate, Authenticator, SOCKS5_VERSION};
use sockldap::config::load_config;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Sockldap - verify SOCKS5 credentials against a directory
#[derive(Parser, Debug)]
#[command(name = "sockldap")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Username to verify
    #[arg(short, long)]
    username: String,

    /// Environment variable holding the password
    #[arg(long, default_value = "SOCKLDAP_PASSWORD")]
    password_env: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    // Load configuration
    let config = load_config(&args.config)?;

    info!("Sockldap v{}", sockldap::VERSION);
    info!("Configuration loaded from: {:?}", args.config);

    let password = std::env::var(&args.password_env)
        .with_context(|| format!("Password not set in ${}", args.password_env))?;

    let authenticator = Authenticator::from_config(&config).await?;
    let verified = verify(&authenticator, &args.username, &password).await;

    if let Err(e) = authenticator.shutdown() {
        error!("Failed to shut down authenticator: {}", e);
    }

    match verified {
        Ok(()) => {
            println!("{}: accepted", args.username);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{}: rejected ({})", args.username, e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Play both sides of a SOCKS5 handshake over an in-memory stream
async fn verify(authenticator: &Authenticator, username: &str, password: &str) -> Result<()> {
    let method = authenticator.method();
    let (mut client, mut server) = tokio::io::duplex(1024);

    let mut request = vec![SOCKS5_VERSION, 1, method];
    if method == sockldap::auth::SOCKS5_AUTH_METHOD_PASSWORD {
        request.extend(encode_request(username, password)?);
    }
    client.write_all(&request).await?;

    let result = negotiate(&mut server, authenticator).await;
    drop(server);

    let mut response = Vec::new();
    client.read_to_end(&mut response).await?;
    info!("Server responded with {:02x?}", response);

    let outcome = result?;
    match outcome.username() {
        Some(user) if user == username => Ok(()),
        Some(user) => Err(anyhow!("authenticated as unexpected user {}", user)),
        None => {
            info!("Authentication disabled, {} accepted anonymously", username);
            Ok(())
        }
    }
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
