//! kasir license server binary.
//!
//! Subcommands:
//!   serve   — run the activation HTTP service
//!   issue   — create a license record and print its key
//!   keygen  — generate a fresh Ed25519 signing keypair
//!   stats   — print registry usage numbers
//!
//! The service is configured from the environment: `LICENSE_DB`,
//! `LICENSE_SIGNING_KEY_B64`, `TOKEN_TTL_DAYS`, `PORT`.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use kasir_license_server::{build_router, db_path_from_env, AppState, Registry, ServerConfig};
use kasir_token::{SigningAuthority, Tier};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "kasir-license-server")]
#[command(about = "License activation server and operator tools")]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the activation HTTP service
    Serve {
        /// Listen port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create a license and print its key
    Issue {
        /// License tier: trial, standard, pro or unlimited
        tier: Tier,
        /// Trial duration in days (ignored for other tiers)
        #[arg(long, default_value = "30")]
        days: u32,
        /// Device quota
        #[arg(long, default_value = "1")]
        max_devices: u32,
    },
    /// Generate an Ed25519 signing keypair
    Keygen,
    /// Print registry usage numbers
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match args.command {
        Command::Serve { port } => serve(port).await,
        Command::Issue {
            tier,
            days,
            max_devices,
        } => issue(tier, days, max_devices),
        Command::Keygen => keygen(),
        Command::Stats => stats(),
    }
}

async fn serve(port_override: Option<u16>) -> Result<()> {
    let mut config = ServerConfig::from_env().context("server configuration")?;
    if let Some(port) = port_override {
        config.port = port;
    }

    let authority = SigningAuthority::from_base64(&config.signing_key_b64)
        .context("LICENSE_SIGNING_KEY_B64 is not a valid Ed25519 seed")?;
    let registry =
        Registry::open(&config.db_path).with_context(|| {
            format!("opening registry at {}", config.db_path.display())
        })?;

    info!("registry: {}", config.db_path.display());
    info!("token TTL: {} days", config.token_ttl_days);

    let state = AppState {
        registry: Arc::new(registry),
        authority: Arc::new(authority),
        token_ttl_days: config.token_ttl_days,
    };
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("activation server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP server failed")
}

fn issue(tier: Tier, days: u32, max_devices: u32) -> Result<()> {
    let registry = Registry::open(db_path_from_env()).context("opening registry")?;
    let license = registry
        .issue(tier, days, max_devices, Utc::now())
        .context("creating license")?;
    println!("LICENSE_KEY: {}", license.license_key);
    if let Some(expires) = license.expires_at {
        println!("expires_at:  {}", expires.to_rfc3339());
    }
    Ok(())
}

fn keygen() -> Result<()> {
    let authority = SigningAuthority::generate();
    println!("LICENSE_SIGNING_KEY_B64={}", authority.private_key_base64());
    println!(
        "LICENSE_SERVER_PUBLIC_KEY_B64={}",
        authority.public_key_base64()
    );
    println!("# keep the private key secret; ship only the public key");
    Ok(())
}

fn stats() -> Result<()> {
    let registry = Registry::open(db_path_from_env()).context("opening registry")?;
    let stats = registry.stats(Utc::now()).context("collecting stats")?;
    println!("licenses:   {}", stats.total_licenses);
    println!("devices:    {}", stats.total_devices);
    println!("active 24h: {}", stats.active_24h);
    println!("active 7d:  {}", stats.active_7d);
    for (tier, licenses, devices) in stats.tiers {
        println!("  {tier}: {licenses} licenses, {devices} devices");
    }
    Ok(())
}
