//! Gavel serve command for running the live event server
//!
//! The serve command runs the gavel server which provides:
//! - SSE streams for auction, wallet, and featured feeds
//! - Snapshot endpoint for featured-feed hydration
//! - Health endpoint

use anyhow::Result;
use clap::Args;
use gavel_server::{GavelServer, ServerConfig};
use tracing::info;

/// Default port for the gavel server
pub const DEFAULT_PORT: u16 = 7810;
/// Default host for the gavel server
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = ServerConfig::new(args.host, args.port);

    info!("Starting gavel server on {}", config.addr());

    let server = GavelServer::new(config);
    server.run().await.map_err(Into::into)
}
