//! Request authorization gateway.
//!
//! Sits in front of a web application and decides, per request, whether to
//! pass it through, redirect it, or reject it.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http server ──▶ gateway middleware
//!                                        │
//!                                        ▼
//!                          ┌──────────────────────────┐
//!                          │ routing   (zone)         │
//!                          │ security  (rate limits)  │
//!                          │ identity  (credential)   │
//!                          │ rbac      (permissions)  │
//!                          │ decision  (action)       │
//!                          └────────────┬─────────────┘
//!                         pass │        │ redirect / 401 / 403 / 429
//!                              ▼        ▼
//!             handlers / admin / upstream    security headers
//! ```

use std::path::PathBuf;

use clap::Parser;

use authz_gateway::lifecycle::startup;
use authz_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "authz-gateway")]
#[command(about = "Request authorization gateway", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = startup::load(args.config.as_deref())?;
    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::run(config).await
}
