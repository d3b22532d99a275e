//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration (file or defaults) and apply env overrides
//! - Build the gateway, failing fast on any validation error
//! - Start metrics, bind the listener, and serve until shutdown

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::loader::apply_env_overrides;
use crate::config::{load_config, validate_config, ConfigError, GatewayConfig};
use crate::gateway::Gateway;
use crate::http::GatewayServer;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Read the config file when given, otherwise start from defaults. The
/// secret override and validation apply in both cases.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    if let Some(path) = path {
        return load_config(path);
    }
    let mut config = GatewayConfig::default();
    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Serve until SIGINT/SIGTERM.
pub async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = Arc::new(Gateway::from_config(&config)?);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = GatewayServer::new(gateway)?;
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[identity]
secret = "startup-test-secret-0123456789abcdef"

[listener]
bind_address = "127.0.0.1:0"
"#
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:0");
    }

    #[test]
    fn test_defaults_still_need_a_secret() {
        if std::env::var(crate::config::SECRET_ENV_VAR).is_ok() {
            return;
        }
        assert!(matches!(load(None), Err(ConfigError::Validation(_))));
    }
}
