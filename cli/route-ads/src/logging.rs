//! Tracing setup. Logs always go to stderr; stdout carries the rules.

use std::io;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// `RUST_LOG` when set, otherwise `level`.
fn filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level {level:?}")),
    }
}

/// Initialize the global subscriber.
pub fn init(level: &str, format: LogFormat) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(level)?);

    match format {
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .try_init(),
    }
    .context("failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directives() {
        assert!(EnvFilter::try_new("debug").is_ok());
        assert!(EnvFilter::try_new("jobrouter_rules=debug,info").is_ok());
    }
}
