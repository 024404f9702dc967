use std::net::SocketAddr;

use modeler_core::builder::{BuildOptions, ExtrudePolicy};
use thiserror::Error;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Server settings, read from `MODELER_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub max_body_bytes: usize,
    pub build: BuildOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            build: BuildOptions::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("MODELER_ADDR") {
            config.addr = value
                .parse()
                .map_err(|e: std::net::AddrParseError| invalid("MODELER_ADDR", &value, e.to_string()))?;
        }

        if let Some(value) = lookup("MODELER_EXTRUDE_POLICY") {
            config.build.extrude_policy = value
                .parse::<ExtrudePolicy>()
                .map_err(|reason| invalid("MODELER_EXTRUDE_POLICY", &value, reason))?;
        }

        if let Some(value) = lookup("MODELER_CUT_DEPTH") {
            config.build.cut_fallback_depth = match value.trim().parse::<f64>() {
                Ok(depth) if depth > 0.0 && depth.is_finite() => depth,
                Ok(_) => return Err(invalid("MODELER_CUT_DEPTH", &value, "must be positive".into())),
                Err(e) => return Err(invalid("MODELER_CUT_DEPTH", &value, e.to_string())),
            };
        }

        if let Some(value) = lookup("MODELER_MAX_BODY_BYTES") {
            config.max_body_bytes = value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid("MODELER_MAX_BODY_BYTES", &value, e.to_string()))?;
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    }
}
