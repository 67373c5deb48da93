use thiserror::Error;

use crate::vessel::VesselId;

/// Errors that can occur while loading or validating an [`AutopilotConfig`].
///
/// [`AutopilotConfig`]: crate::config::AutopilotConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Vessel ownership errors raised by the [`VesselRegistry`].
///
/// [`VesselRegistry`]: crate::autopilot::VesselRegistry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("vessel {0} already has an autopilot")]
    AlreadyClaimed(VesselId),
}
