//! Tunable gains and thresholds for the autopilot, loadable from TOML.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```toml
//! [attitude]
//! kp = 8000.0
//!
//! [landing]
//! touchdown_speed = 1.0
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct AutopilotConfig {
    pub attitude: AttitudeConfig,
    pub translation: TranslationConfig,
    pub landing: LandingConfig,
    pub rendezvous: RendezvousConfig,
    pub warp: WarpConfig,
}

/// Rotation PID and pilot-override settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AttitudeConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Manual input magnitude above which an axis counts as pilot-commanded.
    pub override_deadband: f64,
    /// Forward-vector change (degrees) that counts as a new target.
    pub retarget_threshold_deg: f64,
    /// Multiplier on the angular-momentum decoupling term.
    pub decoupling_gain: f64,
    /// Vessel-axis index (pitch, roll, yaw) feeding each control axis
    /// (pitch, yaw, roll).
    pub axis_order: [usize; 3],
}

impl Default for AttitudeConfig {
    fn default() -> Self {
        Self {
            kp: 10_000.0,
            ki: 0.0,
            kd: 0.0,
            override_deadband: 0.1,
            retarget_threshold_deg: 10.0,
            decoupling_gain: 1.1,
            axis_order: [0, 2, 1],
        }
    }
}

/// Throttle PID.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self { kp: 0.05, ki: 1e-6, kd: 0.05 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LandingConfig {
    pub touchdown_speed: f64, // m/s
    pub gear_altitude: f64,   // m
    pub flare_altitude: f64,  // m, below this the descent profile tapers linearly
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self { touchdown_speed: 0.5, gear_altitude: 1_000.0, flare_altitude: 200.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendezvousConfig {
    /// Docking goal in the target's local frame, m.
    pub home_offset: [f64; 3],
    /// Proportional gain on relative velocity for the translation aids.
    pub translation_gain: f64,
    /// Let the phaser time-warp through its waiting states.
    pub auto_warp: bool,
    /// Highest rate the phaser may request while waiting.
    pub max_warp_rate: f64,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            home_offset: [0.0, 2.0, 0.0],
            translation_gain: 8.0,
            auto_warp: false,
            max_warp_rate: 10_000.0,
        }
    }
}

/// The host's time-warp table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WarpConfig {
    pub rates: Vec<f64>,
    /// Minimum altitude for each rate as a fraction of the body radius.
    pub altitude_limits: Vec<f64>,
    /// Time-to-go (s) below which each rate is too fast for warp-to-time.
    pub lookahead: Vec<f64>,
    pub max_physics_rate: f64,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            rates: vec![1.0, 5.0, 10.0, 50.0, 100.0, 1_000.0, 10_000.0, 100_000.0],
            altitude_limits: vec![0.0, 0.0, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0],
            lookahead: vec![0.0, 10.0, 20.0, 100.0, 200.0, 2_000.0, 20_000.0, 200_000.0],
            max_physics_rate: 4.0,
        }
    }
}

impl AutopilotConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: AutopilotConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gains = [
            ("attitude.kp", self.attitude.kp),
            ("attitude.ki", self.attitude.ki),
            ("attitude.kd", self.attitude.kd),
            ("translation.kp", self.translation.kp),
            ("translation.ki", self.translation.ki),
            ("translation.kd", self.translation.kd),
            ("rendezvous.translation_gain", self.rendezvous.translation_gain),
        ];
        for (name, value) in gains {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be a non-negative number, got {value}")));
            }
        }

        let mut order = self.attitude.axis_order;
        order.sort_unstable();
        if order != [0, 1, 2] {
            return Err(ConfigError::Invalid(format!(
                "attitude.axis_order must be a permutation of 0..3, got {:?}",
                self.attitude.axis_order
            )));
        }
        if !(self.attitude.override_deadband >= 0.0 && self.attitude.override_deadband < 1.0) {
            return Err(ConfigError::Invalid("attitude.override_deadband must be in [0, 1)".into()));
        }

        if self.landing.touchdown_speed <= 0.0 || self.landing.flare_altitude <= 0.0 {
            return Err(ConfigError::Invalid("landing speeds and altitudes must be positive".into()));
        }

        let w = &self.warp;
        if w.rates.is_empty() {
            return Err(ConfigError::Invalid("warp.rates must not be empty".into()));
        }
        if w.altitude_limits.len() != w.rates.len() || w.lookahead.len() != w.rates.len() {
            return Err(ConfigError::Invalid(
                "warp.altitude_limits and warp.lookahead must have one entry per rate".into(),
            ));
        }
        if w.rates.windows(2).any(|p| p[1] <= p[0]) {
            return Err(ConfigError::Invalid("warp.rates must be strictly increasing".into()));
        }
        Ok(())
    }
}
