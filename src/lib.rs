pub mod autopilot;
pub mod config;
pub mod diagnostics;
pub mod error;
mod gnc_mod;
pub mod orbital;
pub mod rendezvous;
pub mod sim;
pub mod vessel;
pub mod warp;

// Guidance and control, exposed publicly as `gnc`
pub mod gnc {
    pub use crate::gnc_mod::*;
}

pub use autopilot::{Autopilot, TickReport, VesselClaim, VesselRegistry};
pub use config::AutopilotConfig;
pub use diagnostics::Diagnostic;
pub use error::{ClaimError, ConfigError};
