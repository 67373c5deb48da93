use std::fmt;

use crate::diagnostics::Diagnostic;

// ---------------------------------------------------------------------------
// Simulation events
// ---------------------------------------------------------------------------

/// Kinds of simulation events.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    LandingEngaged,
    GearDeployed,
    /// Surface contact; `speed` is the impact speed in m/s.
    Touchdown { speed: f64 },
    Diagnostic(Diagnostic),
}

/// A discrete event that occurred during simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimEvent {
    pub time: f64,
    pub altitude: f64,
    pub kind: EventKind,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::LandingEngaged => write!(f, "LANDING"),
            EventKind::GearDeployed => write!(f, "GEAR"),
            EventKind::Touchdown { speed } => write!(f, "TOUCHDOWN {speed:.2} m/s"),
            EventKind::Diagnostic(d) => write!(f, "WARN {d}"),
        }
    }
}
