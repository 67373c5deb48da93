use std::fmt;

use crate::vessel::VesselId;

/// Non-fatal conditions raised during a tick. The tick always completes; these
/// are reported alongside the commands in the tick report.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A rotation axis produced NaN/inf and was neutralized. Axis index is in
    /// control order (pitch, yaw, roll).
    NonFiniteAxis { axis: usize },
    /// The throttle command was not finite and was set to zero.
    NonFiniteThrottle,
    /// The selected target disappeared from the candidate list.
    TargetLost { id: VesselId },
    /// A command was issued by a behavior that does not own the controls.
    CommandRefused { by: &'static str },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NonFiniteAxis { axis } => {
                let name = ["pitch", "yaw", "roll"].get(*axis).copied().unwrap_or("?");
                write!(f, "non-finite {name} command neutralized")
            }
            Diagnostic::NonFiniteThrottle => write!(f, "non-finite throttle neutralized"),
            Diagnostic::TargetLost { id } => write!(f, "target {id} lost"),
            Diagnostic::CommandRefused { by } => write!(f, "{by} does not own the controls"),
        }
    }
}
