use std::any::Any;

use crate::config::AutopilotConfig;
use crate::vessel::{ControlState, TargetCandidate, VesselId, VesselSnapshot};

use super::guidance::{Guidance, GuidanceEvent, Owner};
use super::setpoint::{AttitudeChange, ModeChange};

/// Everything a behavior sees and may change during one tick.
pub struct TickContext<'a> {
    pub snapshot: &'a VesselSnapshot,
    /// The selected target, already validated against the candidate list.
    pub target: Option<&'a TargetCandidate>,
    pub config: &'a AutopilotConfig,
    pub guidance: &'a mut Guidance,
    pub controls: &'a mut ControlState,
    /// Attitude-loop effort, Σ min(|act|, 1) over the three axes.
    pub stress: f64,
}

/// Trait for flight behaviors.
///
/// Implement this to plug a controller or planner into the autopilot tick.
/// Behaviors run in registration order; setpoint changes made by one are
/// delivered to all of them through the `on_*` hooks before the next runs.
pub trait Behavior: Any {
    /// Run one fixed physics step.
    fn on_tick(&mut self, ctx: &mut TickContext<'_>);

    fn on_mode_changed(&mut self, _change: &ModeChange) {}

    fn on_attitude_changed(&mut self, _change: &AttitudeChange) {}

    /// Called on every behavior; `owner` names the one that lost control.
    fn on_control_lost(&mut self, _owner: Owner) {}

    fn on_target_lost(&mut self, _id: VesselId) {}

    /// Reset controller internal state (e.g., PID integrators).
    fn reset(&mut self) {}

    /// Human-readable name, also used as the control-ownership token.
    fn name(&self) -> &'static str {
        "unnamed"
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Route one guidance event to the matching hook.
pub fn dispatch(behavior: &mut dyn Behavior, event: &GuidanceEvent) {
    match event {
        GuidanceEvent::AttitudeChanged(change) => behavior.on_attitude_changed(change),
        GuidanceEvent::ModeChanged(change) => behavior.on_mode_changed(change),
        GuidanceEvent::ControlLost { owner } => behavior.on_control_lost(*owner),
        GuidanceEvent::TargetLost { id } => behavior.on_target_lost(*id),
    }
}
