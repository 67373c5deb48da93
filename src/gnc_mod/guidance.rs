use nalgebra::{UnitQuaternion, Vector3};

use crate::config::{AutopilotConfig, WarpConfig};
use crate::diagnostics::Diagnostic;
use crate::vessel::{TargetCandidate, VesselId, VesselSnapshot};
use crate::warp::{WarpRefusal, WarpRequest, WarpScheduler};

use super::frame::{self, Reference};
use super::setpoint::{
    AttitudeChange, AttitudeSetpoint, AttitudeTarget, ControlMode, ModeChange, ThrottleSetpoint,
};

// ---------------------------------------------------------------------------
// Guidance: the command surface behaviors steer the vessel through
// ---------------------------------------------------------------------------

/// Name of the behavior issuing a command. `None` is the pilot or host.
pub type Owner = &'static str;

/// Above this angle (degrees) between old and new pointing, a direction-only
/// attitude request takes its roll from the vessel instead of the old target.
const KEEP_UP_LIMIT_DEG: f64 = 45.0;

/// Setpoint discontinuities, dispatched to every behavior before the next one
/// runs.
#[derive(Debug, Clone, PartialEq)]
pub enum GuidanceEvent {
    AttitudeChanged(AttitudeChange),
    ModeChanged(ModeChange),
    ControlLost { owner: Owner },
    TargetLost { id: VesselId },
}

/// Owns the attitude and throttle setpoints for one vessel and applies the
/// side effects of changing them.
///
/// Every mutating command takes the issuing behavior's name. While a behavior
/// owns the controls, commands from any other named behavior are refused.
#[derive(Debug)]
pub struct Guidance {
    attitude: AttitudeSetpoint,
    throttle: ThrottleSetpoint,
    kill_rotation: bool,
    retarget_threshold_deg: f64,
    owner: Option<Owner>,
    target: Option<VesselId>,

    events: Vec<GuidanceEvent>,
    neutral_pending: bool,
    gear_request: bool,
    warp: WarpScheduler,
    warp_request: Option<WarpRequest>,
    diagnostics: Vec<Diagnostic>,
}

impl Guidance {
    pub fn new(config: &AutopilotConfig) -> Self {
        Self {
            attitude: AttitudeSetpoint::default(),
            throttle: ThrottleSetpoint::default(),
            kill_rotation: false,
            retarget_threshold_deg: config.attitude.retarget_threshold_deg,
            owner: None,
            target: None,
            events: Vec::new(),
            neutral_pending: false,
            gear_request: false,
            warp: WarpScheduler::new(),
            warp_request: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn attitude(&self) -> &AttitudeSetpoint {
        &self.attitude
    }

    pub fn throttle(&self) -> &ThrottleSetpoint {
        &self.throttle
    }

    pub fn mode(&self) -> ControlMode {
        self.throttle.mode
    }

    pub fn owner(&self) -> Option<Owner> {
        self.owner
    }

    pub fn target(&self) -> Option<VesselId> {
        self.target
    }

    /// Hold the current heading when the pilot lets go of every axis.
    pub fn kill_rotation(&self) -> bool {
        self.kill_rotation
    }

    pub fn set_kill_rotation(&mut self, on: bool) {
        self.kill_rotation = on;
    }

    fn permits(&mut self, by: Option<Owner>) -> bool {
        match (self.owner, by) {
            (Some(owner), Some(by)) if owner != by => {
                tracing::debug!(owner, by, "command refused");
                self.diagnostics.push(Diagnostic::CommandRefused { by });
                false
            }
            _ => true,
        }
    }

    // -- attitude -----------------------------------------------------------

    pub fn attitude_to_rotation(
        &mut self,
        rotation: UnitQuaternion<f64>,
        reference: Reference,
        by: Option<Owner>,
    ) -> bool {
        self.set_attitude(AttitudeTarget::new(reference, rotation, true), by)
    }

    /// Point along `direction` (in `reference` coordinates) without caring
    /// about roll.
    pub fn attitude_to(
        &mut self,
        direction: &Vector3<f64>,
        reference: Reference,
        snapshot: &VesselSnapshot,
        target: Option<&TargetCandidate>,
        by: Option<Owner>,
    ) -> bool {
        let current = self.attitude.target;
        let current_frame = frame::resolve(current.reference, snapshot, target);
        let new_frame = frame::resolve(reference, snapshot, target);

        let current_forward = current_frame * current.forward();
        let keep_up = self.attitude.is_active()
            && current_forward.angle(&(new_frame * direction)).to_degrees() <= KEEP_UP_LIMIT_DEG;
        let up_world = if keep_up { current_frame * current.top() } else { snapshot.top() };
        let up = new_frame.inverse_transform_vector(&up_world);

        let Some(rotation) = frame::look_rotation(direction, &up) else {
            tracing::warn!(?reference, "zero attitude direction ignored");
            return false;
        };
        self.set_attitude(AttitudeTarget::new(reference, rotation, false), by)
    }

    pub fn attitude_deactivate(&mut self, by: Option<Owner>) -> bool {
        if !self.permits(by) {
            return false;
        }
        let update = self.attitude.deactivate();
        self.apply_attitude(update);
        true
    }

    pub fn set_attitude(&mut self, target: AttitudeTarget, by: Option<Owner>) -> bool {
        if !self.permits(by) {
            return false;
        }
        let update = self.attitude.retarget(target, self.retarget_threshold_deg);
        self.apply_attitude(update);
        true
    }

    fn apply_attitude(&mut self, (next, change): (AttitudeSetpoint, Option<AttitudeChange>)) {
        self.attitude = next;
        if let Some(change) = change {
            if change.new.reference != Reference::Inertial {
                self.kill_rotation = false;
            }
            tracing::debug!(reference = ?change.new.reference, "attitude target changed");
            self.events.push(GuidanceEvent::AttitudeChanged(change));
        }
    }

    /// Degrees between the target's nose direction and the vessel's, ignoring
    /// roll.
    pub fn angle_from_target(&self, snapshot: &VesselSnapshot, target: Option<&TargetCandidate>) -> f64 {
        let t = self.attitude.target;
        let wanted = frame::resolve(t.reference, snapshot, target) * t.forward();
        wanted.angle(&snapshot.forward()).to_degrees()
    }

    // -- throttle -----------------------------------------------------------

    pub fn set_mode(&mut self, mode: ControlMode, by: Option<Owner>) -> bool {
        if !self.permits(by) {
            return false;
        }
        let update = self.throttle.with_mode(mode);
        self.apply_mode(update);
        true
    }

    /// Speed to hold in m/s, or the throttle percentage in `Direct` mode.
    pub fn set_speed_target(&mut self, value: f64, by: Option<Owner>) -> bool {
        if !self.permits(by) {
            return false;
        }
        self.throttle.speed_target = value;
        true
    }

    pub fn set_kill_horizontal(&mut self, on: bool, by: Option<Owner>) -> bool {
        if !self.permits(by) {
            return false;
        }
        self.throttle.kill_horizontal = on;
        true
    }

    pub fn land_activate(&mut self, touchdown_speed: f64, by: Option<Owner>) -> bool {
        if !self.permits(by) {
            return false;
        }
        let update = self.throttle.with_landing(touchdown_speed);
        self.apply_mode(update);
        self.throttle.kill_horizontal = true;
        tracing::info!(touchdown_speed, "landing engaged");
        true
    }

    pub fn land_deactivate(&mut self, by: Option<Owner>) -> bool {
        if !self.permits(by) {
            return false;
        }
        let update = self.throttle.without_landing();
        self.apply_mode(update);
        true
    }

    pub(crate) fn mark_gear_deployed(&mut self) {
        if let Some(landing) = self.throttle.landing.as_mut() {
            if !landing.gear_deployed {
                landing.gear_deployed = true;
                self.gear_request = true;
            }
        }
    }

    fn apply_mode(&mut self, (next, change): (ThrottleSetpoint, Option<ModeChange>)) {
        self.throttle = next;
        if let Some(change) = change {
            tracing::debug!(from = ?change.from, to = ?change.to, "control mode changed");
            self.events.push(GuidanceEvent::ModeChanged(change));
            self.neutral_pending = true;
            if self.throttle.kill_horizontal && change.to == ControlMode::Off {
                let update = self.attitude.deactivate();
                self.apply_attitude(update);
                self.throttle.landing = None;
            }
        }
    }

    // -- ownership ----------------------------------------------------------

    /// Take exclusive control. Any previous owner loses control first.
    pub fn claim_control(&mut self, by: Owner) -> bool {
        if self.owner == Some(by) {
            return true;
        }
        self.release_control();
        self.owner = Some(by);
        tracing::debug!(owner = by, "control claimed");
        true
    }

    /// Drop the owner and stop everything it was flying.
    pub fn release_control(&mut self) {
        if let Some(owner) = self.owner.take() {
            tracing::debug!(owner, "control released");
            self.events.push(GuidanceEvent::ControlLost { owner });
        }
        let update = self.attitude.deactivate();
        self.apply_attitude(update);
        let update = self.throttle.without_landing();
        self.apply_mode(update);
        let update = self.throttle.with_mode(ControlMode::Off);
        self.apply_mode(update);
    }

    // -- target -------------------------------------------------------------

    pub fn select_target(&mut self, id: Option<VesselId>) {
        if self.target == id {
            return;
        }
        self.target = id;
        if self.attitude.is_active() && self.attitude.target.reference == Reference::Target {
            let t = self.attitude.target;
            self.events.push(GuidanceEvent::AttitudeChanged(AttitudeChange { old: t, new: t }));
        }
    }

    pub(crate) fn lose_target(&mut self) {
        if let Some(id) = self.target.take() {
            tracing::warn!(id, "selected target vanished");
            self.diagnostics.push(Diagnostic::TargetLost { id });
            self.events.push(GuidanceEvent::TargetLost { id });
        }
    }

    // -- time warp ----------------------------------------------------------

    pub fn warp_increase(
        &mut self,
        snapshot: &VesselSnapshot,
        table: &WarpConfig,
        instant: bool,
        max_rate: f64,
        by: Option<Owner>,
    ) -> Result<(), WarpRefusal> {
        if !self.permits(by) {
            return Err(WarpRefusal::NotOwner);
        }
        let request = self.warp.increase(snapshot, table, instant, max_rate).inspect_err(|refusal| {
            tracing::debug!(%refusal, "warp increase refused");
        })?;
        self.warp_request = Some(request);
        Ok(())
    }

    pub fn warp_decrease(&mut self, snapshot: &VesselSnapshot, instant: bool, by: Option<Owner>) -> Result<(), WarpRefusal> {
        if !self.permits(by) {
            return Err(WarpRefusal::NotOwner);
        }
        self.warp_request = Some(self.warp.decrease(snapshot, instant)?);
        Ok(())
    }

    pub fn warp_minimum(&mut self, instant: bool, by: Option<Owner>) -> Result<(), WarpRefusal> {
        if !self.permits(by) {
            return Err(WarpRefusal::NotOwner);
        }
        self.warp_request = Some(self.warp.minimum(instant));
        Ok(())
    }

    pub fn warp_physics(
        &mut self,
        snapshot: &VesselSnapshot,
        table: &WarpConfig,
        instant: bool,
        by: Option<Owner>,
    ) -> Result<(), WarpRefusal> {
        if !self.permits(by) {
            return Err(WarpRefusal::NotOwner);
        }
        if let Some(request) = self.warp.physics(snapshot, table, instant) {
            self.warp_request = Some(request);
        }
        Ok(())
    }

    pub fn warp_to(
        &mut self,
        snapshot: &VesselSnapshot,
        table: &WarpConfig,
        time_left: f64,
        max_rate: f64,
        by: Option<Owner>,
    ) -> Result<(), WarpRefusal> {
        if !self.permits(by) {
            return Err(WarpRefusal::NotOwner);
        }
        if let Some(request) = self.warp.warp_to(snapshot, table, time_left, max_rate)? {
            self.warp_request = Some(request);
        }
        Ok(())
    }

    // -- per-tick outputs ---------------------------------------------------

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn take_events(&mut self) -> Vec<GuidanceEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn take_neutral_pending(&mut self) -> bool {
        std::mem::take(&mut self.neutral_pending)
    }

    pub(crate) fn take_gear_request(&mut self) -> bool {
        std::mem::take(&mut self.gear_request)
    }

    pub(crate) fn take_warp_request(&mut self) -> Option<WarpRequest> {
        self.warp_request.take()
    }

    pub(crate) fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
