use nalgebra::{UnitQuaternion, Vector3};

use super::frame::Reference;

// ---------------------------------------------------------------------------
// Attitude setpoint
// ---------------------------------------------------------------------------

/// Desired orientation, expressed in a reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeTarget {
    pub reference: Reference,
    pub rotation: UnitQuaternion<f64>, // target local → reference frame
    pub roll_matters: bool,
}

impl AttitudeTarget {
    pub fn new(reference: Reference, rotation: UnitQuaternion<f64>, roll_matters: bool) -> Self {
        Self { reference, rotation, roll_matters }
    }

    /// Nose direction in reference-frame coordinates.
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * Vector3::z()
    }

    pub fn top(&self) -> Vector3<f64> {
        self.rotation * Vector3::y()
    }
}

impl Default for AttitudeTarget {
    fn default() -> Self {
        Self::new(Reference::Inertial, UnitQuaternion::identity(), false)
    }
}

/// A discontinuity in the attitude target that invalidates rotation-PID state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeChange {
    pub old: AttitudeTarget,
    pub new: AttitudeTarget,
}

/// Attitude setpoint with debounced change detection.
///
/// The stored target always follows the latest request. A change is only
/// reported when the reference frame differs or the forward vector has moved
/// more than the threshold away from the last *effective* target, so slow
/// continuous drift never resets the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeSetpoint {
    pub target: AttitudeTarget,
    last_effective: UnitQuaternion<f64>,
    active: bool,
}

impl Default for AttitudeSetpoint {
    fn default() -> Self {
        Self { target: AttitudeTarget::default(), last_effective: UnitQuaternion::identity(), active: false }
    }
}

impl AttitudeSetpoint {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_effective(&self) -> UnitQuaternion<f64> {
        self.last_effective
    }

    /// Activate with `target`.
    pub fn retarget(&self, target: AttitudeTarget, threshold_deg: f64) -> (Self, Option<AttitudeChange>) {
        let mut next = *self;
        next.active = true;

        let moved = (self.last_effective * Vector3::z())
            .angle(&(target.rotation * Vector3::z()))
            .to_degrees();
        let reference_changed = self.target.reference != target.reference;
        if moved > threshold_deg {
            next.last_effective = target.rotation;
        }
        next.target = target;

        let change = (reference_changed || moved > threshold_deg)
            .then_some(AttitudeChange { old: self.target, new: target });
        (next, change)
    }

    /// Stop holding attitude. Only an active setpoint reports a change.
    pub fn deactivate(&self) -> (Self, Option<AttitudeChange>) {
        let mut next = *self;
        next.active = false;
        let change = self.active.then_some(AttitudeChange { old: self.target, new: self.target });
        (next, change)
    }
}

// ---------------------------------------------------------------------------
// Throttle setpoint
// ---------------------------------------------------------------------------

/// Quantity the translation controller holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    #[default]
    Off,
    KeepOrbital,
    KeepSurface,
    KeepVertical,
    /// Speed target is a throttle percentage.
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landing {
    pub touchdown_speed: f64,
    pub gear_deployed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub from: ControlMode,
    pub to: ControlMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThrottleSetpoint {
    pub mode: ControlMode,
    pub speed_target: f64,
    pub kill_horizontal: bool,
    pub landing: Option<Landing>,
}

impl ThrottleSetpoint {
    pub fn with_mode(&self, mode: ControlMode) -> (Self, Option<ModeChange>) {
        let next = Self { mode, ..*self };
        let change = (self.mode != mode).then_some(ModeChange { from: self.mode, to: mode });
        (next, change)
    }

    /// Begin (or retune) a powered landing.
    pub fn with_landing(&self, touchdown_speed: f64) -> (Self, Option<ModeChange>) {
        match self.landing {
            Some(landing) => {
                let next = Self { landing: Some(Landing { touchdown_speed, ..landing }), ..*self };
                (next, None)
            }
            None => {
                let (mut next, change) = self.with_mode(ControlMode::KeepVertical);
                next.landing = Some(Landing { touchdown_speed, gear_deployed: false });
                (next, change)
            }
        }
    }

    pub fn without_landing(&self) -> (Self, Option<ModeChange>) {
        if self.landing.is_none() {
            return (*self, None);
        }
        let (mut next, change) = self.with_mode(ControlMode::Off);
        next.landing = None;
        (next, change)
    }

    pub fn is_landing(&self) -> bool {
        self.landing.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointing(deg_from_z: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), deg_from_z.to_radians())
    }

    fn active_at(rotation: UnitQuaternion<f64>) -> AttitudeSetpoint {
        let (sp, _) = AttitudeSetpoint::default().retarget(AttitudeTarget::new(Reference::Inertial, pointing(90.0), false), 10.0);
        let (sp, _) = sp.retarget(AttitudeTarget::new(Reference::Inertial, rotation, false), 10.0);
        sp
    }

    #[test]
    fn same_target_is_idempotent() {
        let sp = active_at(pointing(0.0));
        let (next, change) = sp.retarget(sp.target, 10.0);
        assert!(change.is_none(), "re-setting the current target must not signal");
        assert_eq!(next, sp);
    }

    #[test]
    fn small_moves_are_debounced_against_last_effective() {
        let sp = active_at(pointing(0.0));
        // three 6° steps: 6, 12 (> 10 from effective), 18
        let (sp, c1) = sp.retarget(AttitudeTarget::new(Reference::Inertial, pointing(6.0), false), 10.0);
        assert!(c1.is_none());
        assert_eq!(sp.target.rotation, pointing(6.0), "target still follows the request");
        let (sp, c2) = sp.retarget(AttitudeTarget::new(Reference::Inertial, pointing(12.0), false), 10.0);
        assert!(c2.is_some(), "12° from the effective target is a change");
        let (_, c3) = sp.retarget(AttitudeTarget::new(Reference::Inertial, pointing(18.0), false), 10.0);
        assert!(c3.is_none(), "effective target moved to 12°");
    }

    #[test]
    fn reference_change_always_signals() {
        let sp = active_at(pointing(0.0));
        let (_, change) = sp.retarget(AttitudeTarget::new(Reference::Orbit, pointing(0.0), false), 10.0);
        let change = change.unwrap();
        assert_eq!(change.old.reference, Reference::Inertial);
        assert_eq!(change.new.reference, Reference::Orbit);
    }

    #[test]
    fn deactivate_signals_once() {
        let sp = active_at(pointing(0.0));
        let (sp, first) = sp.deactivate();
        let (_, second) = sp.deactivate();
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn mode_change_only_when_different() {
        let sp = ThrottleSetpoint::default();
        let (sp, change) = sp.with_mode(ControlMode::KeepSurface);
        assert_eq!(change, Some(ModeChange { from: ControlMode::Off, to: ControlMode::KeepSurface }));
        let (_, change) = sp.with_mode(ControlMode::KeepSurface);
        assert!(change.is_none());
    }

    #[test]
    fn landing_enters_keep_vertical_once() {
        let (sp, change) = ThrottleSetpoint::default().with_landing(0.5);
        assert_eq!(sp.mode, ControlMode::KeepVertical);
        assert!(change.is_some());
        let (sp, change) = sp.with_landing(1.0);
        assert!(change.is_none());
        assert_eq!(sp.landing.map(|l| l.touchdown_speed), Some(1.0));
        let (sp, change) = sp.without_landing();
        assert_eq!(sp.mode, ControlMode::Off);
        assert!(change.is_some());
        assert!(!sp.is_landing());
    }
}
