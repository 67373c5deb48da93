use std::any::Any;

use crate::diagnostics::Diagnostic;

use super::controller::{Behavior, TickContext};
use super::frame::Reference;
use super::landing;
use super::pid::Pid;
use super::setpoint::{ControlMode, ModeChange};

// ---------------------------------------------------------------------------
// Translation controller: speed hold through the main throttle
// ---------------------------------------------------------------------------

/// Attitude error (degrees) above which vertical-hold thrust is cut.
const ALIGN_LIMIT_DEG: f64 = 2.0;
/// Relaxed limit close to the ground, where any upward thrust helps.
const ALIGN_LIMIT_LOW_DEG: f64 = 90.0;
const LOW_ALTITUDE: f64 = 1_000.0;

/// Horizontal-kill escalation: above this altitude a large horizontal speed
/// is cancelled with a full-throttle burn.
const ESCALATION_ALTITUDE: f64 = 5_000.0;

#[derive(Debug, Clone)]
pub struct TranslationController {
    pub pid: Pid,
    prev_throttle: f64,
}

impl TranslationController {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { pid: Pid::new(kp, ki, kd), prev_throttle: 0.0 }
    }

    pub fn prev_throttle(&self) -> f64 {
        self.prev_throttle
    }

    /// Landing state machine. Returns false once the landing is over.
    fn update_landing(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let s = ctx.snapshot;
        let Some(land) = ctx.guidance.throttle().landing else {
            return true;
        };
        if s.landed || s.splashed {
            tracing::info!(speed = s.speed_surface(), "touchdown");
            ctx.guidance.land_deactivate(None);
            return false;
        }
        ctx.guidance.set_mode(ControlMode::KeepVertical, None);
        ctx.guidance.set_kill_horizontal(true, None);
        let target = landing::descent_speed(s, land.touchdown_speed, &ctx.config.landing);
        ctx.guidance.set_speed_target(target, None);
        if landing::gear_due(s, &ctx.config.landing) {
            ctx.guidance.mark_gear_deployed();
        }
        true
    }

    /// Point the thrust so it also cancels horizontal surface speed.
    fn kill_horizontal(&mut self, ctx: &mut TickContext<'_>, vertical: f64) {
        let s = ctx.snapshot;
        let horizontal = s.horizontal_surface_velocity();
        let gee = s.surface_gee;
        let dir = -horizontal + s.up * vertical.abs().max(20.0 * gee);

        let pointing = if s.min_altitude() > ESCALATION_ALTITUDE
            && horizontal.norm() > vertical.abs().max(100.0 * gee) * 2.0
        {
            tracing::info!(horizontal = horizontal.norm(), "cancelling horizontal speed at full thrust");
            ctx.guidance.set_mode(ControlMode::Direct, None);
            ctx.guidance.set_speed_target(100.0, None);
            -horizontal
        } else if vertical > 0.0 {
            s.up
        } else {
            dir.normalize()
        };
        ctx.guidance.attitude_to(&pointing, Reference::Inertial, s, ctx.target, None);
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) {
        let s = ctx.snapshot;
        if !self.update_landing(ctx) {
            self.prev_throttle = 0.0;
            ctx.controls.throttle = 0.0;
            return;
        }

        let measured = match ctx.guidance.mode() {
            ControlMode::Off | ControlMode::Direct => 0.0,
            ControlMode::KeepOrbital => s.speed_orbital(),
            ControlMode::KeepSurface => s.speed_surface(),
            ControlMode::KeepVertical => {
                let vertical = s.speed_vertical();
                if ctx.guidance.throttle().kill_horizontal {
                    self.kill_horizontal(ctx, vertical);
                }
                vertical
            }
        };

        let target = ctx.guidance.throttle().speed_target;
        let err = (target - measured) / s.max_thrust_accel;
        if !err.is_finite() {
            // leave the PID state untouched
            tracing::warn!(max_thrust_accel = s.max_thrust_accel, "non-finite speed error");
            ctx.guidance.push_diagnostic(Diagnostic::NonFiniteThrottle);
            self.prev_throttle = 0.0;
            ctx.controls.throttle = 0.0;
            return;
        }
        let act = self.pid.update(err, s.dt);

        let mode = ctx.guidance.mode();
        let aligned = if ctx.guidance.attitude().is_active() {
            let off = ctx.guidance.angle_from_target(s, ctx.target);
            off < ALIGN_LIMIT_DEG || (s.min_altitude() < LOW_ALTITUDE && off < ALIGN_LIMIT_LOW_DEG)
        } else {
            true
        };

        let mut throttle = if mode != ControlMode::KeepVertical || aligned {
            match mode {
                ControlMode::Direct => (target / 100.0).clamp(0.0, 1.0),
                _ => (self.prev_throttle + act).clamp(0.0, 1.0),
            }
        } else if s.torque.thrust_pitch_yaw > s.torque.pitch_yaw * 10.0 {
            // engine gimbal is the main steering authority: keep some thrust
            0.1
        } else {
            0.0
        };

        if !throttle.is_finite() {
            tracing::warn!("non-finite throttle command");
            ctx.guidance.push_diagnostic(Diagnostic::NonFiniteThrottle);
            throttle = 0.0;
        }
        self.prev_throttle = throttle;
        ctx.controls.throttle = throttle;
    }
}

impl Behavior for TranslationController {
    fn on_tick(&mut self, ctx: &mut TickContext<'_>) {
        if ctx.snapshot.warp.current_rate > ctx.config.warp.max_physics_rate {
            return;
        }
        if ctx.guidance.mode() == ControlMode::Off || ctx.snapshot.thrust_available <= 0.0 {
            return;
        }
        self.update(ctx);
    }

    fn on_mode_changed(&mut self, change: &ModeChange) {
        tracing::debug!(from = ?change.from, to = ?change.to, "resetting translation PID");
        self.pid.reset();
    }

    fn reset(&mut self) {
        self.pid.reset();
        self.prev_throttle = 0.0;
    }

    fn name(&self) -> &'static str {
        "translation"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AutopilotConfig;
    use crate::gnc::guidance::Guidance;
    use crate::gnc::setpoint::AttitudeChange;
    use crate::vessel::{ControlState, SnapshotBuilder, VesselSnapshot};
    use nalgebra::Vector3;

    fn controller() -> TranslationController {
        let t = AutopilotConfig::default().translation;
        TranslationController::new(t.kp, t.ki, t.kd)
    }

    fn tick(ctrl: &mut TranslationController, g: &mut Guidance, s: &VesselSnapshot, controls: &mut ControlState) {
        let config = AutopilotConfig::default();
        let mut ctx = TickContext { snapshot: s, target: None, config: &config, guidance: g, controls, stress: 0.0 };
        ctrl.on_tick(&mut ctx);
    }

    #[test]
    fn direct_mode_is_a_percentage() {
        let s = SnapshotBuilder::new().build();
        let mut g = Guidance::new(&AutopilotConfig::default());
        g.set_mode(ControlMode::Direct, None);
        g.set_speed_target(40.0, None);
        let mut ctrl = controller();
        let mut controls = ControlState::default();
        tick(&mut ctrl, &mut g, &s, &mut controls);
        assert!((controls.throttle - 0.4).abs() < 1e-12);
    }

    #[test]
    fn too_slow_adds_throttle() {
        let s = SnapshotBuilder::new().build();
        let mut g = Guidance::new(&AutopilotConfig::default());
        g.set_mode(ControlMode::KeepOrbital, None);
        g.set_speed_target(s.speed_orbital() + 0.1, None);
        let mut ctrl = controller();
        let mut controls = ControlState::default();
        tick(&mut ctrl, &mut g, &s, &mut controls);
        let first = controls.throttle;
        assert!(first > 0.0);
        tick(&mut ctrl, &mut g, &s, &mut controls);
        assert!(controls.throttle > first, "throttle accumulates while the error persists");
    }

    #[test]
    fn off_and_no_thrust_do_nothing() {
        let mut g = Guidance::new(&AutopilotConfig::default());
        let mut ctrl = controller();
        let mut controls = ControlState { throttle: 0.3, ..Default::default() };
        tick(&mut ctrl, &mut g, &SnapshotBuilder::new().build(), &mut controls);
        assert_eq!(controls.throttle, 0.3);

        g.set_mode(ControlMode::KeepSurface, None);
        let dry = SnapshotBuilder::new().thrust(0.0, 0.0).build();
        tick(&mut ctrl, &mut g, &dry, &mut controls);
        assert_eq!(controls.throttle, 0.3);
    }

    #[test]
    fn mode_change_resets_only_translation_pid() {
        let mut ctrl = controller();
        ctrl.pid.update(1.0, 0.02);
        ctrl.on_attitude_changed(&AttitudeChange {
            old: Default::default(),
            new: Default::default(),
        });
        assert!(!ctrl.pid.is_reset(), "attitude changes leave the throttle loop alone");
        ctrl.on_mode_changed(&ModeChange { from: ControlMode::Off, to: ControlMode::KeepSurface });
        assert!(ctrl.pid.is_reset());
    }

    #[test]
    fn degenerate_thrust_accel_does_not_poison_the_loop() {
        let mut g = Guidance::new(&AutopilotConfig::default());
        g.set_mode(ControlMode::KeepOrbital, None);
        let bad = SnapshotBuilder::new().thrust(50_000.0, 0.0).build();
        g.set_speed_target(bad.speed_orbital() + 0.1, None);
        let mut ctrl = controller();
        let mut controls = ControlState::default();
        tick(&mut ctrl, &mut g, &bad, &mut controls);
        assert_eq!(controls.throttle, 0.0);
        assert!(ctrl.pid.is_reset());
        assert!(g.take_diagnostics().contains(&Diagnostic::NonFiniteThrottle));

        let good = SnapshotBuilder::new().build();
        tick(&mut ctrl, &mut g, &good, &mut controls);
        assert!(controls.throttle > 0.0);
        assert!(controls.throttle.is_finite());
    }

    #[test]
    fn landing_requests_gear_once_below_1000m() {
        let mut g = Guidance::new(&AutopilotConfig::default());
        g.land_activate(0.5, None);
        let mut ctrl = controller();
        let mut controls = ControlState::default();

        let high = SnapshotBuilder::new().altitude(1_200.0).orbital_velocity(Vector3::zeros()).build();
        tick(&mut ctrl, &mut g, &high, &mut controls);
        assert!(!g.take_gear_request());

        let low = SnapshotBuilder::new().altitude(990.0).orbital_velocity(Vector3::zeros()).build();
        tick(&mut ctrl, &mut g, &low, &mut controls);
        assert!(g.take_gear_request());
        tick(&mut ctrl, &mut g, &low, &mut controls);
        assert!(!g.take_gear_request(), "only raised once");
        assert!(g.throttle().speed_target < 0.0);
    }

    #[test]
    fn touchdown_ends_landing() {
        let mut g = Guidance::new(&AutopilotConfig::default());
        g.land_activate(0.5, None);
        let mut ctrl = controller();
        let mut controls = ControlState { throttle: 0.6, ..Default::default() };
        let s = SnapshotBuilder::new().altitude(0.0).orbital_velocity(Vector3::zeros()).landed(true).build();
        tick(&mut ctrl, &mut g, &s, &mut controls);
        assert_eq!(g.mode(), ControlMode::Off);
        assert!(!g.throttle().is_landing());
        assert_eq!(controls.throttle, 0.0);
    }

    #[test]
    fn misaligned_vertical_hold_cuts_thrust() {
        // nose points radially out; target points along +Y: 90° off, high up
        let s = SnapshotBuilder::new().altitude(20_000.0).orbital_velocity(Vector3::zeros()).build();
        let mut g = Guidance::new(&AutopilotConfig::default());
        g.set_mode(ControlMode::KeepVertical, None);
        g.set_speed_target(50.0, None);
        g.attitude_to(&Vector3::y(), Reference::Inertial, &s, None, None);
        let mut ctrl = controller();
        let mut controls = ControlState::default();
        tick(&mut ctrl, &mut g, &s, &mut controls);
        assert_eq!(controls.throttle, 0.0);
    }

    #[test]
    fn large_horizontal_speed_escalates_to_direct() {
        let s = SnapshotBuilder::new()
            .altitude(10_000.0)
            .surface_velocity(Vector3::new(0.0, 400.0, 0.0))
            .surface_gee(0.1)
            .build();
        let mut g = Guidance::new(&AutopilotConfig::default());
        g.set_mode(ControlMode::KeepVertical, None);
        g.set_kill_horizontal(true, None);
        let mut ctrl = controller();
        let mut controls = ControlState::default();
        tick(&mut ctrl, &mut g, &s, &mut controls);
        assert_eq!(g.mode(), ControlMode::Direct);
        assert_eq!(g.throttle().speed_target, 100.0);
        let fwd = g.attitude().target.forward();
        assert!((fwd - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-9);
    }
}
