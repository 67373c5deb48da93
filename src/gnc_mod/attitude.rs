use std::any::Any;
use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;

use crate::config::AttitudeConfig;
use crate::diagnostics::Diagnostic;

use super::controller::{Behavior, TickContext};
use super::frame::{self, Reference};
use super::pid::Pid;
use super::setpoint::{AttitudeChange, AttitudeTarget};

// ---------------------------------------------------------------------------
// Attitude controller: three PID loops on the rotation error
// ---------------------------------------------------------------------------

/// Holds the guidance attitude target by adding pitch/yaw/roll commands on top
/// of the pilot's input.
///
/// Loops are indexed in control order (pitch, yaw, roll), i.e. rotations
/// about the vessel's local X, Y and Z axes.
#[derive(Debug, Clone)]
pub struct AttitudeController {
    pub pids: [Pid; 3],
    last_act: Vector3<f64>,
}

impl AttitudeController {
    pub fn new(config: &AttitudeConfig) -> Self {
        let pid = Pid::new(config.kp, config.ki, config.kd);
        Self { pids: [pid.clone(), pid.clone(), pid], last_act: Vector3::zeros() }
    }

    /// Last computed command per axis, before clamping.
    pub fn last_act(&self) -> Vector3<f64> {
        self.last_act
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) {
        let s = ctx.snapshot;
        let cfg = &ctx.config.attitude;
        let target = ctx.guidance.attitude().target;

        let wanted = frame::resolve(target.reference, s, ctx.target) * target.rotation;
        let delta = s.rotation.inverse() * wanted;
        let (ex, ey, ez) = delta.euler_angles();
        let mut err = Vector3::new(wrap_pi(ex), wrap_pi(ey), wrap_pi(ez));

        // vessel axes are (pitch, roll, yaw); torque per vessel axis
        let throttle = ctx.controls.throttle;
        let py = s.torque.pitch_yaw + s.torque.thrust_pitch_yaw * throttle;
        let torque = Vector3::new(py, s.torque.roll, py);
        let moi = s.moment_of_inertia;
        let l = s.angular_momentum;

        // stopping-distance term: opposes the current spin
        let braking = Vector3::from_fn(|i, _| {
            sign0(l[i]) * cfg.decoupling_gain * l[i] * l[i] / (torque[i] * moi[i])
        });
        err -= reorder(&braking, cfg.axis_order);
        err.component_mul_assign(&reorder(&moi.component_div(&torque), cfg.axis_order));

        let mut act = Vector3::zeros();
        for (i, pid) in self.pids.iter_mut().enumerate() {
            act[i] = pid.update(err[i], s.dt);
        }
        self.last_act = act;

        let manual = ctx.controls.rotation_axes();
        let overridden = manual.map(|m| m.abs() > cfg.override_deadband);

        if overridden.iter().all(|&o| o) && ctx.guidance.kill_rotation() {
            // resume from wherever the pilot lets go
            ctx.guidance.attitude_to_rotation(s.rotation, Reference::Inertial, None);
        }
        let target = ctx.guidance.attitude().target;
        if overridden[2] && !target.roll_matters {
            let up = frame::world_to_reference(&s.top(), target.reference, s, ctx.target);
            if let Some(rotation) = frame::look_rotation(&target.forward(), &up) {
                ctx.guidance
                    .set_attitude(AttitudeTarget::new(target.reference, rotation, false), None);
            }
        }

        for axis in 0..3 {
            if overridden[axis] {
                self.pids[axis].reset();
                continue;
            }
            if !act[axis].is_finite() {
                tracing::warn!(axis, "non-finite attitude command");
                ctx.guidance.push_diagnostic(Diagnostic::NonFiniteAxis { axis });
                self.pids[axis].reset();
                continue;
            }
            ctx.controls.add_rotation(axis, act[axis]);
        }

        ctx.stress = act.iter().map(|a| if a.is_finite() { a.abs().min(1.0) } else { 0.0 }).sum();
    }
}

impl Behavior for AttitudeController {
    fn on_tick(&mut self, ctx: &mut TickContext<'_>) {
        if !ctx.guidance.attitude().is_active() {
            return;
        }
        if ctx.snapshot.warp.current_rate > ctx.config.warp.max_physics_rate {
            return;
        }
        self.update(ctx);
    }

    fn on_attitude_changed(&mut self, _change: &AttitudeChange) {
        tracing::debug!("resetting attitude PID");
        self.reset();
    }

    fn reset(&mut self) {
        for pid in &mut self.pids {
            pid.reset();
        }
        self.last_act = Vector3::zeros();
    }

    fn name(&self) -> &'static str {
        "attitude"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Map an angle to (-π, π].
pub fn wrap_pi(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a > PI { a - TAU } else { a }
}

/// Sign with sign0(0) = 0.
fn sign0(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Pick vessel-axis components into control order.
fn reorder(v: &Vector3<f64>, order: [usize; 3]) -> Vector3<f64> {
    Vector3::new(v[order[0]], v[order[1]], v[order[2]])
}
