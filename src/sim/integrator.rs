use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::vessel::ControlState;

use super::runner::{Lander, LanderState, SimConfig};

/// Standard gravity for Isp → mass flow, m/s^2.
pub const G0: f64 = 9.806_65;

/// Time derivatives of a [`LanderState`].
#[derive(Debug, Clone, Copy)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
    pub dquat: Quaternion<f64>,
    pub domega: Vector3<f64>,
    pub dmass: f64,
}

impl LanderState {
    fn apply(&self, d: &Deriv, dt: f64) -> Self {
        Self {
            time: self.time + dt,
            pos: self.pos + d.dpos * dt,
            vel: self.vel + d.dvel * dt,
            quat: UnitQuaternion::new_normalize(self.quat.quaternion() + d.dquat * dt),
            omega: self.omega + d.domega * dt,
            mass: self.mass + d.dmass * dt,
        }
    }
}

/// Point-mass gravity plus main-engine thrust along the nose, and rigid-body
/// rotation from the reaction wheels.
pub fn derivatives(state: &LanderState, lander: &Lander, config: &SimConfig, cmd: &ControlState) -> Deriv {
    let r = state.pos.norm();
    let gravity = -state.pos * config.body_mu / (r * r * r);

    let thrust = if state.mass > lander.dry_mass { cmd.throttle.clamp(0.0, 1.0) * lander.thrust } else { 0.0 };
    let nose = state.quat * Vector3::z();
    let accel = gravity + nose * (thrust / state.mass);

    // pitch, yaw, roll act about local X, Y, Z
    let torque = Vector3::new(
        cmd.pitch.clamp(-1.0, 1.0) * lander.torque_pitch_yaw,
        cmd.yaw.clamp(-1.0, 1.0) * lander.torque_pitch_yaw,
        cmd.roll.clamp(-1.0, 1.0) * lander.torque_roll,
    );
    let inertia = lander.inertia;
    let h = inertia.component_mul(&state.omega);
    let domega = (torque - state.omega.cross(&h)).component_div(&inertia);

    let omega_q = Quaternion::from_imag(state.omega);
    let dquat = state.quat.quaternion() * omega_q * 0.5;

    Deriv { dpos: state.vel, dvel: accel, dquat, domega, dmass: -thrust / (lander.isp * G0) }
}

/// Single RK4 step with the control command held constant over the step.
pub fn rk4_step(state: &LanderState, lander: &Lander, config: &SimConfig, cmd: &ControlState, dt: f64) -> LanderState {
    let k1 = derivatives(state, lander, config, cmd);
    let k2 = derivatives(&state.apply(&k1, dt * 0.5), lander, config, cmd);
    let k3 = derivatives(&state.apply(&k2, dt * 0.5), lander, config, cmd);
    let k4 = derivatives(&state.apply(&k3, dt), lander, config, cmd);

    let new_quat_raw = state.quat.quaternion()
        + (k1.dquat + k2.dquat * 2.0 + k3.dquat * 2.0 + k4.dquat) * (dt / 6.0);

    LanderState {
        time: state.time + dt,
        pos: state.pos + (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) * (dt / 6.0),
        vel: state.vel + (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) * (dt / 6.0),
        quat: UnitQuaternion::new_normalize(new_quat_raw),
        omega: state.omega + (k1.domega + 2.0 * k2.domega + 2.0 * k3.domega + k4.domega) * (dt / 6.0),
        mass: (state.mass + (k1.dmass + 2.0 * k2.dmass + 2.0 * k3.dmass + k4.dmass) * (dt / 6.0))
            .max(lander.dry_mass),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_rest(altitude: f64) -> (Lander, SimConfig, LanderState) {
        let lander = Lander::default();
        let config = SimConfig::default();
        let state = LanderState::upright(&lander, &config, altitude, 0.0, 0.0);
        (lander, config, state)
    }

    #[test]
    fn free_fall_matches_surface_gravity() {
        let (lander, config, state) = at_rest(1_000.0);
        let next = rk4_step(&state, &lander, &config, &ControlState::default(), 1.0);
        let g = config.body_mu / (config.body_radius + 1_000.0).powi(2);
        let dv = (next.vel - state.vel).norm();
        assert!((dv - g).abs() < 1e-3 * g, "dv {dv}, g {g}");
        assert_eq!(next.mass, state.mass);
    }

    #[test]
    fn full_throttle_burns_propellant() {
        let (lander, config, state) = at_rest(1_000.0);
        let cmd = ControlState { throttle: 1.0, ..Default::default() };
        let next = rk4_step(&state, &lander, &config, &cmd, 1.0);
        let mdot = lander.thrust / (lander.isp * G0);
        assert!((state.mass - next.mass - mdot).abs() < 1e-9);
    }

    #[test]
    fn pitch_torque_spins_about_local_x() {
        let (lander, config, state) = at_rest(1_000.0);
        let cmd = ControlState { pitch: 1.0, ..Default::default() };
        let next = rk4_step(&state, &lander, &config, &cmd, 0.1);
        assert!(next.omega.x > 0.0);
        assert!(next.omega.y.abs() < 1e-12 && next.omega.z.abs() < 1e-12);
        assert!((next.quat.quaternion().norm() - 1.0).abs() < 1e-12);
    }
}
