use nalgebra::Vector3;

use crate::vessel::{TargetCandidate, VesselSnapshot};

use super::target;

// ---------------------------------------------------------------------------
// Proximity aids on the RCS translation axes
// ---------------------------------------------------------------------------

/// Relative speed below which kill-relative-velocity lets go, m/s.
pub const KILL_DONE_SPEED: f64 = 0.1;
/// Per-axis distance below which home-on-offset holds that axis, m.
const HOME_DEADBAND: f64 = 0.01;

/// Translation axes for this tick, vessel-local and clamped to [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslationCommand {
    pub axes: Vector3<f64>,
    /// The aid has finished and should be switched off after this tick.
    pub done: bool,
}

/// Closing speed to aim for at `distance` metres from the target.
pub fn approach_speed(distance: f64) -> f64 {
    match distance {
        d if d < 2.0 => 0.1,
        d if d < 10.0 => 0.3,
        d if d < 50.0 => 0.5,
        d if d < 150.0 => 1.0,
        _ => 3.0,
    }
}

/// Ship velocity relative to the target in vessel-local axes.
pub fn local_relative_velocity(snapshot: &VesselSnapshot, target: &TargetCandidate) -> Vector3<f64> {
    snapshot.to_local(&target::relative_velocity(snapshot, target))
}

/// Null the relative velocity with the translation thrusters.
///
/// The command is still applied on the tick the residual drops under
/// [`KILL_DONE_SPEED`].
pub fn kill_relative_velocity(snapshot: &VesselSnapshot, target: &TargetCandidate, gain: f64) -> TranslationCommand {
    let rel = local_relative_velocity(snapshot, target);
    TranslationCommand { axes: clamp_axes(-rel * gain), done: rel.norm() < KILL_DONE_SPEED }
}

/// Drift towards `offset` (target-local metres) at a speed set by the
/// distance to the target.
pub fn home_on_offset(
    snapshot: &VesselSnapshot,
    target: &TargetCandidate,
    offset: &Vector3<f64>,
    gain: f64,
) -> TranslationCommand {
    let goal = target.position + target.rotation * offset;
    let to_goal = snapshot.to_local(&(goal - snapshot.com));
    let speed = approach_speed(target::distance(snapshot, target));
    let goal_velocity = to_goal.map(|p| if p.abs() > HOME_DEADBAND { p.signum() * speed } else { 0.0 });

    let rel = local_relative_velocity(snapshot, target);
    TranslationCommand { axes: clamp_axes((goal_velocity - rel) * gain), done: false }
}

fn clamp_axes(v: Vector3<f64>) -> Vector3<f64> {
    v.map(|a| a.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbital::KeplerianElements;
    use crate::vessel::{SnapshotBuilder, TargetKind};
    use approx::assert_abs_diff_eq;
    use nalgebra::UnitQuaternion;
    use std::sync::Arc;

    fn station(position: Vector3<f64>, velocity: Vector3<f64>) -> TargetCandidate {
        TargetCandidate {
            id: 9,
            name: "station".into(),
            kind: TargetKind::Vessel,
            position,
            velocity,
            rotation: UnitQuaternion::identity(),
            orbit: Arc::new(KeplerianElements::circular(700_000.0, 0.0, 3.531_6e12)),
            landed: false,
            same_body: true,
        }
    }

    #[test]
    fn bands() {
        assert_eq!(approach_speed(1.0), 0.1);
        assert_eq!(approach_speed(2.0), 0.3);
        assert_eq!(approach_speed(49.9), 0.5);
        assert_eq!(approach_speed(100.0), 1.0);
        assert_eq!(approach_speed(150.0), 3.0);
        assert_eq!(approach_speed(10_000.0), 3.0);
    }

    #[test]
    fn kill_disengages_the_tick_it_is_slow_enough() {
        let s = SnapshotBuilder::new().build();
        let drift = s.rotation * Vector3::new(0.05, 0.0, 0.0);
        let t = station(s.com + Vector3::new(0.0, 50.0, 0.0), s.orbital_velocity - drift);
        let cmd = kill_relative_velocity(&s, &t, 8.0);
        assert!(cmd.done);
        assert_abs_diff_eq!(cmd.axes, Vector3::new(-0.4, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn kill_saturates_and_keeps_going() {
        let s = SnapshotBuilder::new().build();
        let drift = s.rotation * Vector3::new(0.0, -2.0, 0.0);
        let t = station(s.com, s.orbital_velocity - drift);
        let cmd = kill_relative_velocity(&s, &t, 8.0);
        assert!(!cmd.done);
        assert_abs_diff_eq!(cmd.axes, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn home_moves_towards_the_offset_point() {
        let s = SnapshotBuilder::new().build();
        // goal 30 m ahead of the nose and level on the other axes
        let nose = s.forward();
        let t = station(s.com + nose * 30.0, s.orbital_velocity);
        let cmd = home_on_offset(&s, &t, &Vector3::zeros(), 8.0);
        assert!(!cmd.done);
        assert_abs_diff_eq!(cmd.axes, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-9);

        // already closing at the band speed: nothing more to do on z
        let t = station(s.com + nose * 30.0, s.orbital_velocity - nose * 0.5);
        let cmd = home_on_offset(&s, &t, &Vector3::zeros(), 8.0);
        assert_abs_diff_eq!(cmd.axes, Vector3::zeros(), epsilon = 1e-9);
    }
}
