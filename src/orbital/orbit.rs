use std::f64::consts::TAU;
use std::fmt;

use nalgebra::Vector3;

/// Queries the guidance core needs from an orbit.
///
/// All times are seconds from the snapshot instant, all angles radians.
/// Implementations describe the orbit as it is *now*: the host rebuilds them
/// every tick, so "time to anomaly" is always relative to the current position.
pub trait Orbit: fmt::Debug + Send + Sync {
    /// Orbital period, s.
    fn period(&self) -> f64;

    /// Inclination against the reference plane, rad.
    fn inclination(&self) -> f64;

    /// Unit orbit normal (direction of specific angular momentum).
    fn normal(&self) -> Vector3<f64>;

    /// Time until the body reaches `true_anomaly`, in `[0, period)`.
    fn time_to_true_anomaly(&self, true_anomaly: f64) -> f64;

    /// Unit direction from the focus to the point at `true_anomaly`.
    fn direction_at(&self, true_anomaly: f64) -> Vector3<f64>;

    /// True anomaly of the point whose direction from the focus is `direction`
    /// once projected onto this orbit's plane, in `[0, 2π)`.
    fn true_anomaly_of(&self, direction: &Vector3<f64>) -> f64;

    /// Orbital speed `dt` seconds from now, m/s.
    fn speed_after(&self, dt: f64) -> f64;

    /// Maps a true anomaly on this orbit to the true anomaly on `onto` that
    /// lies in the same direction from the focus.
    fn translate_anomaly(&self, onto: &dyn Orbit, true_anomaly: f64) -> f64 {
        onto.true_anomaly_of(&self.direction_at(true_anomaly))
    }

    /// Time until this orbit crosses the plane of `other` going "north"
    /// (towards `other`'s normal). Infinite when the planes coincide.
    fn time_to_relative_ascending_node(&self, other: &dyn Orbit) -> f64 {
        match relative_node(self.normal(), other.normal()) {
            Some(node) => self.time_to_true_anomaly(self.true_anomaly_of(&node)),
            None => f64::INFINITY,
        }
    }

    /// Time until this orbit crosses the plane of `other` going "south".
    fn time_to_relative_descending_node(&self, other: &dyn Orbit) -> f64 {
        match relative_node(self.normal(), other.normal()) {
            Some(node) => self.time_to_true_anomaly(self.true_anomaly_of(&(-node))),
            None => f64::INFINITY,
        }
    }
}

/// Line of nodes pointing at the ascending crossing of `own` through `other`.
fn relative_node(own: Vector3<f64>, other: Vector3<f64>) -> Option<Vector3<f64>> {
    other.cross(&own).try_normalize(1e-12)
}

/// Wraps an angle into `[0, 2π)`.
pub fn wrap_two_pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}
