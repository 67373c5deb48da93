use crate::config::LandingConfig;
use crate::vessel::VesselSnapshot;

// ---------------------------------------------------------------------------
// Powered-landing descent profile
// ---------------------------------------------------------------------------

/// Vertical speed to hold during a powered landing, m/s (negative = down).
///
/// Above the flare altitude the profile is half the speed from which full
/// thrust could stop the vessel at the surface. Below it the speed tapers
/// linearly to zero at the surface and is floored at `-touchdown_speed`.
pub fn descent_speed(snapshot: &VesselSnapshot, touchdown_speed: f64, config: &LandingConfig) -> f64 {
    let net_accel = snapshot.max_thrust_accel - snapshot.gravity;
    let mut altitude = snapshot.min_altitude();

    let mut target = if net_accel < 0.0 { 0.0 } else { -(2.0 * net_accel * altitude).sqrt() * 0.5 };

    if altitude < config.flare_altitude {
        altitude = altitude.min(snapshot.altitude_bottom);
        let flare_speed = (2.0 * net_accel.max(0.0) * config.flare_altitude).sqrt() * 0.5;
        target = -lerp(0.0, flare_speed, altitude / config.flare_altitude);
        target = target.min(-touchdown_speed);
    }
    target
}

/// True once the vessel is low enough that the gear should be down.
pub fn gear_due(snapshot: &VesselSnapshot, config: &LandingConfig) -> bool {
    snapshot.min_altitude() < config.gear_altitude
}

/// Linear interpolation with `t` clamped to [0, 1].
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t.clamp(0.0, 1.0)
}
