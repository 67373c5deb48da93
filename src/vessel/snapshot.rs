use std::sync::Arc;

use nalgebra::{UnitQuaternion, Vector3};

use crate::orbital::{KeplerianElements, Orbit};

// ---------------------------------------------------------------------------
// Per-tick telemetry consumed by the guidance core
// ---------------------------------------------------------------------------

pub type VesselId = u64;

/// Reaction and thrust-vectoring torque the vessel can produce, N·m.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TorqueAvailable {
    pub pitch_yaw: f64,
    pub roll: f64,
    pub thrust_pitch_yaw: f64, // at full throttle
}

/// Host time-acceleration status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpStatus {
    pub rate_index: usize,
    pub current_rate: f64, // actual rate, lags the index while a change settles
}

impl Default for WarpStatus {
    fn default() -> Self {
        Self { rate_index: 0, current_rate: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Vessel,
    Body,
}

/// Something the vessel can target: another vessel or a celestial body.
#[derive(Debug, Clone)]
pub struct TargetCandidate {
    pub id: VesselId,
    pub name: String,
    pub kind: TargetKind,
    pub position: Vector3<f64>,       // world, centre of mass
    pub velocity: Vector3<f64>,       // world, orbital
    pub rotation: UnitQuaternion<f64>, // local → world, same axes as the vessel
    pub orbit: Arc<dyn Orbit>,
    pub landed: bool,
    pub same_body: bool, // orbits the same body as the vessel
}

impl TargetCandidate {
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * Vector3::z()
    }

    pub fn top(&self) -> Vector3<f64> {
        self.rotation * Vector3::y()
    }
}

/// Immutable vessel state for one physics tick.
///
/// Frames: world is inertial. The vessel's local frame has +Z along the nose
/// (thrust direction) and +Y towards the "top" of the craft. Per-axis inertial
/// quantities (`angular_momentum`, `moment_of_inertia`) are given in the host's
/// vessel-axis order: x = pitch, y = roll, z = yaw.
#[derive(Debug, Clone)]
pub struct VesselSnapshot {
    pub id: VesselId,
    pub time: f64, // s
    pub dt: f64,   // fixed physics step, s

    pub com: Vector3<f64>,           // world
    pub body_position: Vector3<f64>, // centre of the orbited body, world
    pub body_radius: f64,            // m
    pub atmosphere_top: f64,         // m ASL, 0 for airless bodies
    pub up: Vector3<f64>,            // unit local vertical

    pub rotation: UnitQuaternion<f64>,         // vessel local → world
    pub surface_rotation: UnitQuaternion<f64>, // north/up/east frame → world
    pub orbital_velocity: Vector3<f64>,        // m/s
    pub surface_velocity: Vector3<f64>,        // m/s, relative to the rotating surface

    pub angular_momentum: Vector3<f64>,  // vessel axes (pitch, roll, yaw)
    pub moment_of_inertia: Vector3<f64>, // vessel axes (pitch, roll, yaw)
    pub torque: TorqueAvailable,

    pub mass: f64,             // kg
    pub thrust_available: f64, // N
    pub max_thrust_accel: f64, // m/s^2
    pub gravity: f64,          // local gravity magnitude, m/s^2
    pub surface_gee: f64,      // body surface gravity in standard g

    pub altitude_asl: f64,
    pub altitude_true: f64,   // above terrain
    pub altitude_bottom: f64, // lowest point of the vessel above terrain
    pub landed: bool,
    pub splashed: bool,

    pub orbit: Arc<dyn Orbit>,
    pub warp: WarpStatus,
    pub candidates: Vec<TargetCandidate>,
}

impl VesselSnapshot {
    /// Nose direction, world.
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * Vector3::z()
    }

    /// Top direction, world.
    pub fn top(&self) -> Vector3<f64> {
        self.rotation * Vector3::y()
    }

    pub fn speed_orbital(&self) -> f64 {
        self.orbital_velocity.norm()
    }

    pub fn speed_surface(&self) -> f64 {
        self.surface_velocity.norm()
    }

    pub fn speed_vertical(&self) -> f64 {
        self.surface_velocity.dot(&self.up)
    }

    /// Surface velocity with the vertical component removed.
    pub fn horizontal_surface_velocity(&self) -> Vector3<f64> {
        self.surface_velocity - self.up * self.speed_vertical()
    }

    /// The lower of sea-level and terrain altitude.
    pub fn min_altitude(&self) -> f64 {
        self.altitude_asl.min(self.altitude_true)
    }

    /// Altitude from the current centre of mass, without any averaging.
    pub fn instant_altitude(&self) -> f64 {
        (self.com - self.body_position).norm() - self.body_radius
    }

    /// World vector expressed in vessel-local axes.
    pub fn to_local(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(world)
    }

    pub fn candidate(&self, id: VesselId) -> Option<&TargetCandidate> {
        self.candidates.iter().find(|c| c.id == id)
    }
}

// ---------------------------------------------------------------------------
// Snapshot builder
// ---------------------------------------------------------------------------

/// Builds snapshots for tests and the simulation runner. Quantities that can
/// be derived (up vector, altitudes, orbit) are derived unless set explicitly.
pub struct SnapshotBuilder {
    id: VesselId,
    time: f64,
    dt: f64,
    com: Vector3<f64>,
    body_position: Vector3<f64>,
    body_radius: f64,
    body_mu: f64,
    atmosphere_top: f64,
    rotation: Option<UnitQuaternion<f64>>,
    surface_rotation: UnitQuaternion<f64>,
    orbital_velocity: Vector3<f64>,
    surface_velocity: Option<Vector3<f64>>,
    angular_momentum: Vector3<f64>,
    moment_of_inertia: Vector3<f64>,
    torque: TorqueAvailable,
    mass: f64,
    thrust_available: f64,
    max_thrust_accel: f64,
    surface_gee: f64,
    altitude_true: Option<f64>,
    altitude_bottom: Option<f64>,
    landed: bool,
    splashed: bool,
    orbit: Option<Arc<dyn Orbit>>,
    warp: WarpStatus,
    candidates: Vec<TargetCandidate>,
}

impl SnapshotBuilder {
    /// Kerbin-sized body, vessel 100 km up on a circular equatorial orbit,
    /// nose pointing radially out.
    pub fn new() -> Self {
        let body_radius = 600_000.0;
        let body_mu = 3.531_6e12;
        let r = body_radius + 100_000.0;
        Self {
            id: 1,
            time: 0.0,
            dt: 0.02,
            com: Vector3::new(r, 0.0, 0.0),
            body_position: Vector3::zeros(),
            body_radius,
            body_mu,
            atmosphere_top: 70_000.0,
            rotation: None,
            surface_rotation: UnitQuaternion::identity(),
            orbital_velocity: Vector3::new(0.0, (body_mu / r).sqrt(), 0.0),
            surface_velocity: None,
            angular_momentum: Vector3::zeros(),
            moment_of_inertia: Vector3::new(10.0, 5.0, 10.0),
            torque: TorqueAvailable { pitch_yaw: 20.0, roll: 20.0, thrust_pitch_yaw: 0.0 },
            mass: 5_000.0,
            thrust_available: 100_000.0,
            max_thrust_accel: 20.0,
            surface_gee: 1.0,
            altitude_true: None,
            altitude_bottom: None,
            landed: false,
            splashed: false,
            orbit: None,
            warp: WarpStatus::default(),
            candidates: vec![],
        }
    }

    pub fn id(mut self, v: VesselId) -> Self { self.id = v; self }
    pub fn time(mut self, v: f64) -> Self { self.time = v; self }
    pub fn dt(mut self, v: f64) -> Self { self.dt = v; self }
    pub fn com(mut self, v: Vector3<f64>) -> Self { self.com = v; self }
    pub fn body(mut self, position: Vector3<f64>, radius: f64, mu: f64) -> Self {
        self.body_position = position;
        self.body_radius = radius;
        self.body_mu = mu;
        self
    }
    pub fn atmosphere_top(mut self, v: f64) -> Self { self.atmosphere_top = v; self }
    pub fn rotation(mut self, v: UnitQuaternion<f64>) -> Self { self.rotation = Some(v); self }
    pub fn surface_rotation(mut self, v: UnitQuaternion<f64>) -> Self { self.surface_rotation = v; self }
    pub fn orbital_velocity(mut self, v: Vector3<f64>) -> Self { self.orbital_velocity = v; self }
    pub fn surface_velocity(mut self, v: Vector3<f64>) -> Self { self.surface_velocity = Some(v); self }
    pub fn angular_momentum(mut self, v: Vector3<f64>) -> Self { self.angular_momentum = v; self }
    pub fn moment_of_inertia(mut self, v: Vector3<f64>) -> Self { self.moment_of_inertia = v; self }
    pub fn torque(mut self, v: TorqueAvailable) -> Self { self.torque = v; self }
    pub fn mass(mut self, v: f64) -> Self { self.mass = v; self }
    pub fn thrust(mut self, thrust_available: f64, max_thrust_accel: f64) -> Self {
        self.thrust_available = thrust_available;
        self.max_thrust_accel = max_thrust_accel;
        self
    }
    pub fn surface_gee(mut self, v: f64) -> Self { self.surface_gee = v; self }
    pub fn altitude_true(mut self, v: f64) -> Self { self.altitude_true = Some(v); self }
    pub fn altitude_bottom(mut self, v: f64) -> Self { self.altitude_bottom = Some(v); self }
    pub fn landed(mut self, v: bool) -> Self { self.landed = v; self }
    pub fn splashed(mut self, v: bool) -> Self { self.splashed = v; self }
    pub fn orbit(mut self, v: Arc<dyn Orbit>) -> Self { self.orbit = Some(v); self }
    pub fn warp(mut self, v: WarpStatus) -> Self { self.warp = v; self }
    pub fn candidate(mut self, v: TargetCandidate) -> Self { self.candidates.push(v); self }

    /// Place the vessel at `altitude` above the body along +X.
    pub fn altitude(mut self, altitude: f64) -> Self {
        self.com = self.body_position + Vector3::x() * (self.body_radius + altitude);
        self
    }

    pub fn build(self) -> VesselSnapshot {
        let radial = self.com - self.body_position;
        let r = radial.norm();
        let up = radial.try_normalize(1e-9).unwrap_or_else(Vector3::z);
        let altitude_asl = r - self.body_radius;
        let g = if r > 0.0 { self.body_mu / (r * r) } else { 0.0 };

        let rotation = self.rotation.unwrap_or_else(|| {
            crate::gnc::frame::look_rotation(&up, &Vector3::z()).unwrap_or_else(UnitQuaternion::identity)
        });
        let orbit = self.orbit.unwrap_or_else(|| {
            Arc::new(KeplerianElements::from_state_vector(&radial, &self.orbital_velocity, self.body_mu))
        });
        let altitude_true = self.altitude_true.unwrap_or(altitude_asl);

        VesselSnapshot {
            id: self.id,
            time: self.time,
            dt: self.dt,
            com: self.com,
            body_position: self.body_position,
            body_radius: self.body_radius,
            atmosphere_top: self.atmosphere_top,
            up,
            rotation,
            surface_rotation: self.surface_rotation,
            orbital_velocity: self.orbital_velocity,
            surface_velocity: self.surface_velocity.unwrap_or(self.orbital_velocity),
            angular_momentum: self.angular_momentum,
            moment_of_inertia: self.moment_of_inertia,
            torque: self.torque,
            mass: self.mass,
            thrust_available: self.thrust_available,
            max_thrust_accel: self.max_thrust_accel,
            gravity: g,
            surface_gee: self.surface_gee,
            altitude_asl,
            altitude_true,
            altitude_bottom: self.altitude_bottom.unwrap_or(altitude_true),
            landed: self.landed,
            splashed: self.splashed,
            orbit,
            warp: self.warp,
            candidates: self.candidates,
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_consistent() {
        let s = SnapshotBuilder::new().build();
        assert!((s.altitude_asl - 100_000.0).abs() < 1e-6);
        assert!((s.up - Vector3::x()).norm() < 1e-12);
        assert!((s.forward() - s.up).norm() < 1e-9, "nose should point radially out");
        assert!(s.speed_vertical().abs() < 1e-9);
        assert!((s.orbit.period() - 2.0 * std::f64::consts::PI * (700_000.0_f64.powi(3) / 3.531_6e12).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn horizontal_velocity_drops_vertical_part() {
        let s = SnapshotBuilder::new()
            .surface_velocity(Vector3::new(-7.0, 3.0, 4.0))
            .build();
        assert!((s.speed_vertical() + 7.0).abs() < 1e-12);
        let h = s.horizontal_surface_velocity();
        assert!((h - Vector3::new(0.0, 3.0, 4.0)).norm() < 1e-12);
    }
}
