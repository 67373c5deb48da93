use nalgebra::{UnitQuaternion, Vector3};

use crate::autopilot::Autopilot;
use crate::gnc::frame::look_rotation;
use crate::gnc::setpoint::ControlMode;
use crate::vessel::{ControlState, SnapshotBuilder, TorqueAvailable, VesselSnapshot};

use super::event::{EventKind, SimEvent};
use super::integrator::{rk4_step, G0};

// ---------------------------------------------------------------------------
// Vehicle, body and state
// ---------------------------------------------------------------------------

/// A single-engine lander with reaction wheels.
#[derive(Debug, Clone)]
pub struct Lander {
    pub name: String,
    pub dry_mass: f64,          // kg
    pub propellant_mass: f64,   // kg
    pub thrust: f64,            // N, vacuum
    pub isp: f64,               // s
    pub inertia: Vector3<f64>,  // kg*m^2 about local X, Y, Z
    pub torque_pitch_yaw: f64,  // N*m
    pub torque_roll: f64,       // N*m
}

impl Default for Lander {
    fn default() -> Self {
        Self {
            name: "Lander".into(),
            dry_mass: 2_000.0,
            propellant_mass: 3_000.0,
            thrust: 100_000.0,
            isp: 300.0,
            inertia: Vector3::new(4_000.0, 4_000.0, 2_000.0),
            torque_pitch_yaw: 8_000.0,
            torque_roll: 4_000.0,
        }
    }
}

impl Lander {
    pub fn total_mass(&self) -> f64 {
        self.dry_mass + self.propellant_mass
    }

    /// Ideal delta-v from the rocket equation, m/s.
    pub fn delta_v(&self) -> f64 {
        self.isp * G0 * (self.total_mass() / self.dry_mass).ln()
    }
}

/// Body and stepping parameters.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub dt: f64,          // s
    pub max_time: f64,    // s
    pub body_radius: f64, // m
    pub body_mu: f64,     // m^3/s^2
}

impl Default for SimConfig {
    fn default() -> Self {
        // Kerbin
        Self { dt: 0.02, max_time: 300.0, body_radius: 600_000.0, body_mu: 3.531_6e12 }
    }
}

impl SimConfig {
    pub fn surface_gee(&self) -> f64 {
        self.body_mu / (self.body_radius * self.body_radius) / G0
    }
}

/// Lander kinematics. The body sits at the origin; `omega` is in local axes.
#[derive(Debug, Clone)]
pub struct LanderState {
    pub time: f64,
    pub pos: Vector3<f64>,
    pub vel: Vector3<f64>,
    pub quat: UnitQuaternion<f64>,
    pub omega: Vector3<f64>,
    pub mass: f64,
}

impl LanderState {
    /// Fully fuelled, nose up, over the +X point of the body.
    pub fn upright(lander: &Lander, config: &SimConfig, altitude: f64, vertical_speed: f64, horizontal_speed: f64) -> Self {
        let up = Vector3::x();
        Self {
            time: 0.0,
            pos: up * (config.body_radius + altitude),
            vel: up * vertical_speed + Vector3::y() * horizontal_speed,
            quat: look_rotation(&up, &Vector3::z()).unwrap_or_else(UnitQuaternion::identity),
            omega: Vector3::zeros(),
            mass: lander.total_mass(),
        }
    }

    pub fn altitude(&self, config: &SimConfig) -> f64 {
        self.pos.norm() - config.body_radius
    }

    pub fn vertical_speed(&self) -> f64 {
        self.vel.dot(&self.pos.normalize())
    }

    pub fn horizontal_speed(&self) -> f64 {
        let up = self.pos.normalize();
        (self.vel - up * self.vel.dot(&up)).norm()
    }
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// What the host would report for this state.
pub fn snapshot(state: &LanderState, lander: &Lander, config: &SimConfig, id: u64, landed: bool) -> VesselSnapshot {
    let omega = state.omega;
    let inertia = lander.inertia;
    let momentum = inertia.component_mul(&omega);
    let has_propellant = state.mass > lander.dry_mass;
    let thrust = if has_propellant { lander.thrust } else { 0.0 };

    SnapshotBuilder::new()
        .id(id)
        .time(state.time)
        .dt(config.dt)
        .body(Vector3::zeros(), config.body_radius, config.body_mu)
        .atmosphere_top(0.0)
        .com(state.pos)
        .rotation(state.quat)
        .orbital_velocity(state.vel)
        .surface_velocity(state.vel)
        // vessel axis order is (pitch, roll, yaw) = local (X, Z, Y)
        .angular_momentum(Vector3::new(momentum.x, momentum.z, momentum.y))
        .moment_of_inertia(Vector3::new(inertia.x, inertia.z, inertia.y))
        .torque(TorqueAvailable { pitch_yaw: lander.torque_pitch_yaw, roll: lander.torque_roll, thrust_pitch_yaw: 0.0 })
        .mass(state.mass)
        .thrust(thrust, thrust / state.mass)
        .surface_gee(config.surface_gee())
        .landed(landed)
        .build()
}

// ---------------------------------------------------------------------------
// Closed-loop landing
// ---------------------------------------------------------------------------

/// One tick of flight data.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub altitude: f64,
    pub vertical_speed: f64,
    pub horizontal_speed: f64,
    pub throttle: f64,
    pub speed_target: f64,
    pub mass: f64,
    pub mode: ControlMode,
}

#[derive(Debug, Clone, Default)]
pub struct FlightLog {
    pub samples: Vec<Sample>,
    pub events: Vec<SimEvent>,
}

impl FlightLog {
    pub fn touchdown_speed(&self) -> Option<f64> {
        self.events.iter().find_map(|e| match e.kind {
            EventKind::Touchdown { speed } => Some(speed),
            _ => None,
        })
    }

    pub fn gear_deployed(&self) -> bool {
        self.events.iter().any(|e| e.kind == EventKind::GearDeployed)
    }

    fn push(&mut self, state: &LanderState, config: &SimConfig, kind: EventKind) {
        tracing::debug!(t = state.time, event = %kind, "sim event");
        self.events.push(SimEvent { time: state.time, altitude: state.altitude(config), kind });
    }
}

/// Fly a powered landing from `start` with the autopilot in the loop until
/// touchdown or `max_time`.
pub fn simulate_landing(lander: &Lander, config: &SimConfig, start: LanderState, autopilot: &mut Autopilot) -> FlightLog {
    let id = autopilot.vessel();
    let touchdown_speed = autopilot.config().landing.touchdown_speed;
    let mut state = start;
    let mut log = FlightLog::default();

    let cap = ((config.max_time / config.dt) as usize + 1).min(200_000);
    log.samples.reserve(cap);

    autopilot.guidance_mut().land_activate(touchdown_speed, None);
    log.push(&state, config, EventKind::LandingEngaged);

    while state.time < config.max_time {
        let snap = snapshot(&state, lander, config, id, false);
        let mut controls = ControlState::default();
        let report = autopilot.tick(&snap, &mut controls);

        if report.deploy_gear {
            log.push(&state, config, EventKind::GearDeployed);
        }
        for d in report.diagnostics {
            log.push(&state, config, EventKind::Diagnostic(d));
        }
        log.samples.push(Sample {
            time: state.time,
            altitude: state.altitude(config),
            vertical_speed: state.vertical_speed(),
            horizontal_speed: state.horizontal_speed(),
            throttle: controls.throttle,
            speed_target: autopilot.guidance().throttle().speed_target,
            mass: state.mass,
            mode: autopilot.guidance().mode(),
        });

        let next = rk4_step(&state, lander, config, &controls, config.dt);

        // Ground contact
        if next.altitude(config) <= 0.0 {
            let speed = next.vel.norm();
            let up = next.pos.normalize();
            state = LanderState { pos: up * config.body_radius, vel: Vector3::zeros(), omega: Vector3::zeros(), ..next };
            log.push(&state, config, EventKind::Touchdown { speed });

            // one more tick so the autopilot sees the contact
            let snap = snapshot(&state, lander, config, id, true);
            autopilot.tick(&snap, &mut ControlState::default());
            break;
        }
        state = next;
    }

    log
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
