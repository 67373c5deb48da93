use nalgebra::{UnitQuaternion, Vector3};

use orbit_autopilot::gnc::{ControlMode, Reference};
use orbit_autopilot::sim::{self, Lander, LanderState, SimConfig};
use orbit_autopilot::vessel::ControlState;
use orbit_autopilot::{Autopilot, AutopilotConfig, VesselRegistry};

fn autopilot(registry: &mut VesselRegistry) -> Autopilot {
    let claim = registry.claim(1).expect("vessel 1 is free");
    Autopilot::new(claim, AutopilotConfig::default())
}

#[test]
fn powered_landing_touches_down_gently() {
    let lander = Lander::default();
    let config = SimConfig::default();
    let start = LanderState::upright(&lander, &config, 3_000.0, -50.0, 0.0);
    let mut registry = VesselRegistry::new();
    let mut ap = autopilot(&mut registry);

    let log = sim::simulate_landing(&lander, &config, start, &mut ap);

    let speed = log.touchdown_speed().expect("no touchdown");
    assert!(speed < 5.0, "touchdown at {speed:.2} m/s");
    assert!(log.gear_deployed());

    let gear = log
        .events
        .iter()
        .find(|e| e.kind == sim::EventKind::GearDeployed)
        .expect("gear event");
    assert!(gear.altitude < 1_000.0 && gear.altitude > 900.0, "gear at {:.0} m", gear.altitude);

    let last = log.samples.last().expect("samples");
    assert!(last.time < config.max_time);
    assert!(log.samples.iter().all(|s| (0.0..=1.0).contains(&s.throttle)));
    assert_eq!(ap.guidance().mode(), ControlMode::Off);
}

#[test]
fn attitude_hold_converges_from_thirty_degrees() {
    let lander = Lander::default();
    let config = SimConfig::default();
    let mut state = LanderState::upright(&lander, &config, 50_000.0, 0.0, 0.0);
    // coast on a circular orbit so nothing but the attitude loop acts
    let r = state.pos.norm();
    state.vel = Vector3::y() * (config.body_mu / r).sqrt();

    let mut registry = VesselRegistry::new();
    let mut ap = autopilot(&mut registry);
    let wanted = state.quat * UnitQuaternion::from_euler_angles(0.4, -0.3, 0.2);
    assert!(ap.guidance_mut().attitude_to_rotation(wanted, Reference::Inertial, None));

    for _ in 0..1_500 {
        let snap = sim::snapshot(&state, &lander, &config, 1, false);
        let mut controls = ControlState::default();
        ap.tick(&snap, &mut controls);
        controls.throttle = 0.0;
        state = sim::rk4_step(&state, &lander, &config, &controls, config.dt);
    }

    let error = state.quat.angle_to(&wanted).to_degrees();
    assert!(error < 1.0, "still {error:.2} deg off");
    assert!(state.omega.norm() < 0.1, "still spinning at {:.3} rad/s", state.omega.norm());
}

#[test]
fn pilot_input_wins_on_overridden_axes() {
    let lander = Lander::default();
    let config = SimConfig::default();
    let state = LanderState::upright(&lander, &config, 50_000.0, 0.0, 0.0);
    let mut registry = VesselRegistry::new();
    let mut ap = autopilot(&mut registry);
    let wanted = state.quat * UnitQuaternion::from_euler_angles(0.5, 0.5, 0.0);
    ap.guidance_mut().attitude_to_rotation(wanted, Reference::Inertial, None);

    let snap = sim::snapshot(&state, &lander, &config, 1, false);
    let mut controls = ControlState { pitch: -0.6, ..Default::default() };
    ap.tick(&snap, &mut controls);
    assert_eq!(controls.pitch, -0.6, "overridden axis untouched");
    assert!(controls.yaw != 0.0, "other axes still flown");
}
