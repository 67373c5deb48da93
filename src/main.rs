use std::process::ExitCode;

use orbit_autopilot::sim::{self, EventKind, Lander, LanderState, SimConfig};
use orbit_autopilot::{Autopilot, AutopilotConfig, VesselRegistry};

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).with_target(false).init();

    // -----------------------------------------------------------------------
    // Configuration: optional TOML path as the only argument
    // -----------------------------------------------------------------------
    let config = match std::env::args().nth(1) {
        Some(path) => match AutopilotConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => AutopilotConfig::default(),
    };

    // -----------------------------------------------------------------------
    // Vehicle: "Mun Hopper" descending on Kerbin
    // -----------------------------------------------------------------------
    let lander = Lander { name: "Mun Hopper".into(), ..Lander::default() };
    let sim_config = SimConfig::default();
    let start = LanderState::upright(&lander, &sim_config, 3_000.0, -50.0, 0.0);

    let mut registry = VesselRegistry::new();
    let claim = match registry.claim(1) {
        Ok(claim) => claim,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut autopilot = Autopilot::new(claim, config);

    // -----------------------------------------------------------------------
    // Run simulation
    // -----------------------------------------------------------------------
    let log = sim::simulate_landing(&lander, &sim_config, start, &mut autopilot);

    // -----------------------------------------------------------------------
    // Print results
    // -----------------------------------------------------------------------
    println!();
    println!("====================================================================");
    println!("  POWERED LANDING: {}", lander.name);
    println!("====================================================================");
    println!();
    println!("  Vehicle Parameters");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Dry mass:      {:>8.0} kg    Propellant:   {:>8.0} kg",
        lander.dry_mass, lander.propellant_mass
    );
    println!(
        "  Thrust:        {:>8.0} N     Isp:          {:>8.0} s",
        lander.thrust, lander.isp
    );
    println!(
        "  TWR (surface): {:>8.2}       Delta-v:      {:>8.0} m/s",
        lander.thrust / (lander.total_mass() * sim_config.surface_gee() * sim::integrator::G0),
        lander.delta_v()
    );
    println!();

    println!("  Flight Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    for e in &log.events {
        println!("  {:<24} t={:>6.1}s   alt={:>8.1}m", e.kind.to_string(), e.time, e.altitude);
    }
    println!();

    // -----------------------------------------------------------------------
    // Trajectory table (sampled)
    // -----------------------------------------------------------------------
    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>9}  {:>9}  {:>8}  {:>8}  {:>12}",
        "t (s)", "alt (m)", "vz (m/s)", "tgt (m/s)", "throttle", "mass(kg)", "mode"
    );
    println!("  {}", "─".repeat(76));

    let sample_interval = (log.samples.len() / 30).max(1);
    for (i, s) in log.samples.iter().enumerate() {
        if i % sample_interval != 0 && i != log.samples.len() - 1 {
            continue;
        }
        println!(
            "  {:>7.2}  {:>9.1}  {:>9.2}  {:>9.2}  {:>8.3}  {:>8.1}  {:>12}",
            s.time,
            s.altitude,
            s.vertical_speed,
            s.speed_target,
            s.throttle,
            s.mass,
            format!("{:?}", s.mode)
        );
    }

    println!();
    match log.touchdown_speed() {
        Some(speed) => println!("  Touchdown at {speed:.2} m/s, gear {}", if log.gear_deployed() { "down" } else { "UP" }),
        None => println!("  No touchdown within {:.0} s", sim_config.max_time),
    }
    let warnings = log.events.iter().filter(|e| matches!(e.kind, EventKind::Diagnostic(_))).count();
    println!("  Simulation: {} steps, dt={} s, {} warnings", log.samples.len(), sim_config.dt, warnings);
    println!("====================================================================");
    println!();

    registry.release(autopilot.into_claim());
    ExitCode::SUCCESS
}
