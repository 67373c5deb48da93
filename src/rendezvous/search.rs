use std::f64::consts::PI;

use crate::orbital::Orbit;

// ---------------------------------------------------------------------------
// Apsis-crossing search
// ---------------------------------------------------------------------------

/// Orbits looked ahead when matching apsis crossings.
pub const LOOKAHEAD_ORBITS: usize = 4;

/// Upcoming apsis times, s from now, for the next few orbits of each vessel.
///
/// Ship times are when the ship passes the *target's* apsis directions; target
/// times are when the target reaches its own apsides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApsisTimes {
    pub ship_apo: [f64; LOOKAHEAD_ORBITS],
    pub ship_peri: [f64; LOOKAHEAD_ORBITS],
    pub target_apo: [f64; LOOKAHEAD_ORBITS],
    pub target_peri: [f64; LOOKAHEAD_ORBITS],
}

impl ApsisTimes {
    pub fn compute(ship: &dyn Orbit, target: &dyn Orbit) -> Self {
        let apo_on_ship = target.translate_anomaly(ship, PI);
        let peri_on_ship = target.translate_anomaly(ship, 0.0);
        let (ps, pt) = (ship.period(), target.period());
        let ship_apo_0 = ship.time_to_true_anomaly(apo_on_ship);
        let ship_peri_0 = ship.time_to_true_anomaly(peri_on_ship);
        let target_apo_0 = target.time_to_true_anomaly(PI);
        let target_peri_0 = target.time_to_true_anomaly(0.0);

        let orbits = |first: f64, period: f64| std::array::from_fn(|i| first + i as f64 * period);
        Self {
            ship_apo: orbits(ship_apo_0, ps),
            ship_peri: orbits(ship_peri_0, ps),
            target_apo: orbits(target_apo_0, pt),
            target_peri: orbits(target_peri_0, pt),
        }
    }
}

/// Closest matching apsis crossing found by [`nearest_rendezvous`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendezvousEstimate {
    /// When the ship reaches the crossing, s from now.
    pub time_to_rendezvous: f64,
    /// How far apart in time ship and target pass that point, s.
    pub min_delta: f64,
}

/// Best ship/target apsis pairing over the lookahead window.
///
/// Apoapsis pairs are scanned first, then periapsis pairs, each with the ship
/// index outermost. Only a strictly smaller delta replaces the running
/// minimum, and the apoapsis group wins only if strictly better, so ties
/// resolve to the earliest pair in that order.
pub fn nearest_rendezvous(times: &ApsisTimes) -> RendezvousEstimate {
    let (apo_delta, apo_ship) = closest_pair(&times.ship_apo, &times.target_apo);
    let (peri_delta, peri_ship) = closest_pair(&times.ship_peri, &times.target_peri);
    if apo_delta < peri_delta {
        RendezvousEstimate { time_to_rendezvous: times.ship_apo[apo_ship], min_delta: apo_delta }
    } else {
        RendezvousEstimate { time_to_rendezvous: times.ship_peri[peri_ship], min_delta: peri_delta }
    }
}

fn closest_pair(ship: &[f64; LOOKAHEAD_ORBITS], target: &[f64; LOOKAHEAD_ORBITS]) -> (f64, usize) {
    let mut best = (f64::MAX, 0);
    for (i, s) in ship.iter().enumerate() {
        for t in target {
            let delta = (s - t).abs();
            if delta < best.0 {
                best = (delta, i);
            }
        }
    }
    best
}

/// Time until the ship passes the nearer of the target's apsis directions.
pub fn time_to_next_target_apsis(ship: &dyn Orbit, target: &dyn Orbit) -> f64 {
    let (apo, peri) = ship_times_to_target_apsides(ship, target);
    apo.min(peri)
}

/// Time until the ship passes the farther of the target's apsis directions.
pub fn time_to_further_target_apsis(ship: &dyn Orbit, target: &dyn Orbit) -> f64 {
    let (apo, peri) = ship_times_to_target_apsides(ship, target);
    apo.max(peri)
}

fn ship_times_to_target_apsides(ship: &dyn Orbit, target: &dyn Orbit) -> (f64, f64) {
    let apo = ship.time_to_true_anomaly(target.translate_anomaly(ship, PI));
    let peri = ship.time_to_true_anomaly(target.translate_anomaly(ship, 0.0));
    (apo, peri)
}

// ---------------------------------------------------------------------------
// Sync table
// ---------------------------------------------------------------------------

/// Orbital point both vessels are timed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    ShipApoapsis,
    ShipPeriapsis,
    TargetApoapsis,
    #[default]
    TargetPeriapsis,
}

/// Arrival times of both vessels at the sync point over the next orbits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncTable {
    /// Sync point as a true anomaly on the ship's orbit, rad.
    pub anomaly: f64,
    pub ship_times: [f64; LOOKAHEAD_ORBITS],
    pub target_times: [f64; LOOKAHEAD_ORBITS],
    /// Orbit index where the two arrivals are closest.
    pub closest_orbit: usize,
    /// Smallest apsis-crossing separation from [`nearest_rendezvous`], s.
    pub min_separation: f64,
}

pub fn sync_table(ship: &dyn Orbit, target: &dyn Orbit, mode: SyncMode) -> SyncTable {
    let anomaly = match mode {
        SyncMode::ShipApoapsis => PI,
        SyncMode::ShipPeriapsis => 0.0,
        SyncMode::TargetApoapsis => target.translate_anomaly(ship, PI),
        SyncMode::TargetPeriapsis => target.translate_anomaly(ship, 0.0),
    };
    let on_target = ship.translate_anomaly(target, anomaly);
    let ship_first = ship.time_to_true_anomaly(anomaly);
    let target_first = target.time_to_true_anomaly(on_target);

    let ship_times: [f64; LOOKAHEAD_ORBITS] = std::array::from_fn(|i| ship_first + i as f64 * ship.period());
    let target_times: [f64; LOOKAHEAD_ORBITS] =
        std::array::from_fn(|i| target_first + i as f64 * target.period());

    let mut closest_orbit = 0;
    for i in 1..LOOKAHEAD_ORBITS {
        if (ship_times[i] - target_times[i]).abs() < (ship_times[closest_orbit] - target_times[closest_orbit]).abs() {
            closest_orbit = i;
        }
    }

    let min_separation = nearest_rendezvous(&ApsisTimes::compute(ship, target)).min_delta;
    SyncTable { anomaly, ship_times, target_times, closest_orbit, min_separation }
}

/// Recomputes the sync table at most every [`SyncTracker::INTERVAL`] seconds.
#[derive(Debug, Clone, Default)]
pub struct SyncTracker {
    pub mode: SyncMode,
    last: Option<(f64, SyncTable)>,
}

impl SyncTracker {
    pub const INTERVAL: f64 = 0.1;

    pub fn new(mode: SyncMode) -> Self {
        Self { mode, last: None }
    }

    pub fn update(&mut self, time: f64, ship: &dyn Orbit, target: &dyn Orbit) -> SyncTable {
        match self.last {
            Some((at, table)) if time - at < Self::INTERVAL => table,
            _ => {
                let table = sync_table(ship, target, self.mode);
                self.last = Some((time, table));
                table
            }
        }
    }

    pub fn table(&self) -> Option<&SyncTable> {
        self.last.as_ref().map(|(_, t)| t)
    }

    /// Forget the cached table, e.g. after a target change.
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbital::KeplerianElements;

    const MU: f64 = 3.531_6e12;

    fn ship() -> KeplerianElements {
        KeplerianElements { sma: 750_000.0, ecc: 0.05, inc: 0.0, raan: 0.0, argp: 0.0, true_anom: 1.0, mu: MU }
    }

    fn target() -> KeplerianElements {
        KeplerianElements { sma: 800_000.0, ecc: 0.1, inc: 0.0, raan: 0.0, argp: 0.3, true_anom: 2.5, mu: MU }
    }

    #[test]
    fn search_is_deterministic_and_minimal() {
        let times = ApsisTimes::compute(&ship(), &target());
        let a = nearest_rendezvous(&times);
        let b = nearest_rendezvous(&ApsisTimes::compute(&ship(), &target()));
        assert_eq!(a, b);

        for i in 0..LOOKAHEAD_ORBITS {
            for j in 0..LOOKAHEAD_ORBITS {
                assert!(a.min_delta <= (times.ship_apo[i] - times.target_apo[j]).abs());
                assert!(a.min_delta <= (times.ship_peri[i] - times.target_peri[j]).abs());
            }
        }
        let ship_side: Vec<f64> = times.ship_apo.iter().chain(&times.ship_peri).copied().collect();
        assert!(ship_side.contains(&a.time_to_rendezvous), "returns a ship-side time");
    }

    #[test]
    fn ties_keep_the_first_pair_and_prefer_periapsis() {
        let times = ApsisTimes {
            ship_apo: [10.0, 20.0, 30.0, 40.0],
            ship_peri: [15.0, 25.0, 35.0, 45.0],
            target_apo: [12.0, 22.0, 99.0, 99.0],
            target_peri: [17.0, 27.0, 99.0, 99.0],
        };
        // every group minimum is 2 s; apoapsis must be strictly better to win
        let est = nearest_rendezvous(&times);
        assert_eq!(est, RendezvousEstimate { time_to_rendezvous: 15.0, min_delta: 2.0 });

        let apo_better = ApsisTimes { target_apo: [99.0, 21.0, 99.0, 99.0], ..times };
        let est = nearest_rendezvous(&apo_better);
        assert_eq!(est, RendezvousEstimate { time_to_rendezvous: 20.0, min_delta: 1.0 });
    }

    #[test]
    fn returned_time_is_the_ship_index() {
        let times = ApsisTimes {
            ship_apo: [100.0, 200.0, 300.0, 400.0],
            ship_peri: [1e6; 4],
            target_apo: [5.0, 6.0, 7.0, 301.0],
            target_peri: [0.0; 4],
        };
        assert_eq!(nearest_rendezvous(&times).time_to_rendezvous, 300.0);
    }

    #[test]
    fn next_apsis_is_before_further_apsis() {
        let (s, t) = (ship(), target());
        let next = time_to_next_target_apsis(&s, &t);
        let further = time_to_further_target_apsis(&s, &t);
        assert!(next <= further);
        assert!(further < s.period());
    }

    #[test]
    fn sync_table_ship_times_step_by_period() {
        let (s, t) = (ship(), target());
        let table = sync_table(&s, &t, SyncMode::ShipPeriapsis);
        assert_eq!(table.anomaly, 0.0);
        for i in 1..LOOKAHEAD_ORBITS {
            assert!((table.ship_times[i] - table.ship_times[i - 1] - s.period()).abs() < 1e-6);
            assert!((table.target_times[i] - table.target_times[i - 1] - t.period()).abs() < 1e-6);
        }
        assert!(table.closest_orbit < LOOKAHEAD_ORBITS);
    }

    #[test]
    fn tracker_caches_for_a_tenth_of_a_second() {
        let (s, t) = (ship(), target());
        let mut tracker = SyncTracker::new(SyncMode::ShipApoapsis);
        let first = tracker.update(10.0, &s, &t);
        let other = KeplerianElements { true_anom: 0.2, ..ship() };
        assert_eq!(tracker.update(10.05, &other, &t), first, "cached");
        assert_ne!(tracker.update(10.2, &other, &t), first, "recomputed");
    }
}
