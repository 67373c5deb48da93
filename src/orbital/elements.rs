use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;

use super::orbit::{wrap_two_pi, Orbit};

/// Classical Keplerian orbital elements, describing the orbit at the snapshot
/// instant (the body sits at `true_anom`).
#[derive(Debug, Clone, Copy)]
pub struct KeplerianElements {
    pub sma: f64,       // semi-major axis, m
    pub ecc: f64,       // eccentricity (0 = circular), elliptic orbits only
    pub inc: f64,       // inclination, rad
    pub raan: f64,      // right ascension of ascending node, rad
    pub argp: f64,      // argument of periapsis, rad
    pub true_anom: f64, // true anomaly now, rad
    pub mu: f64,        // gravitational parameter of the orbited body, m^3/s^2
}

impl KeplerianElements {
    /// Circular orbit of radius `radius` (not altitude).
    pub fn circular(radius: f64, inc: f64, mu: f64) -> Self {
        KeplerianElements {
            sma: radius,
            ecc: 0.0,
            inc,
            raan: 0.0,
            argp: 0.0,
            true_anom: 0.0,
            mu,
        }
    }

    /// Same orbit, body moved to a different true anomaly.
    pub fn at_true_anomaly(mut self, true_anom: f64) -> Self {
        self.true_anom = wrap_two_pi(true_anom);
        self
    }

    /// Rotate a perifocal (PQW) vector into the inertial frame.
    fn perifocal_to_inertial(&self, v: &Vector3<f64>) -> Vector3<f64> {
        let cos_raan = self.raan.cos();
        let sin_raan = self.raan.sin();
        let cos_argp = self.argp.cos();
        let sin_argp = self.argp.sin();
        let cos_inc = self.inc.cos();
        let sin_inc = self.inc.sin();

        Vector3::new(
            (cos_raan * cos_argp - sin_raan * sin_argp * cos_inc) * v.x
                + (-cos_raan * sin_argp - sin_raan * cos_argp * cos_inc) * v.y
                + (sin_raan * sin_inc) * v.z,
            (sin_raan * cos_argp + cos_raan * sin_argp * cos_inc) * v.x
                + (-sin_raan * sin_argp + cos_raan * cos_argp * cos_inc) * v.y
                + (-cos_raan * sin_inc) * v.z,
            (sin_argp * sin_inc) * v.x + (cos_argp * sin_inc) * v.y + cos_inc * v.z,
        )
    }

    /// Inertial state vector (position, velocity) at the current anomaly.
    pub fn to_state_vector(&self) -> (Vector3<f64>, Vector3<f64>) {
        let p = self.sma * (1.0 - self.ecc * self.ecc); // semi-latus rectum
        let nu = self.true_anom;
        let r = p / (1.0 + self.ecc * nu.cos());

        let r_pqw = Vector3::new(r * nu.cos(), r * nu.sin(), 0.0);
        let sqrt_mu_p = (self.mu / p).sqrt();
        let v_pqw = Vector3::new(-sqrt_mu_p * nu.sin(), sqrt_mu_p * (self.ecc + nu.cos()), 0.0);

        (self.perifocal_to_inertial(&r_pqw), self.perifocal_to_inertial(&v_pqw))
    }

    /// Elements from an inertial state vector.
    pub fn from_state_vector(pos: &Vector3<f64>, vel: &Vector3<f64>, mu: f64) -> Self {
        let r = pos.norm();
        let v = vel.norm();

        let h = pos.cross(vel);
        let h_mag = h.norm();

        // Node vector
        let n = Vector3::new(-h.y, h.x, 0.0);
        let n_mag = n.norm();

        let e_vec = ((v * v - mu / r) * pos - pos.dot(vel) * vel) / mu;
        let ecc = e_vec.norm();

        let energy = 0.5 * v * v - mu / r;
        let sma = if ecc < 1.0 - 1e-10 {
            -mu / (2.0 * energy)
        } else {
            h_mag * h_mag / (mu * (1.0 - ecc * ecc).abs())
        };

        let inc = (h.z / h_mag).clamp(-1.0, 1.0).acos();

        let raan = if n_mag > 1e-10 {
            let r = (n.x / n_mag).clamp(-1.0, 1.0).acos();
            if n.y < 0.0 { TAU - r } else { r }
        } else {
            0.0
        };

        let argp = if n_mag > 1e-10 && ecc > 1e-10 {
            let w = (n.dot(&e_vec) / (n_mag * ecc)).clamp(-1.0, 1.0).acos();
            if e_vec.z < 0.0 { TAU - w } else { w }
        } else {
            0.0
        };

        // Circular orbits measure the anomaly from the node line (or the x axis
        // when equatorial) so that argp = 0 stays consistent.
        let true_anom = if ecc > 1e-10 {
            let nu = (e_vec.dot(pos) / (ecc * r)).clamp(-1.0, 1.0).acos();
            if pos.dot(vel) < 0.0 { TAU - nu } else { nu }
        } else {
            let reference = if n_mag > 1e-10 { n / n_mag } else { Vector3::x() };
            let q_axis = (h / h_mag).cross(&reference);
            wrap_two_pi(pos.dot(&q_axis).atan2(pos.dot(&reference)))
        };

        KeplerianElements { sma, ecc, inc, raan, argp, true_anom, mu }
    }

    fn mean_motion(&self) -> f64 {
        (self.mu / self.sma.powi(3)).sqrt()
    }

    fn mean_anomaly_of(&self, true_anom: f64) -> f64 {
        let e = self.ecc;
        let half = 0.5 * true_anom;
        let ecc_anom = 2.0 * (((1.0 - e) / (1.0 + e)).sqrt() * half.sin()).atan2(half.cos());
        wrap_two_pi(ecc_anom - e * ecc_anom.sin())
    }

    /// Solve Kepler's equation `M = E - e sin E` by Newton iteration.
    fn eccentric_anomaly_of_mean(&self, mean_anom: f64) -> f64 {
        let e = self.ecc;
        let m = wrap_two_pi(mean_anom);
        let mut ecc_anom = if e < 0.8 { m } else { PI };
        for _ in 0..50 {
            let f = ecc_anom - e * ecc_anom.sin() - m;
            let step = f / (1.0 - e * ecc_anom.cos());
            ecc_anom -= step;
            if step.abs() < 1e-12 {
                break;
            }
        }
        ecc_anom
    }
}

impl Orbit for KeplerianElements {
    fn period(&self) -> f64 {
        TAU / self.mean_motion()
    }

    fn inclination(&self) -> f64 {
        self.inc
    }

    fn normal(&self) -> Vector3<f64> {
        self.perifocal_to_inertial(&Vector3::z())
    }

    fn time_to_true_anomaly(&self, true_anomaly: f64) -> f64 {
        let delta = wrap_two_pi(self.mean_anomaly_of(true_anomaly) - self.mean_anomaly_of(self.true_anom));
        delta / self.mean_motion()
    }

    fn direction_at(&self, true_anomaly: f64) -> Vector3<f64> {
        self.perifocal_to_inertial(&Vector3::new(true_anomaly.cos(), true_anomaly.sin(), 0.0))
    }

    fn true_anomaly_of(&self, direction: &Vector3<f64>) -> f64 {
        let p_axis = self.perifocal_to_inertial(&Vector3::x());
        let q_axis = self.perifocal_to_inertial(&Vector3::y());
        wrap_two_pi(direction.dot(&q_axis).atan2(direction.dot(&p_axis)))
    }

    fn speed_after(&self, dt: f64) -> f64 {
        let mean_anom = self.mean_anomaly_of(self.true_anom) + self.mean_motion() * dt;
        let ecc_anom = self.eccentric_anomaly_of_mean(mean_anom);
        let r = self.sma * (1.0 - self.ecc * ecc_anom.cos());
        (self.mu * (2.0 / r - 1.0 / self.sma)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MU_KERBIN: f64 = 3.531_6e12;
    const R_KERBIN: f64 = 600_000.0;

    fn elliptic() -> KeplerianElements {
        KeplerianElements {
            sma: R_KERBIN + 150_000.0,
            ecc: 0.1,
            inc: 0.3,
            raan: 1.0,
            argp: 0.4,
            true_anom: 0.7,
            mu: MU_KERBIN,
        }
    }

    #[test]
    fn state_vector_roundtrip() {
        let orbit = elliptic();
        let (pos, vel) = orbit.to_state_vector();
        let recovered = KeplerianElements::from_state_vector(&pos, &vel, MU_KERBIN);
        assert!((recovered.sma - orbit.sma).abs() < 1.0, "SMA mismatch");
        assert!((recovered.ecc - orbit.ecc).abs() < 1e-9);
        assert!((recovered.inc - orbit.inc).abs() < 1e-9);
        assert!((recovered.true_anom - orbit.true_anom).abs() < 1e-9);
    }

    #[test]
    fn time_to_periapsis_and_back_to_now() {
        let orbit = elliptic();
        let period = orbit.period();
        assert!(orbit.time_to_true_anomaly(orbit.true_anom) < 1e-9);
        let t_peri = orbit.time_to_true_anomaly(0.0);
        assert!(t_peri > 0.0 && t_peri < period);
        // Half an orbit after periapsis is apoapsis for any eccentricity.
        let t_apo = orbit.time_to_true_anomaly(PI);
        let diff = wrap_two_pi((t_peri - t_apo) / period * TAU) / TAU * period;
        assert!((diff - 0.5 * period).abs() < 1e-6);
    }

    #[test]
    fn speed_matches_vis_viva_at_apsides() {
        let orbit = elliptic();
        let r_apo = orbit.sma * (1.0 + orbit.ecc);
        let r_peri = orbit.sma * (1.0 - orbit.ecc);
        let v_apo = orbit.speed_after(orbit.time_to_true_anomaly(PI));
        let v_peri = orbit.speed_after(orbit.time_to_true_anomaly(0.0));
        let vis_viva = |r: f64| (MU_KERBIN * (2.0 / r - 1.0 / orbit.sma)).sqrt();
        assert!((v_apo - vis_viva(r_apo)).abs() < 1e-6);
        assert!((v_peri - vis_viva(r_peri)).abs() < 1e-6);
        assert!(v_peri > v_apo);
    }

    #[test]
    fn translate_anomaly_between_coplanar_orbits() {
        let a = KeplerianElements::circular(700_000.0, 0.0, MU_KERBIN);
        let mut b = KeplerianElements::circular(800_000.0, 0.0, MU_KERBIN);
        b.argp = 0.5;
        // b's periapsis direction sits 0.5 rad along a.
        assert!((b.translate_anomaly(&a, 0.0) - 0.5).abs() < 1e-9);
        let back = a.translate_anomaly(&b, 0.5);
        assert!(back.min(TAU - back) < 1e-9, "got {back}");
    }

    #[test]
    fn relative_nodes_are_half_an_orbit_apart() {
        let ship = KeplerianElements::circular(700_000.0, 0.0, MU_KERBIN).at_true_anomaly(1.0);
        let target = KeplerianElements::circular(700_000.0, 0.1, MU_KERBIN);
        let t_an = ship.time_to_relative_ascending_node(&target);
        let t_dn = ship.time_to_relative_descending_node(&target);
        assert!(t_an.is_finite() && t_dn.is_finite());
        assert!(((t_an - t_dn).abs() - 0.5 * ship.period()).abs() < 1e-6);
    }

    #[test]
    fn kerbin_low_orbit_period() {
        let orbit = KeplerianElements::circular(R_KERBIN + 80_000.0, 0.0, MU_KERBIN);
        let period = orbit.period();
        // 80 km LKO is about 31 minutes
        assert!(period > 1_800.0 && period < 1_900.0, "got {:.0} s", period);
    }
}
