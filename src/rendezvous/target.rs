use nalgebra::Vector3;

use crate::vessel::{TargetCandidate, TargetKind, VesselSnapshot};

/// Vessels worth rendezvousing with, nearest first: other vessels in flight
/// around the same body.
pub fn nearby_vessels(snapshot: &VesselSnapshot) -> Vec<&TargetCandidate> {
    let mut vessels: Vec<&TargetCandidate> = snapshot
        .candidates
        .iter()
        .filter(|c| is_rendezvous_target(snapshot, c))
        .collect();
    vessels.sort_by(|a, b| distance(snapshot, a).total_cmp(&distance(snapshot, b)));
    vessels
}

pub fn is_rendezvous_target(snapshot: &VesselSnapshot, candidate: &TargetCandidate) -> bool {
    candidate.kind == TargetKind::Vessel && candidate.id != snapshot.id && !candidate.landed && candidate.same_body
}

pub fn distance(snapshot: &VesselSnapshot, target: &TargetCandidate) -> f64 {
    (target.position - snapshot.com).norm()
}

/// Ship velocity relative to the target, world frame.
pub fn relative_velocity(snapshot: &VesselSnapshot, target: &TargetCandidate) -> Vector3<f64> {
    snapshot.orbital_velocity - target.velocity
}

/// Difference in inclination, target minus ship, degrees.
pub fn relative_inclination(snapshot: &VesselSnapshot, target: &TargetCandidate) -> f64 {
    (target.orbit.inclination() - snapshot.orbit.inclination()).to_degrees()
}
