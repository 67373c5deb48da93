use nalgebra::Vector3;

use crate::gnc::frame::{self, Reference};
use crate::gnc::guidance::{Guidance, Owner};
use crate::vessel::{TargetCandidate, VesselSnapshot};

use super::target;

/// Manual pointing modes for proximity operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointAt {
    /// Along the ship's velocity relative to the target.
    RelativeVelocity,
    /// Against it: the direction to burn to null relative motion.
    RelativeVelocityAway,
    Target,
    TargetAway,
    Normal,
    AntiNormal,
    /// Same orientation as the target, roll included.
    MatchTarget,
    /// Nose against the target's nose, sharing its top.
    MatchTargetAway,
    #[default]
    Prograde,
    Retrograde,
}

/// Send the attitude request for `at` through `guidance`.
///
/// Returns false if the command was refused or the direction is undefined
/// (e.g. zero relative velocity).
pub fn point(
    guidance: &mut Guidance,
    at: PointAt,
    snapshot: &VesselSnapshot,
    target: &TargetCandidate,
    by: Option<Owner>,
) -> bool {
    let (direction, reference) = match at {
        PointAt::Prograde => (Vector3::z(), Reference::Orbit),
        PointAt::Retrograde => (-Vector3::z(), Reference::Orbit),
        // orbit frame x is up × prograde, i.e. the orbit normal
        PointAt::Normal => (Vector3::x(), Reference::Orbit),
        PointAt::AntiNormal => (-Vector3::x(), Reference::Orbit),
        PointAt::Target => (Vector3::z(), Reference::Target),
        PointAt::TargetAway => (-Vector3::z(), Reference::Target),
        PointAt::RelativeVelocity => (target::relative_velocity(snapshot, target), Reference::Inertial),
        PointAt::RelativeVelocityAway => (-target::relative_velocity(snapshot, target), Reference::Inertial),
        PointAt::MatchTarget => {
            return guidance.attitude_to_rotation(target.rotation, Reference::Inertial, by);
        }
        PointAt::MatchTargetAway => {
            let Some(rotation) = frame::look_rotation(&-target.forward(), &target.top()) else {
                return false;
            };
            return guidance.attitude_to_rotation(rotation, Reference::Inertial, by);
        }
    };
    guidance.attitude_to(&direction, reference, snapshot, Some(target), by)
}
