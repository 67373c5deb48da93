use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::vessel::{TargetCandidate, VesselSnapshot};

// ---------------------------------------------------------------------------
// Reference frames for attitude targets
// ---------------------------------------------------------------------------

/// Named frame an attitude target is expressed in.
///
/// Each frame is a rotation whose +Z axis is the frame's "forward" and +Y its
/// "up".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    /// World axes.
    #[default]
    Inertial,
    /// Forward = prograde, up = local vertical.
    Orbit,
    /// Forward = prograde projected onto the local horizon, up = local vertical.
    OrbitHorizontal,
    /// The vessel's surface frame (north/up).
    SurfaceNorth,
    /// Forward = surface velocity, up = local vertical.
    SurfaceVelocity,
    /// Forward = towards the target, up = the vessel's own top axis.
    Target,
}

/// Rotation mapping +Z to `forward` and +Y as close to `up` as the
/// orthogonality constraint allows. `None` if `forward` has no direction.
pub fn look_rotation(forward: &Vector3<f64>, up: &Vector3<f64>) -> Option<UnitQuaternion<f64>> {
    let f = forward.try_normalize(1e-9)?;
    let mut u = up - f * up.dot(&f);
    if u.norm_squared() < 1e-18 {
        // up parallel to forward: any perpendicular will do
        u = f.cross(&Vector3::x());
        if u.norm_squared() < 1e-18 {
            u = f.cross(&Vector3::y());
        }
    }
    Some(UnitQuaternion::face_towards(&f, &u))
}

/// Resolve `reference` to a world rotation for this tick.
///
/// `Target` without a target, and frames whose defining vector vanishes (e.g.
/// zero velocity), resolve to identity. Callers that care must check target
/// presence first.
pub fn resolve(
    reference: Reference,
    snapshot: &VesselSnapshot,
    target: Option<&TargetCandidate>,
) -> UnitQuaternion<f64> {
    let up = snapshot.up;
    let rotation = match reference {
        Reference::Inertial => Some(UnitQuaternion::identity()),
        Reference::Orbit => look_rotation(&snapshot.orbital_velocity, &up),
        Reference::OrbitHorizontal => {
            let v = snapshot.orbital_velocity;
            look_rotation(&(v - up * v.dot(&up)), &up)
        }
        Reference::SurfaceNorth => Some(snapshot.surface_rotation),
        Reference::SurfaceVelocity => look_rotation(&snapshot.surface_velocity, &up),
        Reference::Target => match target {
            Some(t) => look_rotation(&(t.position - snapshot.com), &snapshot.top()),
            None => Some(UnitQuaternion::identity()),
        },
    };
    rotation.unwrap_or_else(|| {
        tracing::warn!(?reference, "degenerate reference frame, falling back to inertial");
        UnitQuaternion::identity()
    })
}

/// World vector expressed in `reference`.
pub fn world_to_reference(
    vector: &Vector3<f64>,
    reference: Reference,
    snapshot: &VesselSnapshot,
    target: Option<&TargetCandidate>,
) -> Vector3<f64> {
    resolve(reference, snapshot, target).inverse_transform_vector(vector)
}

/// Vector given in `reference` expressed in world axes.
pub fn reference_to_world(
    vector: &Vector3<f64>,
    reference: Reference,
    snapshot: &VesselSnapshot,
    target: Option<&TargetCandidate>,
) -> Vector3<f64> {
    resolve(reference, snapshot, target) * vector
}
