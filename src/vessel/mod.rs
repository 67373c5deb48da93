pub mod controls;
pub mod snapshot;

pub use controls::ControlState;
pub use snapshot::{
    SnapshotBuilder, TargetCandidate, TargetKind, TorqueAvailable, VesselId, VesselSnapshot, WarpStatus,
};
