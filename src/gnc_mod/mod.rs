pub mod attitude;
pub mod controller;
pub mod frame;
pub mod guidance;
pub mod landing;
pub mod pid;
pub mod setpoint;
pub mod translation;

pub use attitude::AttitudeController;
pub use controller::{Behavior, TickContext};
pub use frame::Reference;
pub use guidance::{Guidance, GuidanceEvent, Owner};
pub use pid::Pid;
pub use setpoint::{AttitudeChange, AttitudeTarget, ControlMode, ModeChange};
pub use translation::TranslationController;
