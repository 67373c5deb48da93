pub mod elements;
pub mod orbit;

pub use elements::KeplerianElements;
pub use orbit::Orbit;
