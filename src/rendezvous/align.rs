use super::pointing::PointAt;

// ---------------------------------------------------------------------------
// Plane alignment: burn normal/anti-normal at the nearer relative node
// ---------------------------------------------------------------------------

/// Start the burn this many seconds before the node.
const NODE_LEAD: f64 = 10.0;
const HEADING_LIMIT: f64 = 5.0;
/// Inclination differences, degrees.
const BURN_THRESHOLD: f64 = 0.01;
const FULL_THROTTLE_ABOVE: f64 = 0.1;
const ALIGNED_BELOW: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignInputs {
    pub time_to_ascending_node: f64,
    pub time_to_descending_node: f64,
    /// Target inclination minus own inclination, degrees.
    pub relative_inclination: f64,
    pub heading_error: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignCommand {
    pub point_at: PointAt,
    pub throttle: f64,
    /// Seconds to the node the burn will happen at.
    pub time_to_node: f64,
    pub done: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PlaneAligner {
    burn_triggered: bool,
    point_at: PointAt,
}

impl PlaneAligner {
    pub fn new() -> Self {
        Self { burn_triggered: false, point_at: PointAt::Normal }
    }

    pub fn burn_triggered(&self) -> bool {
        self.burn_triggered
    }

    pub fn step(&mut self, input: &AlignInputs) -> AlignCommand {
        let ascending_first = input.time_to_ascending_node < input.time_to_descending_node;
        let time_to_node = if ascending_first { input.time_to_ascending_node } else { input.time_to_descending_node };
        let di = input.relative_inclination;

        // the direction is frozen once the burn starts
        if !self.burn_triggered {
            let towards_normal = if di < 0.0 { ascending_first } else { !ascending_first };
            self.point_at = if towards_normal { PointAt::Normal } else { PointAt::AntiNormal };
        }

        let mut throttle = 0.0;
        if (time_to_node < NODE_LEAD || self.burn_triggered)
            && input.heading_error < HEADING_LIMIT
            && di.abs() > BURN_THRESHOLD
        {
            if !self.burn_triggered {
                tracing::info!(relative_inclination = di, time_to_node, "plane change burn");
            }
            self.burn_triggered = true;
            throttle = if di.abs() > FULL_THROTTLE_ABOVE { 1.0 } else { 0.25 };
        }

        let done = di.abs() < ALIGNED_BELOW;
        if done {
            tracing::info!(relative_inclination = di, "planes aligned");
            self.burn_triggered = false;
        }
        AlignCommand { point_at: self.point_at, throttle, time_to_node, done }
    }
}
