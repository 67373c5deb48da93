// ---------------------------------------------------------------------------
// Host control state: manual input in, merged autopilot commands out
// ---------------------------------------------------------------------------

/// Control axes exchanged with the host each tick.
///
/// Rotation and translation axes are in [-1, 1], throttle in [0, 1].
/// Translation axes follow the vessel-local frame: `x` lateral, `y` towards
/// the top, `z` along the nose.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlState {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub throttle: f64,
}

impl ControlState {
    /// Rotation axes in control order (pitch, yaw, roll).
    pub fn rotation_axes(&self) -> [f64; 3] {
        [self.pitch, self.yaw, self.roll]
    }

    /// Add `delta` to a rotation axis (0 = pitch, 1 = yaw, 2 = roll), clamped.
    pub fn add_rotation(&mut self, axis: usize, delta: f64) {
        let slot = match axis {
            0 => &mut self.pitch,
            1 => &mut self.yaw,
            _ => &mut self.roll,
        };
        *slot = (*slot + delta).clamp(-1.0, 1.0);
    }

    /// Set the translation axes, each clamped to [-1, 1].
    pub fn set_translation(&mut self, x: f64, y: f64, z: f64) {
        self.x = x.clamp(-1.0, 1.0);
        self.y = y.clamp(-1.0, 1.0);
        self.z = z.clamp(-1.0, 1.0);
    }

    /// Zero every axis, as the host does when control authority changes hands.
    pub fn neutralize(&mut self) {
        *self = ControlState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_is_clamped() {
        let mut c = ControlState { pitch: 0.8, ..Default::default() };
        c.add_rotation(0, 0.5);
        c.add_rotation(2, -3.0);
        assert_eq!(c.pitch, 1.0);
        assert_eq!(c.roll, -1.0);
        assert_eq!(c.yaw, 0.0);
    }

    #[test]
    fn neutralize_clears_everything() {
        let mut c = ControlState { pitch: 0.3, x: -0.2, throttle: 0.7, ..Default::default() };
        c.neutralize();
        assert_eq!(c, ControlState::default());
    }
}
