//! Time-acceleration admission control.
//!
//! The scheduler never changes the host's rate itself; it answers with a
//! [`WarpRequest`] the host applies, or a [`WarpRefusal`] explaining why the
//! change is not safe. Refusals are final for that call.

use thiserror::Error;

use crate::config::WarpConfig;
use crate::vessel::VesselSnapshot;

/// Minimum spacing between accepted rate increases, s.
const INCREASE_COOLDOWN: f64 = 2.0;

/// Rate change for the host to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpRequest {
    pub rate_index: usize,
    pub instant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum WarpRefusal {
    #[error("already at the highest warp rate")]
    AtMaximum,
    #[error("already at the lowest warp rate")]
    AtMinimum,
    #[error("previous warp change is still settling")]
    Settling,
    #[error("next rate {rate}x exceeds the cap of {cap}x")]
    AboveCap { rate: f64, cap: f64 },
    #[error("rate {rate}x is not a physics rate and the vessel is inside the atmosphere")]
    InAtmosphere { rate: f64 },
    #[error("altitude {altitude:.0} m is below the {floor:.0} m floor for the next rate")]
    BelowAltitudeFloor { altitude: f64, floor: f64 },
    #[error("last increase was {since:.2} s ago")]
    Cooldown { since: f64 },
    #[error("caller does not own the controls")]
    NotOwner,
}

/// Tracks the last accepted increase so rapid-fire requests are throttled.
#[derive(Debug, Clone, Default)]
pub struct WarpScheduler {
    last_increase: Option<f64>,
}

impl WarpScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step up one rate if every safety condition holds.
    pub fn increase(
        &mut self,
        snapshot: &VesselSnapshot,
        table: &WarpConfig,
        instant: bool,
        max_rate: f64,
    ) -> Result<WarpRequest, WarpRefusal> {
        let index = snapshot.warp.rate_index;
        let next = index + 1;
        let rate = *table.rates.get(next).ok_or(WarpRefusal::AtMaximum)?;

        let indexed = table.rates.get(index).copied().unwrap_or(f64::NAN);
        let current = snapshot.warp.current_rate;
        if current != 0.0 && (indexed - current).abs() > 1e-9 {
            return Err(WarpRefusal::Settling);
        }
        if rate > max_rate {
            return Err(WarpRefusal::AboveCap { rate, cap: max_rate });
        }

        // instantaneous altitude: the host's averaged value lags and the
        // limits are enforced against the real position
        let altitude = snapshot.instant_altitude();
        if !(altitude > snapshot.atmosphere_top || rate <= table.max_physics_rate || snapshot.landed) {
            return Err(WarpRefusal::InAtmosphere { rate });
        }
        let floor = table.altitude_limits.get(next).copied().unwrap_or(0.0) * snapshot.body_radius;
        if !(altitude > floor || snapshot.landed) {
            return Err(WarpRefusal::BelowAltitudeFloor { altitude, floor });
        }
        if let Some(last) = self.last_increase {
            let since = snapshot.time - last;
            if since <= INCREASE_COOLDOWN {
                return Err(WarpRefusal::Cooldown { since });
            }
        }

        self.last_increase = Some(snapshot.time);
        Ok(WarpRequest { rate_index: next, instant })
    }

    pub fn decrease(&self, snapshot: &VesselSnapshot, instant: bool) -> Result<WarpRequest, WarpRefusal> {
        match snapshot.warp.rate_index {
            0 => Err(WarpRefusal::AtMinimum),
            index => Ok(WarpRequest { rate_index: index - 1, instant }),
        }
    }

    pub fn minimum(&self, instant: bool) -> WarpRequest {
        WarpRequest { rate_index: 0, instant }
    }

    /// Drop to the highest rate the physics simulation still runs at.
    /// `None` if the current rate already is one.
    pub fn physics(&self, snapshot: &VesselSnapshot, table: &WarpConfig, instant: bool) -> Option<WarpRequest> {
        let mut index = snapshot.warp.rate_index.min(table.rates.len().saturating_sub(1));
        if table.rates.get(index).map_or(true, |&r| r <= table.max_physics_rate) {
            return None;
        }
        while index > 0 && table.rates[index] > table.max_physics_rate {
            index -= 1;
        }
        Some(WarpRequest { rate_index: index, instant })
    }

    /// One step towards warping up to an event `time_left` seconds away.
    ///
    /// Slows down once the remaining time is inside the current rate's
    /// lookahead (or the rate exceeds `max_rate`), speeds up with a
    /// non-instant change while the next rate's lookahead still fits.
    pub fn warp_to(
        &mut self,
        snapshot: &VesselSnapshot,
        table: &WarpConfig,
        time_left: f64,
        max_rate: f64,
    ) -> Result<Option<WarpRequest>, WarpRefusal> {
        let index = snapshot.warp.rate_index;
        let lookahead = |i: usize| table.lookahead.get(i).copied().unwrap_or(f64::INFINITY);
        let rate = |i: usize| table.rates.get(i).copied().unwrap_or(f64::INFINITY);

        if time_left < lookahead(index) || rate(index) > max_rate {
            return Ok(self.decrease(snapshot, true).ok());
        }
        if index + 1 < table.rates.len() && lookahead(index + 1) < time_left && rate(index + 1) <= max_rate {
            return self.increase(snapshot, table, false, max_rate).map(Some);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vessel::{SnapshotBuilder, WarpStatus};

    fn at(index: usize, altitude: f64) -> VesselSnapshot {
        let table = WarpConfig::default();
        SnapshotBuilder::new()
            .altitude(altitude)
            .warp(WarpStatus { rate_index: index, current_rate: table.rates[index] })
            .time(100.0)
            .build()
    }

    #[test]
    fn increase_above_floor_is_accepted() {
        let mut w = WarpScheduler::new();
        let req = w.increase(&at(0, 100_000.0), &WarpConfig::default(), true, 10_000.0).unwrap();
        assert_eq!(req, WarpRequest { rate_index: 1, instant: true });
    }

    #[test]
    fn below_altitude_floor_is_refused_while_airborne() {
        let table = WarpConfig::default();
        // next rate (index 3) needs 0.1 R = 60 km
        let s = at(2, 40_000.0);
        let s = VesselSnapshot { atmosphere_top: 0.0, ..s };
        let err = WarpScheduler::new().increase(&s, &table, true, 10_000.0).unwrap_err();
        assert!(matches!(err, WarpRefusal::BelowAltitudeFloor { .. }), "got {err:?}");

        let landed = VesselSnapshot { landed: true, ..s };
        assert!(WarpScheduler::new().increase(&landed, &table, true, 10_000.0).is_ok());
    }

    #[test]
    fn atmosphere_blocks_non_physics_rates() {
        let table = WarpConfig::default();
        let err = WarpScheduler::new().increase(&at(0, 30_000.0), &table, true, 10_000.0).unwrap_err();
        assert_eq!(err, WarpRefusal::InAtmosphere { rate: 5.0 });
    }

    #[test]
    fn settling_cap_and_maximum() {
        let table = WarpConfig::default();
        let mut w = WarpScheduler::new();
        let settling = VesselSnapshot { warp: WarpStatus { rate_index: 2, current_rate: 7.0 }, ..at(2, 200_000.0) };
        assert_eq!(w.increase(&settling, &table, true, 1e9), Err(WarpRefusal::Settling));
        assert!(matches!(w.increase(&at(4, 800_000.0), &table, true, 100.0), Err(WarpRefusal::AboveCap { .. })));
        assert_eq!(w.increase(&at(7, 5e6), &table, true, 1e9), Err(WarpRefusal::AtMaximum));
    }

    #[test]
    fn increases_are_rate_limited() {
        let table = WarpConfig::default();
        let mut w = WarpScheduler::new();
        let s = at(0, 100_000.0);
        assert!(w.increase(&s, &table, true, 1e9).is_ok());
        let soon = VesselSnapshot { time: 101.0, ..at(1, 100_000.0) };
        assert!(matches!(w.increase(&soon, &table, true, 1e9), Err(WarpRefusal::Cooldown { .. })));
        let later = VesselSnapshot { time: 102.5, ..at(1, 100_000.0) };
        assert!(w.increase(&later, &table, true, 1e9).is_ok());
    }

    #[test]
    fn decrease_minimum_and_physics() {
        let table = WarpConfig::default();
        let w = WarpScheduler::new();
        assert_eq!(w.decrease(&at(0, 1e5), true), Err(WarpRefusal::AtMinimum));
        assert_eq!(w.decrease(&at(3, 1e5), false), Ok(WarpRequest { rate_index: 2, instant: false }));
        assert_eq!(w.minimum(true).rate_index, 0);
        assert_eq!(w.physics(&at(5, 1e6), &table, true).map(|r| r.rate_index), Some(0));
        assert_eq!(w.physics(&at(0, 1e6), &table, true), None);
    }

    #[test]
    fn warp_to_slows_inside_lookahead_and_speeds_up_outside() {
        let table = WarpConfig::default();
        let mut w = WarpScheduler::new();
        // index 3 has a 100 s lookahead
        let s = at(3, 400_000.0);
        assert_eq!(w.warp_to(&s, &table, 50.0, 1e9).unwrap().map(|r| r.rate_index), Some(2));
        let up = w.warp_to(&s, &table, 1_000.0, 1e9).unwrap().unwrap();
        assert_eq!(up, WarpRequest { rate_index: 4, instant: false });
        // next lookahead (2000 s) does not fit in 1500 s
        let s = at(4, 400_000.0);
        assert_eq!(w.warp_to(&s, &table, 1_500.0, 1e9).unwrap(), None);
    }
}
