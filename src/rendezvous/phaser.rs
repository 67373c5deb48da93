use crate::orbital::Orbit;

use super::pointing::PointAt;
use super::search::{self, ApsisTimes};

// ---------------------------------------------------------------------------
// Orbital phasing: six burns and coasts that bring the ship to the target
// ---------------------------------------------------------------------------

/// Seconds before an apsis at which a waiting state hands over.
const APSIS_LEAD: f64 = 5.0;
/// A matching burn is considered done within this speed error, m/s.
const SPEED_TOLERANCE: f64 = 10.0;
/// After a matching burn, coast until the next apsis is this far away, s.
const COAST_CLEARANCE: f64 = 10.0;
/// Apsis-crossing separation good enough to stop the rendezvous burn, s.
const SEPARATION_GOAL: f64 = 5.0;
/// Time to rendezvous at which the final velocity match starts, s.
const RENDEZVOUS_LEAD: f64 = 2.0;
const MATCH_FAST: f64 = 15.0;
const MATCH_DONE: f64 = 5.0;
/// Heading error (degrees) below which burns are allowed.
const HEADING_LIMIT: f64 = 5.0;

/// Phaser progress. States are ordered and only ever advance to their
/// successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PhaserState {
    #[default]
    WaitForTargetApsis,
    BurnToMatchNextApsis,
    WaitForTargetApsis2,
    BurnToRendezvous,
    WaitForRendezvous,
    BurnToMatchVelocity,
}

impl PhaserState {
    pub fn next(self) -> Option<Self> {
        use PhaserState::*;
        match self {
            WaitForTargetApsis => Some(BurnToMatchNextApsis),
            BurnToMatchNextApsis => Some(WaitForTargetApsis2),
            WaitForTargetApsis2 => Some(BurnToRendezvous),
            BurnToRendezvous => Some(WaitForRendezvous),
            WaitForRendezvous => Some(BurnToMatchVelocity),
            BurnToMatchVelocity => None,
        }
    }

    /// Coasting states, where time warp is worth asking for.
    pub fn is_waiting(self) -> bool {
        matches!(
            self,
            PhaserState::WaitForTargetApsis | PhaserState::WaitForTargetApsis2 | PhaserState::WaitForRendezvous
        )
    }
}

/// What the phaser needs to see each tick.
#[derive(Debug, Clone, Copy)]
pub struct PhaserInputs<'a> {
    pub ship: &'a dyn Orbit,
    pub target: &'a dyn Orbit,
    /// |ship velocity - target velocity|, m/s.
    pub relative_speed: f64,
    /// Degrees between the attitude target and the nose.
    pub heading_error: f64,
}

/// One tick of phaser output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaserCommand {
    pub point_at: PointAt,
    /// Main throttle, [0, 1].
    pub throttle: f64,
    /// Seconds until the current waiting state expects to hand over.
    pub time_left: Option<f64>,
    pub done: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Phaser {
    state: PhaserState,
    velocity_goal: f64,
    burn_complete: bool,
    point_at: PointAt,
    done: bool,
}

impl Phaser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PhaserState {
        self.state
    }

    /// Target speed the matching burn aims for, m/s.
    pub fn velocity_goal(&self) -> f64 {
        self.velocity_goal
    }

    pub fn burn_complete(&self) -> bool {
        self.burn_complete
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            tracing::info!(from = ?self.state, to = ?next, "phaser advanced");
            self.state = next;
        }
    }

    pub fn step(&mut self, input: &PhaserInputs<'_>) -> PhaserCommand {
        let mut throttle = 0.0;
        let mut time_left = None;
        let heading_ok = input.heading_error < HEADING_LIMIT;

        match self.state {
            PhaserState::WaitForTargetApsis => {
                let t = search::time_to_next_target_apsis(input.ship, input.target);
                self.point_at = if input.ship.speed_after(t) > input.target.speed_after(t) {
                    PointAt::Retrograde
                } else {
                    PointAt::Prograde
                };
                time_left = Some(t - APSIS_LEAD);
                if t < APSIS_LEAD {
                    let further = search::time_to_further_target_apsis(input.ship, input.target);
                    self.velocity_goal = input.target.speed_after(further);
                    self.burn_complete = false;
                    self.advance();
                }
            }
            PhaserState::BurnToMatchNextApsis => {
                let further = search::time_to_further_target_apsis(input.ship, input.target);
                let predicted = input.ship.speed_after(further);
                if heading_ok && !self.burn_complete {
                    throttle = 1.0;
                }
                if (predicted - self.velocity_goal).abs() < SPEED_TOLERANCE {
                    self.burn_complete = true;
                    throttle = 0.0;
                }
                if self.burn_complete
                    && search::time_to_next_target_apsis(input.ship, input.target) > COAST_CLEARANCE
                {
                    self.advance();
                }
            }
            PhaserState::WaitForTargetApsis2 => {
                self.point_at = PointAt::Prograde;
                let t = search::time_to_next_target_apsis(input.ship, input.target);
                time_left = Some(t - APSIS_LEAD);
                if t < APSIS_LEAD {
                    self.advance();
                }
            }
            PhaserState::BurnToRendezvous => {
                let estimate = search::nearest_rendezvous(&ApsisTimes::compute(input.ship, input.target));
                if estimate.min_delta > SEPARATION_GOAL {
                    throttle = 0.25;
                } else {
                    self.advance();
                }
            }
            PhaserState::WaitForRendezvous => {
                let estimate = search::nearest_rendezvous(&ApsisTimes::compute(input.ship, input.target));
                time_left = Some(estimate.time_to_rendezvous - RENDEZVOUS_LEAD);
                if estimate.time_to_rendezvous < RENDEZVOUS_LEAD {
                    self.advance();
                }
            }
            PhaserState::BurnToMatchVelocity => {
                if input.relative_speed > MATCH_DONE {
                    self.point_at = PointAt::RelativeVelocityAway;
                    if heading_ok {
                        throttle = if input.relative_speed > MATCH_FAST { 1.0 } else { 0.2 };
                    }
                } else {
                    tracing::info!(relative_speed = input.relative_speed, "phasing complete");
                    self.done = true;
                }
            }
        }

        PhaserCommand { point_at: self.point_at, throttle, time_left, done: self.done }
    }
}
