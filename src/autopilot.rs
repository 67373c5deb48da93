use std::collections::HashSet;

use crate::config::AutopilotConfig;
use crate::diagnostics::Diagnostic;
use crate::error::ClaimError;
use crate::gnc::controller::{dispatch, Behavior, TickContext};
use crate::gnc::{AttitudeController, Guidance, TranslationController};
use crate::rendezvous::RendezvousPlanner;
use crate::vessel::{ControlState, TargetCandidate, VesselId, VesselSnapshot};
use crate::warp::WarpRequest;

// ---------------------------------------------------------------------------
// Vessel ownership
// ---------------------------------------------------------------------------

/// Tracks which vessels already have an autopilot attached.
#[derive(Debug, Default)]
pub struct VesselRegistry {
    claimed: HashSet<VesselId>,
}

/// Proof that the holder is the only autopilot for a vessel. Hand it back to
/// [`VesselRegistry::release`] when done.
#[derive(Debug, PartialEq, Eq)]
pub struct VesselClaim {
    id: VesselId,
}

impl VesselClaim {
    pub fn id(&self) -> VesselId {
        self.id
    }
}

impl VesselRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, id: VesselId) -> Result<VesselClaim, ClaimError> {
        if !self.claimed.insert(id) {
            return Err(ClaimError::AlreadyClaimed(id));
        }
        tracing::debug!(id, "vessel claimed");
        Ok(VesselClaim { id })
    }

    pub fn release(&mut self, claim: VesselClaim) {
        self.claimed.remove(&claim.id);
        tracing::debug!(id = claim.id, "vessel released");
    }

    pub fn is_claimed(&self, id: VesselId) -> bool {
        self.claimed.contains(&id)
    }
}

// ---------------------------------------------------------------------------
// Autopilot
// ---------------------------------------------------------------------------

/// What the host should act on after a tick, besides the control axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Attitude-loop effort, Σ min(|act|, 1).
    pub stress: f64,
    pub warp_request: Option<WarpRequest>,
    pub deploy_gear: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// The guidance core for one vessel.
///
/// Runs its behaviors in order (rendezvous planner, translation, attitude)
/// each tick, delivering setpoint changes to all of them between runs.
///
/// The autopilot holds its [`VesselClaim`] but not the registry. Dropping it
/// without [`Autopilot::into_claim`] and [`VesselRegistry::release`] leaves
/// the vessel claimed.
pub struct Autopilot {
    claim: VesselClaim,
    config: AutopilotConfig,
    guidance: Guidance,
    behaviors: Vec<Box<dyn Behavior>>,
}

impl Autopilot {
    pub fn new(claim: VesselClaim, config: AutopilotConfig) -> Self {
        let t = &config.translation;
        let behaviors: Vec<Box<dyn Behavior>> = vec![
            Box::new(RendezvousPlanner::new()),
            Box::new(TranslationController::new(t.kp, t.ki, t.kd)),
            Box::new(AttitudeController::new(&config.attitude)),
        ];
        Self { guidance: Guidance::new(&config), claim, config, behaviors }
    }

    pub fn vessel(&self) -> VesselId {
        self.claim.id
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    pub fn guidance(&self) -> &Guidance {
        &self.guidance
    }

    /// Host-side command access. Commands issued here count as the pilot's.
    pub fn guidance_mut(&mut self) -> &mut Guidance {
        &mut self.guidance
    }

    /// Append a behavior; it runs after the built-in ones.
    pub fn add_behavior(&mut self, behavior: Box<dyn Behavior>) {
        self.behaviors.push(behavior);
    }

    pub fn find<T: Behavior>(&self) -> Option<&T> {
        self.behaviors.iter().find_map(|b| b.as_any().downcast_ref::<T>())
    }

    pub fn find_mut<T: Behavior>(&mut self) -> Option<&mut T> {
        self.behaviors.iter_mut().find_map(|b| b.as_any_mut().downcast_mut::<T>())
    }

    /// Select a target by id, or clear the selection with `None`.
    ///
    /// Returns false (and leaves the selection alone) if the id is not among
    /// this tick's candidates.
    pub fn select_target(&mut self, snapshot: &VesselSnapshot, id: Option<VesselId>) -> bool {
        if let Some(id) = id {
            if id == snapshot.id || snapshot.candidate(id).is_none() {
                tracing::debug!(id, "no such target");
                return false;
            }
        }
        self.guidance.select_target(id);
        self.dispatch_events();
        true
    }

    /// Reset every behavior's internal state.
    pub fn reset(&mut self) {
        for behavior in &mut self.behaviors {
            behavior.reset();
        }
    }

    /// Give up the vessel so another autopilot can claim it.
    pub fn into_claim(mut self) -> VesselClaim {
        self.guidance.release_control();
        self.claim
    }

    /// Run one fixed physics step. `controls` carries the pilot's input in and
    /// the merged commands out.
    pub fn tick(&mut self, snapshot: &VesselSnapshot, controls: &mut ControlState) -> TickReport {
        if snapshot.id != self.claim.id {
            tracing::warn!(expected = self.claim.id, got = snapshot.id, "snapshot for another vessel ignored");
            return TickReport::default();
        }
        if self.guidance.take_neutral_pending() {
            controls.neutralize();
        }

        let target = self.validate_target(snapshot);
        self.dispatch_events();

        let mut stress = 0.0;
        for i in 0..self.behaviors.len() {
            let mut ctx = TickContext {
                snapshot,
                target,
                config: &self.config,
                guidance: &mut self.guidance,
                controls,
                stress: 0.0,
            };
            self.behaviors[i].on_tick(&mut ctx);
            stress += ctx.stress;
            self.dispatch_events();
        }

        TickReport {
            stress,
            warp_request: self.guidance.take_warp_request(),
            deploy_gear: self.guidance.take_gear_request(),
            diagnostics: self.guidance.take_diagnostics(),
        }
    }

    /// Look the selected target up in this tick's candidates. A vanished
    /// target is dropped and whoever owns the controls loses them.
    fn validate_target<'s>(&mut self, snapshot: &'s VesselSnapshot) -> Option<&'s TargetCandidate> {
        let id = self.guidance.target()?;
        let found = snapshot.candidate(id);
        if found.is_none() {
            self.guidance.lose_target();
            if self.guidance.owner().is_some() {
                self.guidance.release_control();
            }
        }
        found
    }

    fn dispatch_events(&mut self) {
        for event in self.guidance.take_events() {
            for behavior in &mut self.behaviors {
                dispatch(behavior.as_mut(), &event);
            }
        }
    }
}
