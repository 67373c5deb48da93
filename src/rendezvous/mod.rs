pub mod align;
pub mod phaser;
pub mod pointing;
pub mod relative;
pub mod search;
pub mod target;

pub use align::PlaneAligner;
pub use phaser::{Phaser, PhaserState};
pub use pointing::PointAt;
pub use search::{nearest_rendezvous, ApsisTimes, RendezvousEstimate, SyncMode, SyncTable, SyncTracker};

use std::any::Any;

use nalgebra::Vector3;

use crate::gnc::controller::{Behavior, TickContext};
use crate::gnc::guidance::Owner;
use crate::gnc::setpoint::ControlMode;
use crate::vessel::{TargetCandidate, VesselId};

use align::AlignInputs;
use phaser::PhaserInputs;

const NAME: Owner = "rendezvous";

/// Translation-thruster aid currently flying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelativeAid {
    #[default]
    None,
    KillVelocity,
    HomeOnOffset,
}

/// Rendezvous behavior: plane alignment, orbital phasing, manual pointing,
/// the proximity aids and the sync table, all against the selected target.
///
/// Automatic modes and manual pointing take control ownership while engaged
/// and give it back once nothing that needs it is left running.
#[derive(Debug, Default)]
pub struct RendezvousPlanner {
    aligner: Option<PlaneAligner>,
    phaser: Option<Phaser>,
    point_at: Option<PointAt>,
    aid: RelativeAid,
    sync: Option<SyncTracker>,
    owns_control: bool,
}

impl RendezvousPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engage_align(&mut self) {
        tracing::info!("plane alignment engaged");
        self.aligner = Some(PlaneAligner::new());
    }

    pub fn engage_phaser(&mut self) {
        tracing::info!("phaser engaged");
        self.phaser = Some(Phaser::new());
    }

    /// Hold a manual pointing mode; `None` lets go of the attitude.
    pub fn point_at(&mut self, at: Option<PointAt>) {
        self.point_at = at;
    }

    pub fn set_relative_aid(&mut self, aid: RelativeAid) {
        self.aid = aid;
    }

    /// Keep a sync table for `mode`; `None` stops tracking.
    pub fn set_sync(&mut self, mode: Option<SyncMode>) {
        self.sync = mode.map(SyncTracker::new);
    }

    pub fn aligner(&self) -> Option<&PlaneAligner> {
        self.aligner.as_ref()
    }

    pub fn phaser(&self) -> Option<&Phaser> {
        self.phaser.as_ref()
    }

    pub fn relative_aid(&self) -> RelativeAid {
        self.aid
    }

    pub fn sync_table(&self) -> Option<&SyncTable> {
        self.sync.as_ref().and_then(|s| s.table())
    }

    fn needs_control(&self) -> bool {
        self.aligner.is_some() || self.phaser.is_some() || self.point_at.is_some()
    }

    /// Stop every mode. Control is handed back on the next tick.
    pub fn disengage(&mut self) {
        if self.needs_control() || self.aid != RelativeAid::None {
            tracing::info!("rendezvous disengaged");
        }
        self.aligner = None;
        self.phaser = None;
        self.point_at = None;
        self.aid = RelativeAid::None;
    }

    fn hand_back(&mut self, ctx: &mut TickContext<'_>) {
        if self.owns_control && !self.needs_control() {
            self.owns_control = false;
            if ctx.guidance.owner() == Some(NAME) {
                ctx.guidance.release_control();
            }
        }
    }

    fn fly_aid(&mut self, ctx: &mut TickContext<'_>, target: &TargetCandidate) {
        let cfg = &ctx.config.rendezvous;
        let cmd = match self.aid {
            RelativeAid::None => return,
            RelativeAid::KillVelocity => relative::kill_relative_velocity(ctx.snapshot, target, cfg.translation_gain),
            RelativeAid::HomeOnOffset => {
                let offset = Vector3::from(cfg.home_offset);
                relative::home_on_offset(ctx.snapshot, target, &offset, cfg.translation_gain)
            }
        };
        ctx.controls.set_translation(cmd.axes.x, cmd.axes.y, cmd.axes.z);
        if cmd.done {
            tracing::debug!(aid = ?self.aid, "relative aid finished");
            self.aid = RelativeAid::None;
        }
    }

    /// Run the automatic modes. Returns the pointing and throttle they want,
    /// and how long the phaser expects to coast.
    fn fly_automatic(&mut self, ctx: &TickContext<'_>, target: &TargetCandidate) -> (Option<PointAt>, Option<f64>, Option<f64>) {
        let s = ctx.snapshot;
        let heading_error = ctx.guidance.angle_from_target(s, Some(target));
        let mut point = self.point_at;
        let mut throttle = None;
        let mut coast = None;

        if let Some(aligner) = self.aligner.as_mut() {
            let cmd = aligner.step(&AlignInputs {
                time_to_ascending_node: s.orbit.time_to_relative_ascending_node(&*target.orbit),
                time_to_descending_node: s.orbit.time_to_relative_descending_node(&*target.orbit),
                relative_inclination: target::relative_inclination(s, target),
                heading_error,
            });
            point = Some(cmd.point_at);
            throttle = Some(cmd.throttle);
            if cmd.done {
                self.aligner = None;
            } else if !aligner.burn_triggered() {
                coast = Some(cmd.time_to_node);
            }
        }

        if let Some(phaser) = self.phaser.as_mut() {
            let cmd = phaser.step(&PhaserInputs {
                ship: &*s.orbit,
                target: &*target.orbit,
                relative_speed: target::relative_velocity(s, target).norm(),
                heading_error,
            });
            point = Some(cmd.point_at);
            throttle = Some(cmd.throttle);
            coast = cmd.time_left;
            if cmd.done {
                self.phaser = None;
            }
        }
        (point, throttle, coast)
    }

    fn auto_warp(&self, ctx: &mut TickContext<'_>, coast: Option<f64>) {
        let cfg = &ctx.config.rendezvous;
        if !cfg.auto_warp {
            return;
        }
        let result = match coast {
            Some(time_left) => ctx.guidance.warp_to(ctx.snapshot, &ctx.config.warp, time_left, cfg.max_warp_rate, Some(NAME)),
            None if ctx.snapshot.warp.rate_index > 0 => ctx.guidance.warp_minimum(false, Some(NAME)),
            None => Ok(()),
        };
        if let Err(refusal) = result {
            tracing::trace!(%refusal, "auto warp held");
        }
    }
}

impl Behavior for RendezvousPlanner {
    fn on_tick(&mut self, ctx: &mut TickContext<'_>) {
        let Some(target) = ctx.target else {
            if self.needs_control() || self.aid != RelativeAid::None {
                tracing::warn!("rendezvous mode without a target");
                self.disengage();
            }
            self.hand_back(ctx);
            return;
        };

        if let Some(sync) = self.sync.as_mut() {
            sync.update(ctx.snapshot.time, &*ctx.snapshot.orbit, &*target.orbit);
        }

        self.fly_aid(ctx, target);

        if !self.needs_control() {
            self.hand_back(ctx);
            return;
        }
        if !self.owns_control {
            ctx.guidance.claim_control(NAME);
            self.owns_control = true;
        }

        let (point, throttle, coast) = self.fly_automatic(ctx, target);
        if let Some(at) = point {
            pointing::point(ctx.guidance, at, ctx.snapshot, target, Some(NAME));
        }
        if let Some(throttle) = throttle {
            ctx.guidance.set_mode(ControlMode::Direct, Some(NAME));
            ctx.guidance.set_speed_target(throttle * 100.0, Some(NAME));
        }
        if self.aligner.is_some() || self.phaser.is_some() {
            self.auto_warp(ctx, coast);
        } else if throttle.is_some() {
            // last automatic mode just finished
            ctx.guidance.set_speed_target(0.0, Some(NAME));
            self.hand_back(ctx);
        }
    }

    fn on_control_lost(&mut self, owner: Owner) {
        if owner == NAME && self.owns_control {
            self.owns_control = false;
            self.disengage();
        }
    }

    fn on_target_lost(&mut self, id: VesselId) {
        tracing::warn!(id, "rendezvous target lost");
        self.disengage();
        if let Some(sync) = self.sync.as_mut() {
            sync.invalidate();
        }
    }

    fn reset(&mut self) {
        self.disengage();
        self.sync = None;
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
