use crate::duration::ConnectionDurationEstimator;
use crate::error::Result;
use crate::link_quality::{LinkQuality, LinkQualityModel};
use crate::roster::{Roster, Rsu, RsuId};
use crate::scene::Scene;
use crate::scheduler::{HorizonOptimalScheduler, Schedule};
use crate::simulator::VehicleSnapshot;

/// Default number of ticks the lookahead strategy predicts ahead.
pub const DEFAULT_LOOKAHEAD: u32 = 2;

/// The RSU chosen for a vehicle at one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub rsu: RsuId,
    /// Signal strength of the chosen link.
    pub strength: f64,
    /// Expected connection duration in ticks, if the strategy estimates one.
    pub duration: Option<f64>,
    /// The value the strategy maximised, if it differs from `strength`.
    pub score: Option<f64>,
    /// The planned handover sequence, for strategies that plan ahead.
    pub schedule: Option<Schedule>,
}

/// Everything a strategy may read when deciding for one vehicle.
#[derive(Clone, Copy)]
pub struct DecisionContext<'a> {
    pub roster: &'a Roster,
    pub scene: &'a Scene<'a>,
    pub vehicle: &'a VehicleSnapshot,
}

/// Chooses the RSU a vehicle should associate with at the current tick.
///
/// Implementations only read the roster and the tick's snapshot, so a
/// single strategy may decide for many vehicles in parallel.
pub trait SelectionStrategy: Send + Sync {
    /// A short, stable name for logs.
    fn name(&self) -> &'static str;

    /// Decides for the context's vehicle. Returns `Ok(None)` when no RSU
    /// scores positively, and an error if the vehicle's kinematics are invalid.
    fn select(&self, ctx: &DecisionContext) -> Result<Option<Decision>>;
}

/// Picks the RSU with the strongest signal at the vehicle's current position.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedyCurrent {
    pub link: LinkQualityModel,
}

/// Picks the RSU maximising `strength × duration`, where strength is
/// predicted `lookahead` ticks ahead.
#[derive(Clone, Copy, Debug)]
pub struct GreedyLookahead {
    pub lookahead: u32,
    pub link: LinkQualityModel,
    pub duration: ConnectionDurationEstimator,
}

/// Follows the first step of the optimal handover schedule over the horizon.
#[derive(Clone, Copy, Debug)]
pub struct HorizonOptimal {
    pub scheduler: HorizonOptimalScheduler,
    pub duration: ConnectionDurationEstimator,
}

/// One scored RSU, with whatever the strategy needs to build its decision.
struct Candidate<'a, T> {
    rsu: &'a Rsu,
    score: f64,
    strength: f64,
    detail: T,
}

impl<T> Candidate<'_, T> {
    /// Infinite scores (a stationary vehicle under the naive ETA model) are
    /// ranked by strength instead.
    fn beats(&self, best_score: f64, best_strength: f64) -> bool {
        if self.score.is_infinite() && self.score == best_score {
            self.strength > best_strength
        } else {
            self.score > best_score
        }
    }
}

/// Keeps the first RSU with a strictly greater score than all before it.
/// RSUs are visited in ascending ID order, so ties go to the lowest ID.
fn first_max<'a, T>(
    candidates: impl Iterator<Item = Result<Candidate<'a, T>>>,
) -> Result<Option<Candidate<'a, T>>> {
    let mut best: Option<Candidate<'a, T>> = None;
    for candidate in candidates {
        let candidate = candidate?;
        let (best_score, best_strength) = best
            .as_ref()
            .map_or((0.0, 0.0), |b| (b.score, b.strength));
        if candidate.beats(best_score, best_strength) {
            best = Some(candidate);
        }
    }
    Ok(best)
}

impl GreedyCurrent {
    fn quality(&self, ctx: &DecisionContext, rsu: &Rsu) -> LinkQuality {
        let obstacles = ctx.scene.obstacles_at(0.0, &ctx.vehicle.id);
        self.link
            .evaluate(ctx.vehicle.position, rsu.position(), obstacles)
    }
}

impl SelectionStrategy for GreedyCurrent {
    fn name(&self) -> &'static str {
        "greedy-current"
    }

    fn select(&self, ctx: &DecisionContext) -> Result<Option<Decision>> {
        ctx.vehicle.kinematics()?;
        let best = first_max(ctx.roster.iter().map(|rsu| -> Result<_> {
            let quality = self.quality(ctx, rsu);
            Ok(Candidate {
                rsu,
                score: quality.strength,
                strength: quality.strength,
                detail: (),
            })
        }))?;
        Ok(best.map(|best| Decision {
            rsu: best.rsu.id(),
            strength: best.strength,
            duration: None,
            score: None,
            schedule: None,
        }))
    }
}

impl SelectionStrategy for GreedyLookahead {
    fn name(&self) -> &'static str {
        "greedy-lookahead"
    }

    fn select(&self, ctx: &DecisionContext) -> Result<Option<Decision>> {
        let kin = ctx.vehicle.kinematics()?;
        let ahead = f64::from(self.lookahead);
        let predicted = kin.predict(ahead)?;
        let obstacles = ctx
            .scene
            .obstacles_at(ahead, &ctx.vehicle.id)
            .collect::<Vec<_>>();

        let best = first_max(ctx.roster.iter().map(|rsu| -> Result<_> {
            let quality = self.link.evaluate(predicted, rsu.position(), &obstacles);
            let duration = self
                .duration
                .estimate(&kin, rsu, ctx.scene, &ctx.vehicle.id)?;
            Ok(Candidate {
                rsu,
                score: quality.strength * duration,
                strength: quality.strength,
                detail: duration,
            })
        }))?;

        Ok(best.map(|best| Decision {
            rsu: best.rsu.id(),
            strength: best.strength,
            duration: Some(best.detail),
            score: Some(best.score),
            schedule: None,
        }))
    }
}

impl SelectionStrategy for HorizonOptimal {
    fn name(&self) -> &'static str {
        "horizon-optimal"
    }

    fn select(&self, ctx: &DecisionContext) -> Result<Option<Decision>> {
        let kin = ctx.vehicle.kinematics()?;
        let schedule = self
            .scheduler
            .plan(&kin, ctx.roster, ctx.scene, &ctx.vehicle.id)?;
        let Some(rsu) = schedule
            .first()
            .and_then(|(_, id)| ctx.roster.get(id))
        else {
            return Ok(None);
        };

        let obstacles = ctx.scene.obstacles_at(0.0, &ctx.vehicle.id);
        let quality = self
            .scheduler
            .link
            .evaluate(kin.position, rsu.position(), obstacles);
        let duration = self
            .duration
            .estimate(&kin, rsu, ctx.scene, &ctx.vehicle.id)?;

        Ok(Some(Decision {
            rsu: rsu.id(),
            strength: quality.strength,
            duration: Some(duration),
            score: Some(schedule.total_quality()),
            schedule: Some(schedule),
        }))
    }
}
