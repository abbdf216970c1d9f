use crate::duration::{
    ConnectionDurationEstimator, DurationModel, DEFAULT_MAX_DURATION, DEFAULT_RANGE_THRESHOLD,
    DEFAULT_STEP_SIZE,
};
use crate::error::{Error, Result};
use crate::link_quality::{LinkQualityModel, SOFT_BLOCK_PENALTY, STRONG_BLOCK_PENALTY};
use crate::obstacle::ObstructionPolicy;
use crate::scheduler::{HorizonOptimalScheduler, DEFAULT_HORIZON};
use crate::strategy::{
    GreedyCurrent, GreedyLookahead, HorizonOptimal, SelectionStrategy, DEFAULT_LOOKAHEAD,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Default number of ticks a run may last.
pub const DEFAULT_TICK_BUDGET: usize = 500;

/// The RSU selection strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Strongest signal at the current position.
    GreedyCurrent,
    /// Best `strength × duration` at a predicted position.
    #[default]
    GreedyLookahead,
    /// First step of the optimal schedule over the horizon.
    HorizonOptimal,
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "greedy-current" => Ok(StrategyKind::GreedyCurrent),
            "greedy-lookahead" => Ok(StrategyKind::GreedyLookahead),
            "horizon-optimal" => Ok(StrategyKind::HorizonOptimal),
            other => Err(Error::InvalidConfig(format!("unknown strategy '{}'", other))),
        }
    }
}

impl FromStr for DurationModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rollout" => Ok(DurationModel::Rollout),
            "naive_eta" => Ok(DurationModel::NaiveEta),
            other => Err(Error::InvalidConfig(format!(
                "unknown duration model '{}'",
                other
            ))),
        }
    }
}

/// Run configuration. Every field has a default, so a partial JSON
/// document (or none at all) is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The selection strategy.
    pub strategy: StrategyKind,
    /// Distance beyond which an RSU is out of range.
    pub range_threshold: f64,
    /// Distance multiplier for obstructed links. When unset, 5.0 for the
    /// greedy strategies and 1.5 for horizon-optimal.
    pub block_penalty: Option<f64>,
    /// Obstruction test. When unset, bounding-region for the greedy
    /// strategies and segment-proximity for horizon-optimal.
    pub obstruction: Option<ObstructionPolicy>,
    /// Planning horizon of horizon-optimal, in ticks.
    pub horizon: usize,
    /// How far ahead greedy-lookahead predicts, in ticks.
    pub lookahead: u32,
    /// The maximum number of ticks to run.
    pub tick_budget: usize,
    /// How connection duration is estimated.
    pub duration_model: DurationModel,
    /// The longest rollout considered, in ticks.
    pub max_duration: u32,
    /// The spacing of rollout samples, in ticks.
    pub step_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            range_threshold: DEFAULT_RANGE_THRESHOLD,
            block_penalty: None,
            obstruction: None,
            horizon: DEFAULT_HORIZON,
            lookahead: DEFAULT_LOOKAHEAD,
            tick_budget: DEFAULT_TICK_BUDGET,
            duration_model: DurationModel::default(),
            max_duration: DEFAULT_MAX_DURATION,
            step_size: DEFAULT_STEP_SIZE,
        }
    }
}

impl Config {
    /// Loads a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read(path.as_ref())?;
        let config: Config = serde_json::from_slice(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every parameter is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.range_threshold.is_finite() || self.range_threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "range threshold must be positive, got {}",
                self.range_threshold
            )));
        }
        if let Some(penalty) = self.block_penalty {
            if !penalty.is_finite() || penalty < 1.0 {
                return Err(Error::InvalidConfig(format!(
                    "block penalty must be at least 1, got {}",
                    penalty
                )));
            }
        }
        if self.horizon == 0 {
            return Err(Error::InvalidConfig("horizon must be at least 1".into()));
        }
        if self.step_size == 0 {
            return Err(Error::InvalidConfig("step size must be at least 1".into()));
        }
        if self.tick_budget == 0 {
            return Err(Error::InvalidConfig("tick budget must be at least 1".into()));
        }
        Ok(())
    }

    /// The obstruction policy in effect for the configured strategy.
    pub fn obstruction_policy(&self) -> ObstructionPolicy {
        self.obstruction.unwrap_or(match self.strategy {
            StrategyKind::HorizonOptimal => ObstructionPolicy::SegmentProximity,
            _ => ObstructionPolicy::BoundingRegion,
        })
    }

    /// The block penalty in effect for the configured strategy.
    pub fn block_penalty(&self) -> f64 {
        self.block_penalty.unwrap_or(match self.strategy {
            StrategyKind::HorizonOptimal => SOFT_BLOCK_PENALTY,
            _ => STRONG_BLOCK_PENALTY,
        })
    }

    /// The link quality model in effect for the configured strategy.
    pub fn link_model(&self) -> LinkQualityModel {
        LinkQualityModel {
            policy: self.obstruction_policy(),
            block_penalty: self.block_penalty(),
        }
    }

    /// The connection duration estimator in effect for the configured strategy.
    pub fn duration_estimator(&self) -> ConnectionDurationEstimator {
        ConnectionDurationEstimator {
            model: self.duration_model,
            max_duration: self.max_duration,
            step_size: self.step_size,
            range_threshold: self.range_threshold,
            obstruction: Some(self.obstruction_policy()),
        }
    }

    /// Builds the configured selection strategy.
    pub fn build_strategy(&self) -> Box<dyn SelectionStrategy> {
        match self.strategy {
            StrategyKind::GreedyCurrent => Box::new(GreedyCurrent {
                link: self.link_model(),
            }),
            StrategyKind::GreedyLookahead => Box::new(GreedyLookahead {
                lookahead: self.lookahead,
                link: self.link_model(),
                duration: self.duration_estimator(),
            }),
            StrategyKind::HorizonOptimal => Box::new(HorizonOptimal {
                scheduler: HorizonOptimalScheduler {
                    horizon: self.horizon,
                    range_threshold: self.range_threshold,
                    link: self.link_model(),
                },
                duration: self.duration_estimator(),
            }),
        }
    }
}
