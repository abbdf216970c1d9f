use thiserror::Error;

/// A specialised result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading inputs or running the decision loop.
///
/// A vehicle for which no RSU scores positively, or for which no schedule
/// reaches the end of the horizon, is not an error; those outcomes are
/// represented by an absent [Decision](crate::Decision) and the trivial
/// [Schedule](crate::Schedule) respectively.
#[derive(Error, Debug)]
pub enum Error {
    #[error("simulator unavailable: {0}")]
    SimulatorUnavailable(String),

    /// `line` is the 1-based line of the roster file, when the roster was read from one.
    #[error("malformed roster{}: {reason}", at_line(.line))]
    MalformedRoster {
        line: Option<usize>,
        reason: String,
    },

    #[error("invalid kinematics: {reason}")]
    InvalidKinematics { reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_kinematics(reason: impl Into<String>) -> Self {
        Error::InvalidKinematics {
            reason: reason.into(),
        }
    }

    /// Whether the error must abort the run.
    /// Only kinematics errors are confined to a single vehicle and tick.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::InvalidKinematics { .. })
    }
}

fn at_line(line: &Option<usize>) -> String {
    line.map(|line| format!(" at line {}", line))
        .unwrap_or_default()
}
