use crate::error::{Error, Result};
use crate::math::{is_finite_point, Point2d};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Unique ID of an [Rsu], as given in the roster file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RsuId(pub u64);

impl fmt::Display for RsuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A roadside unit at a fixed position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rsu {
    id: RsuId,
    position: Point2d,
}

impl Rsu {
    /// Creates a new RSU.
    pub fn new(id: RsuId, position: Point2d) -> Self {
        Self { id, position }
    }

    /// Gets the RSU's ID.
    pub fn id(&self) -> RsuId {
        self.id
    }

    /// The RSU's world space position.
    pub fn position(&self) -> Point2d {
        self.position
    }
}

/// The static set of RSUs available for a run, ordered by ID.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    rsus: Vec<Rsu>,
}

impl Roster {
    /// Creates a roster from a list of RSUs.
    /// Fails if two RSUs share an ID or a position is not finite.
    pub fn new(rsus: impl IntoIterator<Item = Rsu>) -> Result<Self> {
        let rsus = rsus
            .into_iter()
            .sorted_by_key(|rsu| rsu.id)
            .collect::<Vec<_>>();
        if let Some(rsu) = rsus.iter().find(|rsu| !is_finite_point(rsu.position)) {
            return Err(Error::MalformedRoster {
                line: None,
                reason: format!("RSU {} has a non-finite position", rsu.id),
            });
        }
        if let Some((a, _)) = rsus.iter().tuple_windows().find(|(a, b)| a.id == b.id) {
            return Err(Error::MalformedRoster {
                line: None,
                reason: format!("duplicate RSU id {}", a.id),
            });
        }
        Ok(Self { rsus })
    }

    /// Loads a roster file: a header line followed by `id,x,y` rows.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let roster = Self::from_reader(file)?;
        log::info!(
            "Loaded {} RSUs from {}",
            roster.len(),
            path.as_ref().display()
        );
        Ok(roster)
    }

    /// Parses a roster from any reader. Fields may be padded with whitespace.
    /// The header's column names are ignored.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rsus = vec![];
        let mut seen = BTreeMap::new();
        for (idx, record) in reader.records().enumerate() {
            // The header occupies line 1
            let line = idx + 2;
            let malformed = |reason: String| Error::MalformedRoster {
                line: Some(line),
                reason,
            };
            let record = record.map_err(|err| malformed(err.to_string()))?;
            let rsu = parse_row(&record).map_err(malformed)?;
            if let Some(first) = seen.insert(rsu.id, line) {
                return Err(malformed(format!(
                    "duplicate RSU id {}, first defined at line {}",
                    rsu.id, first
                )));
            }
            rsus.push(rsu);
        }

        Self::new(rsus)
    }

    /// Looks up an RSU by ID.
    pub fn get(&self, id: RsuId) -> Option<&Rsu> {
        self.rsus
            .binary_search_by_key(&id, |rsu| rsu.id)
            .ok()
            .map(|idx| &self.rsus[idx])
    }

    /// Returns an iterator over the RSUs in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Rsu> {
        self.rsus.iter()
    }

    /// The number of RSUs in the roster.
    pub fn len(&self) -> usize {
        self.rsus.len()
    }

    /// Whether the roster has no RSUs.
    pub fn is_empty(&self) -> bool {
        self.rsus.is_empty()
    }
}

fn parse_row(record: &csv::StringRecord) -> std::result::Result<Rsu, String> {
    if record.len() != 3 {
        return Err(format!("expected 3 fields, found {}", record.len()));
    }
    let id = record[0]
        .parse::<u64>()
        .map_err(|_| format!("invalid RSU id '{}'", &record[0]))?;
    let x = record[1]
        .parse::<f64>()
        .map_err(|_| format!("invalid x coordinate '{}'", &record[1]))?;
    let y = record[2]
        .parse::<f64>()
        .map_err(|_| format!("invalid y coordinate '{}'", &record[2]))?;
    let position = Point2d::new(x, y);
    if !is_finite_point(position) {
        return Err(format!("RSU {} has a non-finite position", id));
    }
    Ok(Rsu::new(RsuId(id), position))
}
