//! Connection records emitted by the decision loop.

use crate::error::Result;
use crate::roster::RsuId;
use crate::simulator::VehicleId;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// One association decision, for one vehicle at one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub tick: usize,
    pub vehicle_id: VehicleId,
    pub rsu_id: RsuId,
    pub signal_strength: f64,
    pub estimated_duration: Option<f64>,
    pub score: Option<f64>,
}

/// Receives the records of each tick, in tick order.
pub trait RecordSink {
    /// Accepts every record of one tick. Called once per processed tick,
    /// before the simulator is advanced again.
    fn emit(&mut self, tick: usize, records: &[ConnectionRecord]) -> Result<()>;

    /// Flushes any buffered output at the end of a run.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The column names of the connection log, in record field order.
pub const RECORD_COLUMNS: [&str; 6] = [
    "tick",
    "vehicle_id",
    "rsu_id",
    "signal_strength",
    "estimated_duration",
    "score",
];

/// Writes records as CSV rows under a header naming the columns. The header
/// is written even when a run produces no records.
pub struct CsvRecordWriter<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
}

impl<W: Write> CsvRecordWriter<W> {
    /// Creates a writer. Nothing is written until the first tick is emitted.
    pub fn new(output: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(output),
            header_written: false,
        }
    }

    fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            self.writer.write_record(RECORD_COLUMNS)?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| crate::error::Error::Io(err.into_error()))
    }
}

impl<W: Write> RecordSink for CsvRecordWriter<W> {
    fn emit(&mut self, _tick: usize, records: &[ConnectionRecord]) -> Result<()> {
        self.write_header()?;
        for record in records {
            self.writer.serialize(record)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.write_header()?;
        self.writer.flush()?;
        Ok(())
    }
}

/// The append-only history of associations over a run, keyed by tick and vehicle.
///
/// Which vehicles an RSU has served is derived from this log rather than
/// stored on the RSU.
#[derive(Clone, Debug, Default)]
pub struct AssociationLog {
    records: Vec<ConnectionRecord>,
    index: BTreeMap<(usize, VehicleId), usize>,
}

impl AssociationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a record. A later record for the same tick and vehicle
    /// replaces the earlier one in lookups.
    pub fn push(&mut self, record: ConnectionRecord) {
        let key = (record.tick, record.vehicle_id.clone());
        self.index.insert(key, self.records.len());
        self.records.push(record);
    }

    /// All records, in the order they were appended.
    pub fn records(&self) -> &[ConnectionRecord] {
        &self.records
    }

    /// The number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Gets the record of a vehicle at a tick.
    pub fn get(&self, tick: usize, vehicle: &VehicleId) -> Option<&ConnectionRecord> {
        self.index
            .get(&(tick, vehicle.clone()))
            .map(|idx| &self.records[*idx])
    }

    /// The records of one tick.
    pub fn at_tick(&self, tick: usize) -> impl Iterator<Item = &ConnectionRecord> {
        self.records.iter().filter(move |record| record.tick == tick)
    }

    /// The distinct vehicles ever associated with an RSU, in ID order.
    pub fn served_vehicles(&self, rsu: RsuId) -> Vec<&VehicleId> {
        self.records
            .iter()
            .filter(|record| record.rsu_id == rsu)
            .map(|record| &record.vehicle_id)
            .sorted()
            .dedup()
            .collect()
    }

    /// The number of times a vehicle's serving RSU changed between
    /// consecutive records of that vehicle.
    pub fn handovers(&self, vehicle: &VehicleId) -> usize {
        self.records
            .iter()
            .filter(|record| record.vehicle_id == *vehicle)
            .tuple_windows()
            .filter(|(a, b)| a.rsu_id != b.rsu_id)
            .count()
    }
}

impl RecordSink for AssociationLog {
    fn emit(&mut self, _tick: usize, records: &[ConnectionRecord]) -> Result<()> {
        for record in records {
            self.push(record.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(tick: usize, vehicle: &str, rsu: u64) -> ConnectionRecord {
        ConnectionRecord {
            tick,
            vehicle_id: vehicle.into(),
            rsu_id: RsuId(rsu),
            signal_strength: 0.5,
            estimated_duration: if rsu == 2 { Some(3.0) } else { None },
            score: None,
        }
    }

    #[test]
    fn csv_output() {
        let mut writer = CsvRecordWriter::new(vec![]);
        writer
            .emit(0, &[record(0, "veh0", 1), record(0, "veh1", 2)])
            .unwrap();
        writer.finish().unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "tick,vehicle_id,rsu_id,signal_strength,estimated_duration,score",
                "0,veh0,1,0.5,,",
                "0,veh1,2,0.5,3.0,",
            ]
        );
    }

    #[test]
    fn header_without_records() {
        let mut writer = CsvRecordWriter::new(vec![]);
        writer.emit(0, &[]).unwrap();
        writer.emit(1, &[]).unwrap();
        writer.finish().unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(
            output,
            "tick,vehicle_id,rsu_id,signal_strength,estimated_duration,score\n"
        );

        let mut writer = CsvRecordWriter::new(vec![]);
        writer.finish().unwrap();
        assert_eq!(writer.into_inner().unwrap().len(), output.len());
    }

    #[test]
    fn served_vehicles_are_derived() {
        let mut log = AssociationLog::new();
        log.emit(0, &[record(0, "b", 1), record(0, "a", 1)]).unwrap();
        log.emit(1, &[record(1, "b", 1), record(1, "a", 2)]).unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(
            log.served_vehicles(RsuId(1)),
            vec![&VehicleId::from("a"), &VehicleId::from("b")]
        );
        assert_eq!(log.served_vehicles(RsuId(2)), vec![&VehicleId::from("a")]);
        assert!(log.served_vehicles(RsuId(3)).is_empty());
    }

    #[test]
    fn lookup_and_handovers() {
        let mut log = AssociationLog::new();
        for (tick, rsu) in [(0, 1), (1, 1), (2, 2), (3, 1)] {
            log.push(record(tick, "a", rsu));
        }
        assert_eq!(log.get(2, &"a".into()).unwrap().rsu_id, RsuId(2));
        assert!(log.get(4, &"a".into()).is_none());
        assert_eq!(log.at_tick(1).count(), 1);
        assert_eq!(log.handovers(&"a".into()), 2);
    }
}
