//! Per-tick telemetry records and the sinks that consume them.

use crate::bus::Phase;
use crate::error::TelemetryError;
use crate::sensor::SensorReadings;
use crate::Position;
use chrono::NaiveDateTime;
use serde::Serialize;

pub use broker::{BrokerPreset, BrokerSink, MqttPublisher, Publisher};
pub use tsv::TsvSink;

mod broker;
mod tsv;

/// A snapshot of a bus, taken once per tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// The number of ticks simulated before the snapshot.
    pub tick: u64,
    /// The simulated time since the start of the run, in s.
    pub elapsed: f64,
    /// The simulated wall clock time.
    pub timestamp: NaiveDateTime,
    /// The ID of the bus.
    pub bus_id: u32,
    /// The phase of the bus.
    pub phase: Phase,
    /// The position of the bus.
    pub position: Position,
    /// The sensor readings, if sensors are simulated.
    pub readings: Option<SensorReadings>,
}

/// A destination for telemetry records.
pub trait TelemetrySink {
    /// Consumes one record.
    fn emit(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError>;

    /// Flushes any buffered records. Called once at the end of a run.
    fn finish(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for &mut S {
    fn emit(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        (**self).emit(record)
    }

    fn finish(&mut self) -> Result<(), TelemetryError> {
        (**self).finish()
    }
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn emit(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        (**self).emit(record)
    }

    fn finish(&mut self) -> Result<(), TelemetryError> {
        (**self).finish()
    }
}

/// Collects records in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Vec<TelemetryRecord>,
    finished: bool,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The records emitted so far.
    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    /// Whether [TelemetrySink::finish] has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Takes the records out of the sink.
    pub fn into_records(self) -> Vec<TelemetryRecord> {
        self.records
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TelemetryError> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_record(tick: u64) -> TelemetryRecord {
    use chrono::NaiveDate;
    let timestamp = NaiveDate::from_ymd_opt(2024, 5, 17)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
        + chrono::Duration::seconds(tick as i64);
    TelemetryRecord {
        tick,
        elapsed: tick as f64,
        timestamp,
        bus_id: 7,
        phase: Phase::DriveToStop,
        position: crate::BUS_DEPOT,
        readings: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn memory_sink_collects() {
        let mut sink = MemorySink::new();
        {
            let by_ref: &mut dyn TelemetrySink = &mut sink;
            by_ref.emit(&sample_record(0)).unwrap();
            by_ref.emit(&sample_record(1)).unwrap();
            by_ref.finish().unwrap();
        }
        assert!(sink.is_finished());
        let ticks: Vec<_> = sink.records().iter().map(|r| r.tick).collect();
        assert_eq!(ticks, vec![0, 1]);
    }
}
