use crate::bus::{Bus, Phase};
use crate::error::SimulationError;
use crate::path::PathProvider;
use crate::sensor::SensorModel;
use crate::telemetry::{TelemetryRecord, TelemetrySink};
use chrono::NaiveDateTime;
use std::time::{Duration, Instant};

/// How fast simulated time passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pacing {
    /// Run each tick as soon as the previous one is done.
    #[default]
    AsFastAsPossible,
    /// Run one tick per tick interval of wall clock time.
    RealTime,
}

/// Options for a [Driver].
#[derive(Clone, Copy, Debug)]
pub struct DriverOptions {
    /// How fast simulated time passes.
    pub pacing: Pacing,
    /// The wall clock time at which the simulation starts.
    pub start_time: NaiveDateTime,
    /// Stops the run after this many ticks, even if the bus has not finished.
    pub max_ticks: Option<u64>,
    /// Whether to attach synthetic sensor readings to each record.
    pub sensors: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            pacing: Pacing::AsFastAsPossible,
            start_time: chrono::Local::now().naive_local(),
            max_ticks: None,
            sensors: false,
        }
    }
}

/// The outcome of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    /// The number of ticks simulated.
    pub ticks: u64,
    /// The simulated time elapsed, in s.
    pub elapsed: f64,
    /// The phase of the bus when the run ended.
    pub final_phase: Phase,
}

/// Runs a bus to completion, emitting a telemetry record every tick.
pub struct Driver {
    options: DriverOptions,
    sensors: SensorModel,
}

impl Driver {
    /// Creates a driver with the default sensor model.
    pub fn new(options: DriverOptions) -> Self {
        Self::with_sensors(options, SensorModel::default())
    }

    /// Creates a driver with a custom sensor model.
    pub fn with_sensors(options: DriverOptions, sensors: SensorModel) -> Self {
        Self { options, sensors }
    }

    /// Gets the driver's options.
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Runs `bus` until it finishes or the tick limit is reached.
    ///
    /// A record is emitted for the initial state, then after every tick.
    pub fn run<P: PathProvider, S: TelemetrySink + ?Sized>(
        &self,
        bus: &mut Bus<P>,
        sink: &mut S,
    ) -> Result<RunSummary, SimulationError> {
        let tick_interval = Duration::from_secs_f64(bus.attributes().tick_interval.max(0.0));
        sink.emit(&self.record(bus))?;

        while !bus.phase().is_terminal() {
            if self.options.max_ticks.is_some_and(|max| bus.ticks() >= max) {
                log::info!("Tick limit reached in phase {}", bus.phase());
                break;
            }
            let started = Instant::now();
            bus.step()?;
            sink.emit(&self.record(bus))?;
            log::debug!(
                "[{}] Elapsed time {}s position {}",
                bus.phase(),
                bus.elapsed(),
                bus.position()
            );
            if self.options.pacing == Pacing::RealTime && !bus.phase().is_terminal() {
                if let Some(rest) = tick_interval.checked_sub(started.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }
        sink.finish()?;

        let summary = RunSummary {
            ticks: bus.ticks(),
            elapsed: bus.elapsed(),
            final_phase: bus.phase(),
        };
        log::info!(
            "Bus {} stopped after {} ticks, {}s simulated",
            bus.id(),
            summary.ticks,
            summary.elapsed
        );
        Ok(summary)
    }

    /// Takes a snapshot of the bus.
    fn record<P: PathProvider>(&self, bus: &Bus<P>) -> TelemetryRecord {
        let offset = chrono::Duration::milliseconds((bus.elapsed() * 1000.0).round() as i64);
        let timestamp = self.options.start_time + offset;
        let position = bus.position();
        TelemetryRecord {
            tick: bus.ticks(),
            elapsed: bus.elapsed(),
            timestamp,
            bus_id: bus.id(),
            phase: bus.phase(),
            position,
            readings: self
                .options
                .sensors
                .then(|| self.sensors.synthesize(timestamp.time(), &position)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::BusAttributes;
    use crate::path::StraightLine;
    use crate::telemetry::MemorySink;
    use crate::RouteCatalog;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn options() -> DriverOptions {
        DriverOptions {
            start_time: NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            ..Default::default()
        }
    }

    fn bus(tick_interval: f64) -> Bus<StraightLine> {
        let attribs = BusAttributes {
            tick_interval,
            boarding_time: 4.0,
            inter_trip_pause: 8.0,
            bus_id: Some(2),
            seed: Some(5),
            ..Default::default()
        };
        Bus::new(
            &attribs,
            Arc::new(RouteCatalog::with_test_route()),
            StraightLine::default(),
        )
    }

    #[test]
    fn one_record_per_tick() {
        let mut bus = bus(1.0);
        let mut sink = MemorySink::new();
        let summary = Driver::new(options()).run(&mut bus, &mut sink).unwrap();
        assert_eq!(summary.final_phase, Phase::Finished);
        assert!(sink.is_finished());
        let records = sink.records();
        assert_eq!(records.len() as u64, summary.ticks + 1);
        assert_eq!(records[0].phase, Phase::Initial);
        assert_eq!(records.last().unwrap().phase, Phase::Finished);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.tick, i as u64);
            assert_eq!(record.bus_id, 2);
            assert!(record.readings.is_none());
        }
    }

    #[test]
    fn timestamps_follow_simulated_time() {
        let mut bus = bus(2.5);
        let mut sink = MemorySink::new();
        let opts = DriverOptions {
            max_ticks: Some(10),
            sensors: true,
            ..options()
        };
        let summary = Driver::new(opts).run(&mut bus, &mut sink).unwrap();
        assert_eq!(summary.ticks, 10);
        assert_eq!(summary.elapsed, 25.0);
        let last = sink.records().last().unwrap();
        assert_eq!(last.timestamp.format("%H:%M:%S%.3f").to_string(), "09:00:25.000");
        assert!(last.readings.is_some());
    }
}
