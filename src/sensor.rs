//! Synthetic environmental sensor readings.

use crate::util::Interval;
use crate::Position;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// The readings of the sensors carried by a bus.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    /// Carbon monoxide in mg/m³.
    pub co: f64,
    /// Nitrogen dioxide in µg/m³.
    pub no2: f64,
    /// Particulate matter below 1 µm in µg/m³.
    pub pm1: f64,
    /// Particulate matter below 2.5 µm in µg/m³.
    pub pm25: f64,
    /// Particulate matter below 10 µm in µg/m³.
    pub pm10: f64,
    /// Air temperature in °C.
    pub temperature: f64,
    /// Air pressure in hPa.
    pub pressure: f64,
    /// Relative humidity in %.
    pub humidity: f64,
}

/// A place where pollution is raised above the background level.
#[derive(Clone, Copy, Debug)]
pub struct Hotspot {
    /// The centre of the hotspot.
    pub position: Position,
    /// The relative increase at the centre.
    pub amplitude: f64,
    /// The spread of the hotspot in m.
    pub sigma: f64,
}

const LISBON_HOTSPOTS: [Hotspot; 4] = [
    // Marquês de Pombal
    Hotspot {
        position: Position::new(38.7253, -9.1500),
        amplitude: 0.6,
        sigma: 600.0,
    },
    // Baixa
    Hotspot {
        position: Position::new(38.7075, -9.1365),
        amplitude: 0.4,
        sigma: 500.0,
    },
    // Segunda Circular
    Hotspot {
        position: Position::new(38.7560, -9.1600),
        amplitude: 0.8,
        sigma: 800.0,
    },
    // A5 motorway by the depot
    Hotspot {
        position: Position::new(38.7160, -9.2200),
        amplitude: 0.5,
        sigma: 700.0,
    },
];

/// Morning and evening rush hours, in hours since midnight.
const RUSH_HOURS: [f64; 2] = [8.5, 18.5];

/// Produces plausible sensor readings from the time of day and position.
#[derive(Clone, Debug)]
pub struct SensorModel {
    hotspots: Vec<Hotspot>,
    co: Interval,
    no2: Interval,
    pm1: Interval,
    pm25: Interval,
    pm10: Interval,
    temperature: Interval,
    pressure: Interval,
    humidity: Interval,
}

impl Default for SensorModel {
    fn default() -> Self {
        Self::lisbon()
    }
}

impl SensorModel {
    /// A model of Lisbon's climate and traffic.
    pub fn lisbon() -> Self {
        Self::with_hotspots(LISBON_HOTSPOTS.to_vec())
    }

    /// A model with Lisbon's climate and the given pollution hotspots.
    pub fn with_hotspots(hotspots: Vec<Hotspot>) -> Self {
        Self {
            hotspots,
            co: Interval::new(0.2, 1.2),
            no2: Interval::new(10.0, 80.0),
            pm1: Interval::new(5.0, 20.0),
            pm25: Interval::new(8.0, 30.0),
            pm10: Interval::new(15.0, 50.0),
            temperature: Interval::new(14.0, 24.0),
            pressure: Interval::new(1011.5, 1014.5),
            humidity: Interval::new(55.0, 85.0),
        }
    }

    /// Synthesises the readings at `position` at `time`.
    pub fn synthesize(&self, time: NaiveTime, position: &Position) -> SensorReadings {
        let hour = time.num_seconds_from_midnight() as f64 / 3600.0;
        let traffic = traffic_factor(hour);
        let warmth = warmth_factor(hour);
        let local = 1.0 + self.hotspot_factor(position);
        let pollutant = |range: &Interval| range.lerp(traffic) * local;

        SensorReadings {
            co: pollutant(&self.co),
            no2: pollutant(&self.no2),
            pm1: pollutant(&self.pm1),
            pm25: pollutant(&self.pm25),
            pm10: pollutant(&self.pm10),
            temperature: self.temperature.lerp(warmth),
            pressure: self.pressure.lerp(0.5 + 0.5 * (2.0 * PI * hour / 24.0).cos()),
            humidity: self.humidity.lerp(1.0 - warmth),
        }
    }

    /// The relative increase in pollution at `position`.
    fn hotspot_factor(&self, position: &Position) -> f64 {
        self.hotspots
            .iter()
            .map(|spot| {
                let d = spot.position.distance(position);
                spot.amplitude * (-d * d / (2.0 * spot.sigma * spot.sigma)).exp()
            })
            .sum()
    }
}

/// Traffic intensity from 0 (night) to 1 (rush hour).
fn traffic_factor(hour: f64) -> f64 {
    RUSH_HOURS
        .iter()
        .map(|peak| (-(hour - peak).powi(2) / (2.0 * 1.5 * 1.5)).exp())
        .fold(0.0, f64::max)
}

/// Warmth from 0 (coldest, 03:00) to 1 (warmest, 15:00).
fn warmth_factor(hour: f64) -> f64 {
    0.5 - 0.5 * (2.0 * PI * (hour - 3.0) / 24.0).cos()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::BUS_DEPOT;
    use assert_approx_eq::assert_approx_eq;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn deterministic() {
        let model = SensorModel::lisbon();
        let a = model.synthesize(at(10, 15), &BUS_DEPOT);
        let b = model.synthesize(at(10, 15), &BUS_DEPOT);
        assert_eq!(a, b);
    }

    #[test]
    fn rush_hour_is_dirtier() {
        let model = SensorModel::with_hotspots(vec![]);
        let rush = model.synthesize(at(8, 30), &BUS_DEPOT);
        let night = model.synthesize(at(2, 0), &BUS_DEPOT);
        assert!(rush.no2 > night.no2);
        assert!(rush.pm10 > night.pm10);
        assert_approx_eq!(rush.co, 1.2, 1e-9);
    }

    #[test]
    fn afternoon_is_warm_and_dry() {
        let model = SensorModel::lisbon();
        let afternoon = model.synthesize(at(15, 0), &BUS_DEPOT);
        let night = model.synthesize(at(3, 0), &BUS_DEPOT);
        assert_approx_eq!(afternoon.temperature, 24.0, 1e-9);
        assert_approx_eq!(night.temperature, 14.0, 1e-9);
        assert!(afternoon.humidity < night.humidity);
    }

    #[test]
    fn hotspots_raise_pollution() {
        let spot = Hotspot {
            position: BUS_DEPOT,
            amplitude: 1.0,
            sigma: 100.0,
        };
        let clean = SensorModel::with_hotspots(vec![]).synthesize(at(12, 0), &BUS_DEPOT);
        let dirty = SensorModel::with_hotspots(vec![spot]).synthesize(at(12, 0), &BUS_DEPOT);
        assert_approx_eq!(dirty.no2, 2.0 * clean.no2, 1e-9);
        assert_eq!(dirty.temperature, clean.temperature);
    }
}
