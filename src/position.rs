//! Geographic positions and the local planar projection used for distances.

use crate::math::Point2d;
use cgmath::MetricSpace;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The mean radius of the Earth, in m.
const EARTH_RADIUS: f64 = 6_371_000.0; // m

/// Geographic position of the Companhia Carris de Ferro de Lisboa bus depot.
pub const BUS_DEPOT: Position = Position::new(38.715802, -9.235010);

/// A geographical position in degrees. North and east are positive.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    /// Creates a new position.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Projects the position onto the local plane centred on [BUS_DEPOT].
    /// The x axis points east and the y axis points north, both in m.
    pub fn project(&self) -> Point2d {
        let origin = BUS_DEPOT;
        let cos_lat = origin.latitude.to_radians().cos();
        Point2d::new(
            EARTH_RADIUS * (self.longitude - origin.longitude).to_radians() * cos_lat,
            EARTH_RADIUS * (self.latitude - origin.latitude).to_radians(),
        )
    }

    /// The inverse of [Position::project].
    pub fn unproject(point: Point2d) -> Self {
        let origin = BUS_DEPOT;
        let cos_lat = origin.latitude.to_radians().cos();
        Self {
            latitude: origin.latitude + (point.y / EARTH_RADIUS).to_degrees(),
            longitude: origin.longitude + (point.x / (EARTH_RADIUS * cos_lat)).to_degrees(),
        }
    }

    /// The distance to another position in m, measured on the projected plane.
    pub fn distance(&self, other: &Position) -> f64 {
        self.project().distance(other.project())
    }

    /// Formats the position as `lon,lat`, as expected by the routing service.
    pub fn to_ors(&self) -> String {
        format!("{},{}", self.longitude, self.latitude)
    }
}

/// Computes the distance between two positions in m.
pub fn distance(a: &Position, b: &Position) -> f64 {
    a.distance(b)
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn dms(x: f64) -> String {
            let seconds = (x.abs() * 3600.0 + 0.5) as u64;
            format!(
                "{:02}° {:02}′ {:02}″",
                seconds / 3600,
                (seconds / 60) % 60,
                seconds % 60
            )
        }
        write!(
            f,
            "{} {}, {} {}",
            dms(self.latitude),
            if self.latitude < 0.0 { 'S' } else { 'N' },
            dms(self.longitude),
            if self.longitude < 0.0 { 'W' } else { 'E' }
        )
    }
}
