pub use bus::{
    Bus, BusAttributes, Phase, Topology, EPSILON_DISTANCE, NUMBER_BUSES,
    RADIUS_BUS_STOP_CATCH_AREA,
};
pub use catalog::{RouteCatalog, TEST_ROUTE};
pub use cgmath;
pub use driver::{Driver, DriverOptions, Pacing, RunSummary};
pub use error::{CatalogError, PathError, SimulationError, TelemetryError};
pub use path::{Leg, OpenRouteService, PathProvider, Retrying, Sleep, StraightLine, ThreadSleep};
pub use position::{distance, Position, BUS_DEPOT};
pub use route::{Direction, Route, RouteKey, StopSequence};
pub use sensor::{SensorModel, SensorReadings};
pub use telemetry::{MemorySink, TelemetryRecord, TelemetrySink};
pub use util::Interval;

mod bus;
pub mod catalog;
mod driver;
mod error;
pub mod math;
pub mod path;
mod position;
mod route;
pub mod sensor;
pub mod telemetry;
mod util;
