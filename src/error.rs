use crate::route::RouteKey;
use crate::Position;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building or querying a [RouteCatalog](crate::RouteCatalog).
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("The route catalog is empty")]
    Empty,
    #[error("Route {0} not found")]
    NotFound(RouteKey),
    #[error("Route {key} is invalid: {reason}")]
    InvalidRoute { key: RouteKey, reason: String },
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors reported by a [PathProvider](crate::PathProvider).
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Rate limited by the path provider")]
    RateLimited { retry_after: Option<Duration> },
    #[error("No path found from {start} to {end}: {status} {reason}")]
    NoPathFound {
        start: Position,
        end: Position,
        status: u16,
        reason: String,
    },
    #[error("Path provider transport error: {0}")]
    Transport(String),
}

/// Errors raised while emitting telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid broker address `{0}`, expected host:port")]
    InvalidAddress(String),
    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),
    #[error("MQTT connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
}

/// Errors that end a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::BUS_DEPOT;

    #[test]
    fn not_found_display() {
        let err = CatalogError::NotFound(RouteKey::Number(728));
        assert_eq!(err.to_string(), "Route 728 not found");
    }

    #[test]
    fn no_path_names_endpoints_and_status() {
        let err = PathError::NoPathFound {
            start: BUS_DEPOT,
            end: Position::new(38.7369, -9.1335),
            status: 404,
            reason: "Not Found".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("38° 42′ 57″ N"), "{}", msg);
        assert!(msg.contains("404 Not Found"), "{}", msg);
    }

    #[test]
    fn simulation_error_is_transparent() {
        let err: SimulationError = CatalogError::Empty.into();
        assert_eq!(err.to_string(), "The route catalog is empty");
        assert!(matches!(err, SimulationError::Catalog(CatalogError::Empty)));
    }
}
