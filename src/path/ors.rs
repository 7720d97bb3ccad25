use super::{Leg, PathProvider};
use crate::error::PathError;
use crate::Position;
use geojson::{FeatureCollection, GeoJson, Value};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

/// The public OpenRouteService API.
pub const DEFAULT_ORS_URL: &str = "https://api.openrouteservice.org";

/// Requests driving directions from an OpenRouteService instance.
pub struct OpenRouteService {
    client: Client,
    /// The base URL of the service.
    base_url: String,
    /// The API key sent with each request.
    api_key: String,
    /// The routing profile, e.g. `driving-car`.
    profile: String,
}

impl OpenRouteService {
    /// Creates a client for the public service.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_url(DEFAULT_ORS_URL, api_key)
    }

    /// Creates a client for the service at `base_url`.
    pub fn with_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            profile: "driving-car".into(),
        }
    }
}

impl PathProvider for OpenRouteService {
    fn paths(&mut self, start: &Position, end: &Position) -> Result<Vec<Leg>, PathError> {
        let url = format!("{}/v2/directions/{}", self.base_url, self.profile);
        let (from, to) = (start.to_ors(), end.to_ors());
        let response = self
            .client
            .get(url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("start", from.as_str()),
                ("end", to.as_str()),
            ])
            .header(
                ACCEPT,
                "application/json, application/geo+json, application/gpx+xml, img/png; charset=utf-8",
            )
            .send()
            .map_err(|err| PathError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(PathError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(PathError::NoPathFound {
                start: *start,
                end: *end,
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response
            .text()
            .map_err(|err| PathError::Transport(err.to_string()))?;
        parse_directions(&body, start, end)
    }
}

/// Parses a GeoJSON directions response into candidate paths.
/// `start` and `end` are added to either end of each path.
fn parse_directions(body: &str, start: &Position, end: &Position) -> Result<Vec<Leg>, PathError> {
    let invalid = |err: geojson::Error| PathError::Transport(err.to_string());
    let directions = FeatureCollection::try_from(body.parse::<GeoJson>().map_err(invalid)?)
        .map_err(invalid)?;
    let paths = directions
        .features
        .into_iter()
        .filter_map(|feature| match feature.geometry?.value {
            // Coordinates are `[lon, lat]`, optionally followed by an elevation
            Value::LineString(coordinates) => Some(coordinates),
            _ => None,
        })
        .map(|coordinates| {
            let mut path = vec![*start];
            path.extend(
                coordinates
                    .iter()
                    .filter(|c| c.len() >= 2)
                    .map(|c| Position::new(c[1], c[0])),
            );
            path.push(*end);
            path
        })
        .collect::<Vec<_>>();

    if paths.is_empty() {
        return Err(PathError::NoPathFound {
            start: *start,
            end: *end,
            status: 200,
            reason: "no routes in response".into(),
        });
    }
    Ok(paths)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::BUS_DEPOT;

    #[test]
    fn parses_features() {
        let end = Position::new(38.7369, -9.1335);
        let body = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[-9.2350, 38.7158], [-9.2001, 38.7202, 55.0], [-9.1336, 38.7368]]
                }
            }]
        }"#;
        let paths = parse_directions(body, &BUS_DEPOT, &end).unwrap();
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], BUS_DEPOT);
        assert_eq!(path[2], Position::new(38.7202, -9.2001));
        assert_eq!(path[4], end);
    }

    #[test]
    fn not_geojson_is_transport_error() {
        let end = Position::new(38.7369, -9.1335);
        let result = parse_directions(r#"{"error": "quota"}"#, &BUS_DEPOT, &end);
        assert!(matches!(result, Err(PathError::Transport(_))));
    }

    #[test]
    fn no_features_is_no_path() {
        let end = Position::new(38.7369, -9.1335);
        let body = r#"{"type": "FeatureCollection", "features": []}"#;
        let result = parse_directions(body, &BUS_DEPOT, &end);
        assert!(matches!(result, Err(PathError::NoPathFound { .. })));
    }
}
