use super::RouteCatalog;
use crate::error::CatalogError;
use crate::route::{Direction, Route, RouteKey, StopSequence};
use crate::Position;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{BufRead, Write};
use std::path::Path;

/// A question put to a [DirectionOracle].
#[derive(Clone, Debug)]
pub struct DirectionQuery<'a> {
    /// The line being loaded, e.g. `"728"`.
    pub line: &'a str,
    /// The long name of the route variant that uses the shape.
    pub variant: &'a str,
    /// The long names of all the line's variants.
    pub variants: &'a [&'a str],
    /// The shape whose direction is being decided.
    pub shape_id: &'a str,
}

/// Decides the direction of a shape when a line has too many variants to guess.
pub trait DirectionOracle {
    fn direction(&mut self, query: &DirectionQuery) -> Result<Direction, CatalogError>;
}

/// Asks the user on the terminal. Answering `U` selects outbound, anything else inbound.
pub struct StdinOracle;

impl DirectionOracle for StdinOracle {
    fn direction(&mut self, query: &DirectionQuery) -> Result<Direction, CatalogError> {
        let mut stderr = std::io::stderr();
        writeln!(stderr, "{}", query.shape_id)?;
        writeln!(
            stderr,
            "Route {} from these {:?} is up or down?",
            query.variant, query.variants
        )?;
        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        Ok(match answer.trim().to_uppercase().as_str() {
            "U" => Direction::Outbound,
            _ => Direction::Inbound,
        })
    }
}

#[derive(Deserialize)]
struct RouteRow {
    route_id: String,
    route_long_name: Option<String>,
}

#[derive(Deserialize)]
struct TripRow {
    route_id: String,
    shape_id: Option<String>,
}

#[derive(Deserialize)]
struct ShapeRow {
    shape_id: String,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: u32,
}

/// A route variant of a line: its long name and the shapes its trips follow.
struct Variant {
    long_name: String,
    shape_ids: BTreeSet<String>,
}

/// Loads a catalog from the `routes.txt`, `trips.txt` and `shapes.txt` files of a GTFS feed.
///
/// Routes are grouped into lines by the first word of their long name, and the
/// shapes of each line become its stop sequences. When a line has two or fewer
/// variants, the shapes of the first are outbound and the rest inbound.
/// Otherwise `oracle` is asked about each shape.
pub fn load_gtfs(
    dir: impl AsRef<Path>,
    oracle: &mut dyn DirectionOracle,
) -> Result<RouteCatalog, CatalogError> {
    let dir = dir.as_ref();
    let routes: Vec<RouteRow> = read_table(&dir.join("routes.txt"))?;
    let trips: Vec<TripRow> = read_table(&dir.join("trips.txt"))?;
    let shapes: Vec<ShapeRow> = read_table(&dir.join("shapes.txt"))?;
    let catalog = build_catalog(routes, trips, shapes, oracle)?;
    log::info!("Loaded {} lines from {}", catalog.len(), dir.display());
    Ok(catalog)
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CatalogError> {
    log::debug!("Parsing {}", path.display());
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?
        .deserialize()
        .map(|row| row.map_err(CatalogError::from))
        .collect()
}

fn build_catalog(
    routes: Vec<RouteRow>,
    trips: Vec<TripRow>,
    shapes: Vec<ShapeRow>,
    oracle: &mut dyn DirectionOracle,
) -> Result<RouteCatalog, CatalogError> {
    let mut points: HashMap<String, Vec<(u32, Position)>> = HashMap::new();
    for row in shapes {
        points.entry(row.shape_id).or_default().push((
            row.shape_pt_sequence,
            Position::new(row.shape_pt_lat, row.shape_pt_lon),
        ));
    }
    let shapes: HashMap<String, StopSequence> = points
        .into_iter()
        .map(|(id, mut pts)| {
            pts.sort_by_key(|(seq, _)| *seq);
            (id, pts.into_iter().map(|(_, p)| p).collect())
        })
        .collect();

    let mut route_shapes: HashMap<String, BTreeSet<String>> = HashMap::new();
    for trip in trips {
        if let Some(shape_id) = trip.shape_id {
            route_shapes.entry(trip.route_id).or_default().insert(shape_id);
        }
    }

    let mut lines: BTreeMap<String, Vec<Variant>> = BTreeMap::new();
    for route in routes {
        let long_name = route
            .route_long_name
            .unwrap_or_else(|| route.route_id.clone());
        let shape_ids = route_shapes.remove(&route.route_id).unwrap_or_default();
        if shape_ids.len() > 1 {
            log::warn!("Route {} has more than one shape", long_name);
        }
        let line = long_name
            .split_whitespace()
            .next()
            .unwrap_or(&route.route_id)
            .to_string();
        lines.entry(line).or_default().push(Variant {
            long_name,
            shape_ids,
        });
    }

    let mut catalog = RouteCatalog::new();
    for (line, variants) in lines {
        let names = variants
            .iter()
            .map(|v| v.long_name.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let ask = names.len() > 2;
        let first_name = variants[0].long_name.as_str();

        let mut outbound = vec![];
        let mut inbound = vec![];
        for variant in &variants {
            for shape_id in &variant.shape_ids {
                let stops = match shapes.get(shape_id) {
                    Some(stops) if !stops.is_empty() => stops.clone(),
                    _ => {
                        log::warn!("Shape {} of line {} has no points", shape_id, line);
                        continue;
                    }
                };
                let direction = if ask {
                    oracle.direction(&DirectionQuery {
                        line: &line,
                        variant: &variant.long_name,
                        variants: &names,
                        shape_id,
                    })?
                } else if variant.long_name == first_name {
                    Direction::Outbound
                } else {
                    Direction::Inbound
                };
                match direction {
                    Direction::Outbound => outbound.push(stops),
                    Direction::Inbound => inbound.push(stops),
                }
            }
        }

        if outbound.is_empty() {
            log::warn!("Line {} has no outbound shapes, skipping", line);
            continue;
        }
        let inbound = (!inbound.is_empty()).then_some(inbound);
        catalog.insert(Route::new(RouteKey::from_label(&line), outbound, inbound)?);
    }

    Ok(catalog)
}

#[cfg(test)]
mod test {
    use super::*;

    fn route(id: &str, name: &str) -> RouteRow {
        RouteRow {
            route_id: id.into(),
            route_long_name: Some(name.into()),
        }
    }

    fn trip(route_id: &str, shape_id: &str) -> TripRow {
        TripRow {
            route_id: route_id.into(),
            shape_id: Some(shape_id.into()),
        }
    }

    fn shape(id: &str, seq: u32, lat: f64, lon: f64) -> ShapeRow {
        ShapeRow {
            shape_id: id.into(),
            shape_pt_lat: lat,
            shape_pt_lon: lon,
            shape_pt_sequence: seq,
        }
    }

    struct NeverAsked;

    impl DirectionOracle for NeverAsked {
        fn direction(&mut self, _: &DirectionQuery) -> Result<Direction, CatalogError> {
            panic!("oracle should not be consulted")
        }
    }

    /// Answers inbound for the listed shapes and outbound for the rest.
    struct Scripted {
        inbound: Vec<&'static str>,
        asked: Vec<String>,
    }

    impl DirectionOracle for Scripted {
        fn direction(&mut self, query: &DirectionQuery) -> Result<Direction, CatalogError> {
            assert_eq!(query.variants.len(), 3);
            self.asked.push(query.shape_id.to_string());
            Ok(if self.inbound.iter().any(|s| *s == query.shape_id) {
                Direction::Inbound
            } else {
                Direction::Outbound
            })
        }
    }

    #[test]
    fn two_variants_are_split_by_name() {
        let routes = vec![
            route("r1", "728 Restelo - Portela"),
            route("r2", "728 Portela - Restelo"),
        ];
        let trips = vec![trip("r1", "s1"), trip("r1", "s1"), trip("r2", "s2")];
        let shapes = vec![
            shape("s1", 2, 38.71, -9.17),
            shape("s1", 1, 38.70, -9.21),
            shape("s2", 1, 38.71, -9.17),
            shape("s2", 2, 38.70, -9.21),
        ];
        let catalog = build_catalog(routes, trips, shapes, &mut NeverAsked).unwrap();
        let route = catalog.route(&RouteKey::Number(728)).unwrap();
        let up = &route.candidates(Direction::Outbound)[0];
        let down = &route.candidates(Direction::Inbound)[0];
        // Points are ordered by sequence number
        assert_eq!(up[0], Position::new(38.70, -9.21));
        assert_eq!(down[0], Position::new(38.71, -9.17));
    }

    #[test]
    fn single_variant_derives_inbound() {
        let routes = vec![route("r1", "15E Praça da Figueira - Algés")];
        let trips = vec![trip("r1", "s1")];
        let shapes = vec![shape("s1", 1, 38.71, -9.13), shape("s1", 2, 38.70, -9.23)];
        let catalog = build_catalog(routes, trips, shapes, &mut NeverAsked).unwrap();
        let route = catalog.route(&RouteKey::Name("15E".into())).unwrap();
        let down = &route.candidates(Direction::Inbound)[0];
        assert_eq!(down[0], Position::new(38.70, -9.23));
    }

    #[test]
    fn many_variants_consult_oracle() {
        let routes = vec![
            route("r1", "760 Gomes Freire - Cemitério da Ajuda"),
            route("r2", "760 Cemitério da Ajuda - Gomes Freire"),
            route("r3", "760 Gomes Freire - Belém"),
        ];
        let trips = vec![trip("r1", "a"), trip("r2", "b"), trip("r3", "c")];
        let shapes = vec![
            shape("a", 1, 38.72, -9.14),
            shape("b", 1, 38.70, -9.19),
            shape("c", 1, 38.72, -9.14),
        ];
        let mut oracle = Scripted {
            inbound: vec!["b"],
            asked: vec![],
        };
        let catalog = build_catalog(routes, trips, shapes, &mut oracle).unwrap();
        assert_eq!(oracle.asked, vec!["a", "b", "c"]);
        let route = catalog.route(&RouteKey::Number(760)).unwrap();
        assert_eq!(route.candidates(Direction::Outbound).len(), 2);
        assert_eq!(route.candidates(Direction::Inbound).len(), 1);
    }

    #[test]
    fn lines_without_shapes_are_skipped() {
        let routes = vec![route("r1", "28E Martim Moniz - Campo Ourique")];
        let trips = vec![trip("r1", "missing")];
        let catalog = build_catalog(routes, trips, vec![], &mut NeverAsked).unwrap();
        assert!(catalog.is_empty());
    }
}
