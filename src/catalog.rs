//! The catalog of routes a bus may drive.

use crate::error::CatalogError;
use crate::route::{Route, RouteKey};
use crate::Position;
use rand::seq::IteratorRandom;
use rand::Rng;
use std::collections::BTreeMap;

pub use gtfs::{load_gtfs, DirectionOracle, DirectionQuery, StdinOracle};
pub use snapshot::{load_snapshot, read_snapshot, save_snapshot, write_snapshot};
pub use xml::{load_xml, parse_xml};

mod gtfs;
mod snapshot;
mod xml;

/// The key of the built-in test route.
pub const TEST_ROUTE: u32 = 999;

/// A set of routes, indexed by their keys.
///
/// Catalogs are built wholesale by the loaders and are read-only afterwards,
/// so one catalog may be shared by any number of buses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteCatalog {
    routes: BTreeMap<RouteKey, Route>,
}

impl RouteCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a catalog from a set of routes. Later routes replace earlier ones with the same key.
    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|route| (route.key().clone(), route))
                .collect(),
        }
    }

    /// Creates a catalog containing only the test route.
    pub fn with_test_route() -> Self {
        let stops = vec![
            Position::new(38.7927517, -9.1216364),
            Position::new(38.7910487, -9.1235028),
            Position::new(38.7901403, -9.1231415),
            Position::new(38.7882261, -9.1239125),
            Position::new(38.7841157, -9.1247923),
        ];
        Self::from_routes(Route::new(TEST_ROUTE, vec![stops], None).ok())
    }

    /// Adds a route, replacing any route with the same key.
    pub fn insert(&mut self, route: Route) {
        self.routes.insert(route.key().clone(), route);
    }

    /// Picks a route uniformly at random.
    pub fn random_route(&self, rng: &mut impl Rng) -> Result<&Route, CatalogError> {
        self.routes.values().choose(rng).ok_or(CatalogError::Empty)
    }

    /// Gets the route with the given key.
    pub fn route(&self, key: &RouteKey) -> Result<&Route, CatalogError> {
        self.routes
            .get(key)
            .ok_or_else(|| CatalogError::NotFound(key.clone()))
    }

    /// The number of routes in the catalog.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the catalog has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns an iterator over the routes, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::route::Direction;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn empty_catalog() {
        let catalog = RouteCatalog::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            catalog.random_route(&mut rng),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn lookup_by_key() {
        let catalog = RouteCatalog::with_test_route();
        let route = catalog.route(&RouteKey::Number(TEST_ROUTE)).unwrap();
        assert_eq!(route.candidates(Direction::Outbound)[0].len(), 5);
        assert!(matches!(
            catalog.route(&RouteKey::Number(728)),
            Err(CatalogError::NotFound(RouteKey::Number(728)))
        ));
    }

    #[test]
    fn random_route_covers_catalog() {
        let stops = vec![Position::new(38.7, -9.1)];
        let catalog = RouteCatalog::from_routes([
            Route::new(1u32, vec![stops.clone()], None).unwrap(),
            Route::new("15E", vec![stops.clone()], None).unwrap(),
            Route::new(728u32, vec![stops], None).unwrap(),
        ]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..100 {
            seen.insert(catalog.random_route(&mut rng).unwrap().key().clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn seeded_choice_is_reproducible() {
        let stops = vec![Position::new(38.7, -9.1)];
        let catalog = RouteCatalog::from_routes(
            (0..10u32).map(|n| Route::new(n, vec![stops.clone()], None).unwrap()),
        );
        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| catalog.random_route(&mut rng).unwrap().key().clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(5), picks(5));
    }
}
