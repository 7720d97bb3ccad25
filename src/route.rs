//! Bus routes and their stop sequences.

use crate::error::CatalogError;
use crate::Position;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// An ordered sequence of bus stops. Stop 0 is the first drop-off.
pub type StopSequence = Vec<Position>;

/// The candidate stop sequences of one direction. Usually there is only one.
type Candidates = SmallVec<[StopSequence; 1]>;

/// Identifies a route in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteKey {
    Number(u32),
    Name(String),
}

/// The direction a bus travels along a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// The "up" direction.
    Outbound,
    /// The "down" direction.
    Inbound,
}

/// A bus route with its outbound and inbound stop sequences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRoute")]
pub struct Route {
    /// The route's key in the catalog.
    key: RouteKey,
    /// The candidate outbound stop sequences.
    outbound: Candidates,
    /// The candidate inbound stop sequences.
    inbound: Candidates,
}

/// A route as stored, before its stop sequences are checked.
#[derive(Deserialize)]
struct RawRoute {
    key: RouteKey,
    outbound: Vec<StopSequence>,
    #[serde(default)]
    inbound: Vec<StopSequence>,
}

impl TryFrom<RawRoute> for Route {
    type Error = CatalogError;

    fn try_from(raw: RawRoute) -> Result<Self, Self::Error> {
        Route::new(raw.key, raw.outbound, Some(raw.inbound))
    }
}

impl Route {
    /// Creates a new route.
    ///
    /// If `inbound` is `None`, each outbound sequence is reversed to produce its
    /// inbound counterpart. This suits routes whose stops on either side of the
    /// road are close together.
    pub fn new(
        key: impl Into<RouteKey>,
        outbound: Vec<StopSequence>,
        inbound: Option<Vec<StopSequence>>,
    ) -> Result<Self, CatalogError> {
        let key = key.into();
        let invalid = |reason: &str| CatalogError::InvalidRoute {
            key: key.clone(),
            reason: reason.into(),
        };
        if outbound.is_empty() {
            return Err(invalid("no outbound stop sequence"));
        }
        let inbound = match inbound {
            Some(inbound) if !inbound.is_empty() => inbound,
            _ => outbound
                .iter()
                .map(|stops| stops.iter().rev().copied().collect())
                .collect(),
        };
        if outbound.iter().chain(&inbound).any(|stops| stops.is_empty()) {
            return Err(invalid("empty stop sequence"));
        }
        Ok(Self {
            key,
            outbound: outbound.into(),
            inbound: inbound.into(),
        })
    }

    /// The route's key.
    pub fn key(&self) -> &RouteKey {
        &self.key
    }

    /// The candidate stop sequences for a direction.
    pub fn candidates(&self, direction: Direction) -> &[StopSequence] {
        match direction {
            Direction::Outbound => &self.outbound,
            Direction::Inbound => &self.inbound,
        }
    }

    /// Returns a copy of one of the direction's candidate stop sequences,
    /// chosen uniformly at random.
    pub fn stops(&self, direction: Direction, rng: &mut impl Rng) -> StopSequence {
        self.candidates(direction)
            .choose(rng)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns a copy of a random outbound stop sequence.
    pub fn outbound_stops(&self, rng: &mut impl Rng) -> StopSequence {
        self.stops(Direction::Outbound, rng)
    }

    /// Returns a copy of a random inbound stop sequence.
    pub fn inbound_stops(&self, rng: &mut impl Rng) -> StopSequence {
        self.stops(Direction::Inbound, rng)
    }

    /// Returns a copy of the direction's candidate whose first stop is nearest to `pos`.
    /// Ties are broken uniformly at random.
    pub fn nearest_stops(
        &self,
        direction: Direction,
        pos: &Position,
        rng: &mut impl Rng,
    ) -> StopSequence {
        let candidates = self.candidates(direction);
        let dists = candidates
            .iter()
            .map(|stops| pos.distance(&stops[0]))
            .collect::<Vec<_>>();
        let best = dists.iter().copied().fold(f64::INFINITY, f64::min);
        let nearest = candidates
            .iter()
            .zip(&dists)
            .filter(|(_, dist)| **dist == best)
            .map(|(stops, _)| stops)
            .collect::<Vec<_>>();
        nearest
            .choose(rng)
            .map(|stops| stops.to_vec())
            .unwrap_or_default()
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKey::Number(n) => write!(f, "{}", n),
            RouteKey::Name(s) => write!(f, "{}", s),
        }
    }
}

impl From<u32> for RouteKey {
    fn from(n: u32) -> Self {
        RouteKey::Number(n)
    }
}

impl From<&str> for RouteKey {
    fn from(s: &str) -> Self {
        RouteKey::Name(s.to_string())
    }
}

impl From<String> for RouteKey {
    fn from(s: String) -> Self {
        RouteKey::Name(s)
    }
}

impl RouteKey {
    /// Interprets a label as a route number if it is one, or as a name otherwise.
    pub fn from_label(label: &str) -> Self {
        label
            .parse::<u32>()
            .map(RouteKey::Number)
            .unwrap_or_else(|_| label.into())
    }
}
