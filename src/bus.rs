use crate::catalog::RouteCatalog;
use crate::error::{PathError, SimulationError};
use crate::math::step_toward;
use crate::path::PathProvider;
use crate::route::{Direction, Route, RouteKey};
use crate::{Position, BUS_DEPOT};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Arc;

pub use phase::Phase;

mod phase;

/// The bus has arrived at a stop once it is closer than this, in m.
pub const RADIUS_BUS_STOP_CATCH_AREA: f64 = 2.0; // m

/// Waypoints at most this far from the bus are considered reached, in m.
pub const EPSILON_DISTANCE: f64 = 1.0; // m

/// Buses without an explicit ID are numbered from 1 up to this value.
pub const NUMBER_BUSES: u32 = 10;

/// Tolerance when comparing simulated times, in s.
const TIME_EPSILON: f64 = 1e-9; // s

/// Projected distances are only this precise, in m.
const DISTANCE_TOLERANCE: f64 = 1e-6; // m

/// Which phases a bus goes through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Topology {
    /// Alternating outbound and inbound trips, pausing in between,
    /// followed by a return to the depot.
    #[default]
    Full,
    /// A single outbound trip which ends at the last stop.
    Reduced,
}

/// The attributes of a simulated bus.
#[derive(Clone, Copy, Debug)]
pub struct BusAttributes {
    /// The bus velocity in m/s.
    pub velocity: f64,
    /// How long the bus waits at each stop for passengers to board, in s.
    pub boarding_time: f64,
    /// The simulated time that passes each tick, in s.
    pub tick_interval: f64,
    /// The number of trips made after the first one, alternating direction.
    /// Zero makes a single outbound trip.
    pub number_trips: u32,
    /// How long the bus waits between trips, in s.
    pub inter_trip_pause: f64,
    /// Where the bus starts and finishes.
    pub depot: Position,
    /// Which phases the bus goes through.
    pub topology: Topology,
    /// The bus identity. Chosen at random from `1..=NUMBER_BUSES` if absent.
    pub bus_id: Option<u32>,
    /// Seeds the random choices of routes and paths. Seeded from entropy if absent.
    pub seed: Option<u64>,
}

impl Default for BusAttributes {
    fn default() -> Self {
        Self {
            velocity: 13.9,
            boarding_time: 60.0,
            tick_interval: 1.0,
            number_trips: 1,
            inter_trip_pause: 300.0,
            depot: BUS_DEPOT,
            topology: Topology::Full,
            bus_id: None,
            seed: None,
        }
    }
}

/// A simulated bus.
///
/// The bus is a state machine which advances one tick at a time. Each tick it
/// performs the action of its current [Phase], which may move it to another phase.
pub struct Bus<P> {
    /// The bus's identity.
    id: u32,
    /// The attributes the bus was created with.
    attribs: BusAttributes,
    /// The routes the bus may drive.
    catalog: Arc<RouteCatalog>,
    /// Supplies the road paths between stops.
    paths: P,
    /// The source of all random choices.
    rng: StdRng,
    /// The current phase.
    phase: Phase,
    /// The number of ticks simulated so far.
    ticks: u64,
    /// The current position.
    position: Position,
    /// The route being driven.
    route: Option<Route>,
    /// The stops remaining on the current trip. The first is the one being driven to.
    stops: VecDeque<Position>,
    /// The remaining waypoints of the current leg.
    leg: VecDeque<Position>,
    /// The simulated time at which the current dwell began.
    dwell_start: Option<f64>,
    /// The number of trips left after the current one.
    remaining_trips: u32,
    /// Whether the next trip is outbound.
    outbound_next: bool,
}

impl<P: PathProvider> Bus<P> {
    /// Creates a new bus at its depot.
    pub fn new(attributes: &BusAttributes, catalog: Arc<RouteCatalog>, paths: P) -> Self {
        let mut rng = match attributes.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let id = attributes
            .bus_id
            .unwrap_or_else(|| rng.gen_range(1..=NUMBER_BUSES));
        Self {
            id,
            attribs: *attributes,
            catalog,
            paths,
            rng,
            phase: Phase::Initial,
            ticks: 0,
            position: attributes.depot,
            route: None,
            stops: VecDeque::new(),
            leg: VecDeque::new(),
            dwell_start: None,
            remaining_trips: attributes.number_trips,
            outbound_next: true,
        }
    }

    /// Gets the bus's ID.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The number of ticks simulated so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The simulated time elapsed since the bus was created, in s.
    pub fn elapsed(&self) -> f64 {
        self.ticks as f64 * self.attribs.tick_interval
    }

    /// The current position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// The attributes the bus was created with.
    pub fn attributes(&self) -> &BusAttributes {
        &self.attribs
    }

    /// The key of the route being driven, if one has been picked.
    pub fn route_key(&self) -> Option<&RouteKey> {
        self.route.as_ref().map(|route| route.key())
    }

    /// The stops remaining on the current trip.
    pub fn stops(&self) -> &VecDeque<Position> {
        &self.stops
    }

    /// The remaining waypoints of the current leg.
    pub fn leg(&self) -> &VecDeque<Position> {
        &self.leg
    }

    /// The simulated time at which the current dwell began, if the bus is dwelling.
    pub fn dwell_start(&self) -> Option<f64> {
        self.dwell_start
    }

    /// The number of trips left after the current one.
    pub fn remaining_trips(&self) -> u32 {
        self.remaining_trips
    }

    /// Gets a reference to the path provider.
    pub fn path_provider(&self) -> &P {
        &self.paths
    }

    /// Advances the simulation by one tick: performs the action of the
    /// current phase, then advances the clock by the tick interval.
    /// Does nothing once the bus has finished.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        if self.phase.is_terminal() {
            return Ok(());
        }
        let next = match self.phase {
            Phase::Initial => Phase::PickRoute,
            Phase::PickRoute => self.pick_route()?,
            Phase::PickDirection => self.pick_direction(),
            Phase::FindLegPath => self.find_leg_path()?,
            Phase::DriveToStop => self.drive_to_stop(),
            Phase::BoardPassengers => self.board_passengers(),
            Phase::InterTripPause => self.inter_trip_pause()?,
            Phase::ReturnToDepot => self.return_to_depot(),
            Phase::Finished => Phase::Finished,
        };
        if next != self.phase {
            log::trace!("Bus {}: {} -> {}", self.id, self.phase, next);
        }
        self.phase = next;
        self.ticks += 1;
        Ok(())
    }

    fn pick_route(&mut self) -> Result<Phase, SimulationError> {
        let route = self.catalog.random_route(&mut self.rng)?.clone();
        log::info!("Doing route {}", route.key());
        let next = match self.attribs.topology {
            Topology::Full => Phase::PickDirection,
            Topology::Reduced => {
                self.stops = route.outbound_stops(&mut self.rng).into();
                Phase::FindLegPath
            }
        };
        self.route = Some(route);
        Ok(next)
    }

    fn pick_direction(&mut self) -> Phase {
        let Some(route) = &self.route else {
            return Phase::PickRoute;
        };
        let direction = if self.outbound_next {
            Direction::Outbound
        } else {
            Direction::Inbound
        };
        self.outbound_next = !self.outbound_next;
        self.stops = route.stops(direction, &mut self.rng).into();
        log::info!("Starting {:?} trip on route {}", direction, route.key());
        Phase::FindLegPath
    }

    fn find_leg_path(&mut self) -> Result<Phase, SimulationError> {
        let Some(stop) = self.stops.front().copied() else {
            return Ok(self.trip_done());
        };
        self.leg = self.request_leg(stop)?;
        Ok(Phase::DriveToStop)
    }

    fn drive_to_stop(&mut self) -> Phase {
        let Some(stop) = self.stops.front().copied() else {
            return self.trip_done();
        };
        self.drop_reached_waypoints();
        let to_stop = self.position.distance(&stop);
        if let Some(waypoint) = self.leg.front() {
            log::debug!(
                "At {:.1} m from waypoint and {:.1} m from bus stop",
                self.position.distance(waypoint),
                to_stop
            );
        }
        if is_at_stop(to_stop) {
            return Phase::BoardPassengers;
        }
        let target = self.leg.front().copied().unwrap_or(stop);
        self.move_toward(target);
        Phase::DriveToStop
    }

    fn board_passengers(&mut self) -> Phase {
        if !self.dwell(self.attribs.boarding_time) {
            return Phase::BoardPassengers;
        }
        if self.stops.len() > 1 {
            self.stops.pop_front();
            Phase::FindLegPath
        } else {
            self.trip_done()
        }
    }

    fn inter_trip_pause(&mut self) -> Result<Phase, SimulationError> {
        if !self.dwell(self.attribs.inter_trip_pause) {
            return Ok(Phase::InterTripPause);
        }
        if self.remaining_trips > 0 {
            self.remaining_trips -= 1;
            Ok(Phase::PickDirection)
        } else {
            self.leg = self.request_leg(self.attribs.depot)?;
            Ok(Phase::ReturnToDepot)
        }
    }

    fn return_to_depot(&mut self) -> Phase {
        self.drop_reached_waypoints();
        match self.leg.front().copied() {
            Some(waypoint) => {
                self.move_toward(waypoint);
                Phase::ReturnToDepot
            }
            None => {
                log::info!("Bus {} returned to the depot", self.id);
                Phase::Finished
            }
        }
    }

    /// The phase which follows the last stop of a trip.
    fn trip_done(&self) -> Phase {
        match self.attribs.topology {
            Topology::Full => Phase::InterTripPause,
            Topology::Reduced => Phase::Finished,
        }
    }

    /// Runs the dwell timer, starting it if needed.
    /// Returns `true` and clears the timer once `duration` has elapsed.
    fn dwell(&mut self, duration: f64) -> bool {
        let now = self.elapsed();
        let start = *self.dwell_start.get_or_insert(now);
        if now - start < duration - TIME_EPSILON {
            false
        } else {
            self.dwell_start = None;
            true
        }
    }

    /// Requests candidate paths from the current position to `target` and picks one at random.
    fn request_leg(&mut self, target: Position) -> Result<VecDeque<Position>, SimulationError> {
        log::info!("Doing path from {} to {}", self.position, target);
        let candidates = self.paths.paths(&self.position, &target)?;
        let leg = candidates
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| PathError::NoPathFound {
                start: self.position,
                end: target,
                status: 200,
                reason: "no candidate paths".into(),
            })?;
        log::debug!("Leg with {} waypoints", leg.len());
        Ok(leg.into())
    }

    /// Discards the leading waypoints of the leg which the bus has already reached.
    fn drop_reached_waypoints(&mut self) {
        while let Some(waypoint) = self.leg.front() {
            if is_reached(self.position.distance(waypoint)) {
                self.leg.pop_front();
            } else {
                break;
            }
        }
    }

    /// Moves the bus in a straight line toward `target`, as far as it travels
    /// in one tick but never past `target`.
    fn move_toward(&mut self, target: Position) {
        let max_step = self.attribs.velocity * self.attribs.tick_interval;
        let next = step_toward(self.position.project(), target.project(), max_step);
        self.position = Position::unproject(next);
    }
}

/// Whether a waypoint this far away, in m, has been reached.
/// A waypoint at exactly [EPSILON_DISTANCE] has been.
fn is_reached(distance: f64) -> bool {
    distance <= EPSILON_DISTANCE + DISTANCE_TOLERANCE
}

/// Whether a stop this far away, in m, has been arrived at.
fn is_at_stop(distance: f64) -> bool {
    distance < RADIUS_BUS_STOP_CATCH_AREA
}
