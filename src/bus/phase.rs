use serde::{Deserialize, Serialize};
use std::fmt;

/// The phase of a bus's run. Each phase has one action, run once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// The bus has not started.
    Initial,
    /// Choosing a route from the catalog.
    PickRoute,
    /// Choosing the direction of the next trip.
    PickDirection,
    /// Requesting a road path to the next stop.
    FindLegPath,
    /// Driving along the road path to the next stop.
    DriveToStop,
    /// Waiting at a stop while passengers board.
    BoardPassengers,
    /// Waiting at the end of a trip.
    InterTripPause,
    /// Driving back to the depot.
    ReturnToDepot,
    /// The run is over.
    Finished,
}

impl Phase {
    /// The numeric code recorded in telemetry.
    pub fn code(self) -> u16 {
        use Phase::*;
        match self {
            Initial => 1001,
            PickRoute => 1002,
            PickDirection => 1003,
            FindLegPath => 1004,
            DriveToStop => 1005,
            BoardPassengers => 1006,
            InterTripPause => 1007,
            ReturnToDepot => 1008,
            Finished => 9999,
        }
    }

    /// A three letter label for status lines.
    pub fn label(self) -> &'static str {
        use Phase::*;
        match self {
            Initial => "Ini",
            PickRoute => "PRo",
            PickDirection => "PPR",
            FindLegPath => "FPS",
            DriveToStop => "DBS",
            BoardPassengers => "EDP",
            InterTripPause => "ITP",
            ReturnToDepot => "RtD",
            Finished => "Fin",
        }
    }

    /// Whether no further ticks should be run.
    pub fn is_terminal(self) -> bool {
        self == Phase::Finished
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
