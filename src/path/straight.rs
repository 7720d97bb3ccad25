use super::{Leg, PathProvider};
use crate::error::PathError;
use crate::math::step_toward;
use crate::Position;
use cgmath::MetricSpace;

/// Routes in a straight line, for running without a routing service.
#[derive(Clone, Copy, Debug)]
pub struct StraightLine {
    /// The distance between waypoints in m.
    spacing: f64,
}

impl StraightLine {
    /// Creates a provider which places waypoints every `spacing` m.
    pub fn new(spacing: f64) -> Self {
        Self { spacing }
    }
}

impl Default for StraightLine {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl PathProvider for StraightLine {
    fn paths(&mut self, start: &Position, end: &Position) -> Result<Vec<Leg>, PathError> {
        let from = start.project();
        let to = end.project();
        let mut path = vec![*start];
        if self.spacing > 0.0 {
            let mut p = from;
            while p.distance(to) > self.spacing {
                p = step_toward(p, to, self.spacing);
                path.push(Position::unproject(p));
            }
        }
        if path.last() != Some(end) {
            path.push(*end);
        }
        Ok(vec![path])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::BUS_DEPOT;

    #[test]
    fn evenly_spaced() {
        let end = Position::new(38.7190, -9.2300);
        let d = BUS_DEPOT.distance(&end);
        let paths = StraightLine::new(100.0).paths(&BUS_DEPOT, &end).unwrap();
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path[0], BUS_DEPOT);
        assert_eq!(*path.last().unwrap(), end);
        assert_eq!(path.len(), 2 + (d / 100.0).ceil() as usize - 1);
        for pair in path.windows(2) {
            assert!(pair[0].distance(&pair[1]) <= 100.0 + 1e-6);
        }
    }

    #[test]
    fn same_start_and_end() {
        let paths = StraightLine::default().paths(&BUS_DEPOT, &BUS_DEPOT).unwrap();
        assert_eq!(paths, vec![vec![BUS_DEPOT]]);
    }
}
