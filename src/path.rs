//! Road paths between positions, supplied by an external routing service.

use crate::error::PathError;
use crate::util::Backoff;
use crate::Position;
use std::time::Duration;

pub use ors::OpenRouteService;
pub use straight::StraightLine;

mod ors;
mod straight;

/// The waypoints of a road path, in order.
pub type Leg = Vec<Position>;

/// The delay before retrying a rate limited request.
const BACKOFF_BASELINE: Duration = Duration::from_secs(1);

/// The longest delay between retries of a rate limited request.
const BACKOFF_MAX: Duration = Duration::from_secs(64);

/// A source of road paths. This can be conceptualised as the bus driver's GPS navigation unit.
pub trait PathProvider {
    /// Finds one or more candidate paths from `start` to `end`.
    /// Each candidate is non-empty, begins at `start` and finishes at `end`.
    fn paths(&mut self, start: &Position, end: &Position) -> Result<Vec<Leg>, PathError>;
}

impl<P: PathProvider + ?Sized> PathProvider for Box<P> {
    fn paths(&mut self, start: &Position, end: &Position) -> Result<Vec<Leg>, PathError> {
        (**self).paths(start, end)
    }
}

impl<P: PathProvider + ?Sized> PathProvider for &mut P {
    fn paths(&mut self, start: &Position, end: &Position) -> Result<Vec<Leg>, PathError> {
        (**self).paths(start, end)
    }
}

/// Waits between retries.
pub trait Sleep {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Wraps a [PathProvider], retrying requests which are rate limited.
///
/// There is no limit on the number of retries. The delay between attempts
/// doubles each time the provider rate limits a request, and returns to its
/// baseline after the next successful request. Every other error is returned
/// to the caller.
pub struct Retrying<P, S = ThreadSleep> {
    /// The wrapped provider.
    inner: P,
    /// Used to wait between attempts.
    sleep: S,
    /// The delay before the next retry.
    backoff: Backoff,
    /// The total number of requests made to the wrapped provider.
    attempts: u64,
}

impl<P: PathProvider> Retrying<P> {
    /// Wraps a provider, sleeping the current thread between attempts.
    pub fn new(inner: P) -> Self {
        Self::with_sleep(inner, ThreadSleep)
    }
}

impl<P: PathProvider, S: Sleep> Retrying<P, S> {
    /// Wraps a provider, using `sleep` to wait between attempts.
    pub fn with_sleep(inner: P, sleep: S) -> Self {
        Self {
            inner,
            sleep,
            backoff: Backoff::new(BACKOFF_BASELINE, BACKOFF_MAX),
            attempts: 0,
        }
    }

    /// The total number of requests made to the wrapped provider.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Gets a reference to the wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: PathProvider, S: Sleep> PathProvider for Retrying<P, S> {
    fn paths(&mut self, start: &Position, end: &Position) -> Result<Vec<Leg>, PathError> {
        loop {
            self.attempts += 1;
            match self.inner.paths(start, end) {
                Ok(paths) => {
                    self.backoff.reset();
                    return Ok(paths);
                }
                Err(PathError::RateLimited { retry_after }) => {
                    let delay = self.backoff.next_delay().max(retry_after.unwrap_or_default());
                    log::warn!("Rate limited by the path provider, retrying in {:?}", delay);
                    self.sleep.sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
