use crate::error::{Error, ErrorKind};

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Helper for tracking fuel consumption.
///
/// Every executed statement and every loop iteration costs one unit.
pub struct FuelTracker {
    remaining: AtomicI64,
}

impl FuelTracker {
    /// Creates a new fuel tracker.
    ///
    /// The fuel tracker is always wrapped in an `Arc` so that it can be
    /// shared across nested invocations of the evaluation.
    pub fn new(fuel: u64) -> Arc<FuelTracker> {
        Arc::new(FuelTracker {
            remaining: AtomicI64::new(fuel as i64),
        })
    }

    /// Consumes one unit of fuel.  If it runs out of fuel an error is returned.
    pub fn track(&self) -> Result<(), Error> {
        let old_fuel = self.remaining.fetch_sub(1, Ordering::Relaxed);
        if old_fuel <= 1 {
            debug!("engine ran out of fuel");
            return Err(Error::from(ErrorKind::OutOfFuel));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion() {
        let tracker = FuelTracker::new(3);
        tracker.track().unwrap();
        tracker.track().unwrap();
        let err = tracker.track().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfFuel);
        assert!(tracker.track().is_err());
    }
}
