//! Process-wide monotonic time base.
//!
//! The command channel and the sync channel share nothing except this clock.
//! All local timestamps are nanoseconds since a fixed epoch taken the first
//! time the clock is used.

use std::sync::OnceLock;
use std::time::Instant;

static PROCESS_EPOCH: OnceLock<Instant> = OnceLock::new();

/// The fixed local epoch for this process.
pub fn process_epoch() -> Instant {
    *PROCESS_EPOCH.get_or_init(Instant::now)
}

/// Nanoseconds since [`process_epoch`].
pub fn now_nanos() -> i64 {
    MonotonicClock::process().now_nanos()
}

/// Monotonic nanosecond clock relative to a fixed epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::process()
    }
}

impl MonotonicClock {
    /// Clock sharing the process-wide epoch.
    pub fn process() -> Self {
        Self {
            epoch: process_epoch(),
        }
    }

    /// Clock with a specific epoch.
    pub fn with_epoch(epoch: Instant) -> Self {
        Self { epoch }
    }

    /// The epoch all readings are relative to.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Current time in nanoseconds since the epoch.
    pub fn now_nanos(&self) -> i64 {
        self.nanos_at(Instant::now())
    }

    /// Convert an instant to nanoseconds since the epoch.
    ///
    /// Instants before the epoch map to 0; the value saturates at `i64::MAX`.
    pub fn nanos_at(&self, instant: Instant) -> i64 {
        let elapsed = instant.saturating_duration_since(self.epoch);
        i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = MonotonicClock::process();
        let a = clock.now_nanos();
        std::thread::sleep(Duration::from_millis(2));
        let b = clock.now_nanos();
        assert!(b >= a + 2_000_000);
    }

    #[test]
    fn test_process_clocks_share_epoch() {
        assert_eq!(MonotonicClock::process(), MonotonicClock::default());
        assert_eq!(MonotonicClock::process().epoch(), process_epoch());
    }

    #[test]
    fn test_nanos_at_before_epoch_is_zero() {
        let earlier = Instant::now();
        let clock = MonotonicClock::with_epoch(earlier + Duration::from_secs(1));
        assert_eq!(clock.nanos_at(earlier), 0);
        assert_eq!(
            clock.nanos_at(earlier + Duration::from_millis(1500)),
            500_000_000
        );
    }
}
