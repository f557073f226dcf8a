//! Offset estimation from pairs of round trips.
//!
//! A trial is two round trips sent back to back. The return leg of the
//! first and the outbound leg of the second see the clock offset with
//! opposite signs, so their half-difference is the offset; the other two
//! legs, corrected by that offset, tell how symmetric the path was.

use crate::core::{SyncError, SyncResult};

/// Timestamps of one request/response exchange, in nanoseconds.
///
/// `local_*` are on the local monotonic clock, `remote_*` on the time
/// server's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundTripTimes {
    /// Request left this host.
    pub local_send: i64,
    /// Request reached the server.
    pub remote_recv: i64,
    /// Response left the server.
    pub remote_send: i64,
    /// Response reached this host.
    pub local_recv: i64,
}

impl RoundTripTimes {
    /// Create a new set of timestamps.
    pub fn new(local_send: i64, remote_recv: i64, remote_send: i64, local_recv: i64) -> Self {
        Self {
            local_send,
            remote_recv,
            remote_send,
            local_recv,
        }
    }

    /// Time the exchange took on the local clock.
    pub fn round_trip_time(&self) -> i64 {
        self.local_recv.saturating_sub(self.local_send)
    }

    /// Time the server held the request, on the server's clock.
    pub fn server_time(&self) -> i64 {
        self.remote_send.saturating_sub(self.remote_recv)
    }

    /// Check that the server's handling fits inside the local round trip.
    ///
    /// A reply to this request can only have been produced while the
    /// request was outstanding; a reply that took the server longer than
    /// the whole exchange answers some earlier request.
    pub fn fits_within_round_trip(&self) -> bool {
        self.server_time() <= self.round_trip_time()
    }

    fn check_order(&self, trip: &str) -> SyncResult<()> {
        if self.local_send > self.local_recv {
            return Err(SyncError::ClockAnomaly(format!(
                "{trip} trip received at {} before it was sent at {}",
                self.local_recv, self.local_send
            )));
        }
        if self.remote_recv > self.remote_send {
            return Err(SyncError::ClockAnomaly(format!(
                "{trip} trip answered by the server at {} before it arrived at {}",
                self.remote_send, self.remote_recv
            )));
        }
        Ok(())
    }
}

/// Offset and residual latencies computed from one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialEstimate {
    /// Local clock minus remote clock, ns.
    pub offset: i64,
    /// Outbound latency of the first trip, ns.
    pub latency1: i64,
    /// Return latency of the second trip, ns.
    pub latency2: i64,
}

impl TrialEstimate {
    /// How far apart the two residual latencies are.
    pub fn asymmetry(&self) -> u64 {
        self.latency1.abs_diff(self.latency2)
    }
}

/// Two back-to-back round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTrial {
    first: RoundTripTimes,
    second: RoundTripTimes,
}

impl SyncTrial {
    /// Pair two round trips, rejecting timestamps that run backwards.
    pub fn new(first: RoundTripTimes, second: RoundTripTimes) -> SyncResult<Self> {
        first.check_order("first")?;
        second.check_order("second")?;
        if first.local_recv > second.local_send {
            return Err(SyncError::ClockAnomaly(format!(
                "second trip sent at {} before first trip completed at {}",
                second.local_send, first.local_recv
            )));
        }
        if first.remote_send > second.remote_recv {
            return Err(SyncError::ClockAnomaly(format!(
                "server clock went back from {} to {}",
                first.remote_send, second.remote_recv
            )));
        }
        Ok(Self { first, second })
    }

    /// First round trip.
    pub fn first(&self) -> &RoundTripTimes {
        &self.first
    }

    /// Second round trip.
    pub fn second(&self) -> &RoundTripTimes {
        &self.second
    }

    /// Estimate the clock offset and residual latencies.
    pub fn estimate(&self) -> SyncResult<TrialEstimate> {
        let (a, b) = (&self.first, &self.second);

        // d1 = latency + offset, d2 = latency - offset
        let d1 = i128::from(a.local_recv) - i128::from(a.remote_send);
        let d2 = i128::from(b.remote_recv) - i128::from(b.local_send);
        let offset = (d1 - d2) / 2;

        let latency1 = i128::from(a.remote_recv) - i128::from(a.local_send) + offset;
        let latency2 = i128::from(b.local_recv) - i128::from(b.remote_send) - offset;

        Ok(TrialEstimate {
            offset: narrow(offset, "offset")?,
            latency1: narrow(latency1, "latency1")?,
            latency2: narrow(latency2, "latency2")?,
        })
    }
}

fn narrow(value: i128, what: &str) -> SyncResult<i64> {
    i64::try_from(value)
        .map_err(|_| SyncError::ClockAnomaly(format!("{what} of {value} ns is out of range")))
}

/// Index and estimate of the most symmetric trial.
///
/// Ties go to the earliest trial. Returns `None` for an empty slice.
pub fn select_best(estimates: &[TrialEstimate]) -> Option<(usize, TrialEstimate)> {
    estimates
        .iter()
        .copied()
        .enumerate()
        .min_by_key(|(index, estimate)| (estimate.asymmetry(), *index))
}
