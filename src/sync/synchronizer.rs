//! Multi-trial clock synchronizer.

use std::future::Future;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::time::Duration;

use tracing::{debug, trace};

use super::trial::{RoundTripTimes, SyncTrial, TrialEstimate, select_best};
use crate::core::{DEFAULT_SYNC_ATTEMPTS, DEFAULT_SYNC_LISTEN_PORT, DEFAULT_SYNC_TIMEOUT, SyncResult};

/// One request/response exchange with a time server.
///
/// Implemented by the UDP channel; tests implement it with synthetic
/// timestamps.
pub trait RoundTrip: Send {
    /// Send one request and wait at most `timeout` for the response.
    fn req_resp(&mut self, timeout: Duration)
    -> impl Future<Output = SyncResult<RoundTripTimes>> + Send;
}

/// Clock synchronization configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time server address.
    pub server_addr: SocketAddr,

    /// Local UDP port the server replies to; 0 picks a free port.
    pub listen_port: u16,

    /// Per round trip timeout.
    pub timeout: Duration,

    /// Number of trials; must be at least 1.
    pub attempts: usize,
}

impl SyncConfig {
    /// Create a configuration for the given time server with default settings.
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            listen_port: DEFAULT_SYNC_LISTEN_PORT,
            timeout: DEFAULT_SYNC_TIMEOUT,
            attempts: DEFAULT_SYNC_ATTEMPTS,
        }
    }

    /// Set the local listen port.
    pub fn listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the per round trip timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of trials.
    pub fn attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Result of a synchronization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Index of the trial the offset was taken from.
    pub best: usize,
    /// Every trial's estimate, in the order run.
    pub estimates: Vec<TrialEstimate>,
}

impl SyncReport {
    /// Local clock minus remote clock, ns.
    pub fn offset(&self) -> i64 {
        self.estimates[self.best].offset
    }

    /// Estimate of the selected trial.
    pub fn best_estimate(&self) -> &TrialEstimate {
        &self.estimates[self.best]
    }
}

/// Runs trials over a [`RoundTrip`] and keeps the most symmetric one.
#[derive(Debug)]
pub struct ClockSynchronizer<R: RoundTrip> {
    round_trip: R,
    timeout: Duration,
    attempts: NonZeroUsize,
}

impl<R: RoundTrip> ClockSynchronizer<R> {
    /// Create a synchronizer with the default timeout and number of trials.
    pub fn new(round_trip: R) -> Self {
        Self {
            round_trip,
            timeout: DEFAULT_SYNC_TIMEOUT,
            attempts: NonZeroUsize::new(DEFAULT_SYNC_ATTEMPTS).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Set the per round trip timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of trials.
    pub fn with_attempts(mut self, attempts: NonZeroUsize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Number of trials per run.
    pub fn attempts(&self) -> NonZeroUsize {
        self.attempts
    }

    /// Get the round trip source.
    pub fn round_trip(&self) -> &R {
        &self.round_trip
    }

    /// Consume the synchronizer, returning the round trip source.
    pub fn into_inner(self) -> R {
        self.round_trip
    }

    /// Run one trial: two round trips back to back.
    pub async fn run_trial(&mut self) -> SyncResult<SyncTrial> {
        let first = self.round_trip.req_resp(self.timeout).await?;
        let second = self.round_trip.req_resp(self.timeout).await?;
        SyncTrial::new(first, second)
    }

    /// Estimate the offset between the local and remote clocks, in ns.
    pub async fn synchronize(&mut self) -> SyncResult<i64> {
        Ok(self.synchronize_report().await?.offset())
    }

    /// Run every trial and report all estimates with the one selected.
    ///
    /// Any failed round trip aborts the run.
    pub async fn synchronize_report(&mut self) -> SyncResult<SyncReport> {
        let attempts = self.attempts.get();
        let mut estimates = Vec::with_capacity(attempts);

        for index in 0..attempts {
            let estimate = self.run_trial().await?.estimate()?;
            trace!(
                trial = index,
                offset = estimate.offset,
                latency1 = estimate.latency1,
                latency2 = estimate.latency2,
                "sync trial"
            );
            estimates.push(estimate);
        }

        let (best, chosen) = select_best(&estimates).unwrap_or((0, estimates[0]));
        debug!(
            trials = attempts,
            best,
            offset = chosen.offset,
            asymmetry = chosen.asymmetry(),
            "clock synchronized"
        );
        Ok(SyncReport { best, estimates })
    }
}
