//! UDP round trips against a BCI2000 time server.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use super::message::SyncMessage;
use super::synchronizer::{ClockSynchronizer, RoundTrip, SyncConfig};
use super::trial::RoundTripTimes;
use crate::core::clock::MonotonicClock;
use crate::core::{SyncError, SyncResult};
use crate::transport::SyncSocket;

/// Sync channel: one socket toward the server, one listener for replies.
///
/// The server answers on the port named in the request, not on the
/// request's source port, hence the separate listener.
#[derive(Debug)]
pub struct SyncChannel {
    sender: SyncSocket,
    listener: SyncSocket,
    listen_port: u16,
    clock: MonotonicClock,
}

impl SyncChannel {
    /// Open both sockets.
    ///
    /// With `listen_port == 0` the listener gets a free port, which is then
    /// announced in every request.
    pub async fn open(server_addr: SocketAddr, listen_port: u16) -> SyncResult<Self> {
        let unspecified = match server_addr.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };

        let listener = SyncSocket::bind(SocketAddr::new(unspecified, listen_port)).await?;
        let listen_port = listener.local_addr()?.port();

        let sender = SyncSocket::bind(SocketAddr::new(unspecified, 0)).await?;
        sender.connect(server_addr).await?;

        debug!(server = %server_addr, listen_port, "sync channel open");
        Ok(Self {
            sender,
            listener,
            listen_port,
            clock: MonotonicClock::process(),
        })
    }

    /// Use a different local clock.
    pub fn with_clock(mut self, clock: MonotonicClock) -> Self {
        self.clock = clock;
        self
    }

    /// Port the server is asked to reply to.
    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }
}

impl RoundTrip for SyncChannel {
    /// One request/response exchange.
    ///
    /// Replies left over from earlier, timed-out requests are dropped before
    /// sending. A stale reply that arrives while waiting is recognized by
    /// [`RoundTripTimes::fits_within_round_trip`] and skipped; the wait goes
    /// on until the original deadline.
    async fn req_resp(&mut self, timeout: Duration) -> SyncResult<RoundTripTimes> {
        let dropped = self.listener.discard_pending()?;
        if dropped > 0 {
            debug!(dropped, "discarded late sync replies");
        }

        let request = SyncMessage::Request {
            listen_port: self.listen_port,
        }
        .encode();

        let deadline = Instant::now() + timeout;
        let local_send = self.clock.now_nanos();
        self.sender.send(&request).await?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(data) = self.listener.recv_timeout(remaining).await? else {
                return Err(SyncError::Timeout(timeout));
            };
            let local_recv = self.clock.now_nanos();

            let (remote_recv, remote_send) = SyncMessage::decode_response(data)?;
            let times = RoundTripTimes::new(local_send, remote_recv, remote_send, local_recv);
            if times.fits_within_round_trip() {
                trace!(?times, "sync round trip");
                return Ok(times);
            }
            debug!(?times, "skipped reply to an earlier request");
        }
    }
}

impl ClockSynchronizer<SyncChannel> {
    /// Open a channel to the configured server.
    ///
    /// `config.attempts` is ignored in favor of the validated `attempts`.
    pub async fn open(config: &SyncConfig, attempts: NonZeroUsize) -> SyncResult<Self> {
        let channel = SyncChannel::open(config.server_addr, config.listen_port).await?;
        Ok(ClockSynchronizer::new(channel)
            .with_timeout(config.timeout)
            .with_attempts(attempts))
    }
}
