//! UDP event listener
//!
//! Receives RB3Enhanced broadcast datagrams and feeds them, one at a time,
//! to the [`SyncOrchestrator`]. A datagram is fully processed (including
//! any search, resolve or start delay it triggers) before the next one is
//! read; the OS receive buffer absorbs the backlog meanwhile.

use crate::error::{Error, Result};
use crate::protocol::{self, Header};
use crate::sync::SyncOrchestrator;
use rbvs_common::events::SyncEvent;
use rbvs_common::time;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Datagrams larger than this are truncated
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Receive timeout; only drives idle heartbeats
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Heartbeat after this many consecutive timeouts (30 s)
pub const HEARTBEAT_EVERY: u64 = 6;

/// Bytes of each datagram shown in debug output
const HEX_PREVIEW_LEN: usize = 20;

/// Bound listener socket
pub struct Listener {
    socket: UdpSocket,
    port: u16,
}

impl Listener {
    /// Bind `0.0.0.0:<port>` with broadcast reception and address reuse
    ///
    /// Must be called from within a Tokio runtime. Port 0 picks an
    /// ephemeral port.
    pub fn bind(port: u16) -> Result<Self> {
        let bind_error = |source| Error::Bind { port, source };

        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        let socket =
            Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_error)?;
        socket.set_reuse_address(true).map_err(bind_error)?;
        socket.set_broadcast(true).map_err(bind_error)?;
        socket.set_nonblocking(true).map_err(bind_error)?;
        socket.bind(&SockAddr::from(addr)).map_err(bind_error)?;

        let socket = UdpSocket::from_std(socket.into()).map_err(bind_error)?;
        let port = socket.local_addr().map_err(bind_error)?.port();

        info!("UDP listener bound to 0.0.0.0:{}", port);
        Ok(Self { socket, port })
    }

    /// Bound port (resolved when binding port 0)
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive loop; returns once `shutdown` is cancelled
    ///
    /// Socket errors and bad packets are logged and never end the loop.
    pub async fn run(&self, orchestrator: &mut SyncOrchestrator, shutdown: CancellationToken) {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let mut idle_timeouts: u64 = 0;

        info!("Listening for RB3Enhanced events on port {}", self.port);
        orchestrator.event_bus().emit_lossy(SyncEvent::ListenerStarted {
            port: self.port,
            timestamp: time::now(),
        });

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = tokio::time::timeout(RECV_TIMEOUT, self.socket.recv_from(&mut buf)) => received,
            };

            match received {
                Ok(Ok((len, from))) => {
                    idle_timeouts = 0;
                    handle_datagram(orchestrator, &buf[..len], from).await;
                }
                Ok(Err(e)) => {
                    if !shutdown.is_cancelled() {
                        warn!("Socket error: {}", e);
                    }
                }
                Err(_) => {
                    idle_timeouts += 1;
                    if idle_timeouts % HEARTBEAT_EVERY == 0 {
                        let idle_seconds = idle_timeouts * RECV_TIMEOUT.as_secs();
                        info!(
                            "Still listening... ({} seconds, no packets received). \
                             Make sure RB3Enhanced config has EnableEvents = true",
                            idle_seconds
                        );
                        orchestrator.event_bus().emit_lossy(SyncEvent::Heartbeat {
                            idle_seconds,
                            timestamp: time::now(),
                        });
                    }
                }
            }
        }

        info!("Listener stopped");
    }
}

/// Decode one datagram and hand it to the orchestrator
async fn handle_datagram(orchestrator: &mut SyncOrchestrator, datagram: &[u8], from: SocketAddr) {
    debug!("Received {} bytes from {}", datagram.len(), from);
    trace!(
        "Raw data (first {} bytes): {}",
        HEX_PREVIEW_LEN,
        hex_preview(datagram)
    );

    if let Ok(header) = Header::parse(datagram) {
        debug!(
            "Header: magic=0x{:08X} version={} type={} size={} platform={}",
            header.magic, header.version, header.event_type, header.payload_len, header.platform
        );
    }

    match protocol::decode(datagram) {
        Ok(event) => orchestrator.handle_event(event).await,
        Err(e) => debug!("Dropping packet from {}: {}", from, e),
    }
}

/// Lowercase hex of the first bytes of a datagram
fn hex_preview(datagram: &[u8]) -> String {
    datagram
        .iter()
        .take(HEX_PREVIEW_LEN)
        .map(|b| format!("{:02x}", b))
        .collect()
}
