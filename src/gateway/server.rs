//! Accept loop and per-connection session setup.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tracing::Instrument;

use super::handshake::{HandshakeAuthorizer, LoginHandshake};
use super::reject::send_rejection;
use super::SessionError;
use crate::admission::{AttemptTracker, SourceKey};
use crate::config::GatewayConfig;
use crate::lifecycle::ShutdownSignal;
use crate::net::{Listener, Peer};
use crate::observability::{metrics, Stats};
use crate::tunnel::{RelayTunnel, TeardownCause};

/// Pause after a failed accept, to avoid spinning on persistent errors.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Admits clients and relays them to the backend.
///
/// The tracker and stats are injected so their owner (startup, or a test)
/// can share them with the sweeper.
pub struct Gateway {
    config: GatewayConfig,
    tracker: Arc<AttemptTracker>,
    stats: Arc<Stats>,
    handshake: Arc<dyn HandshakeAuthorizer>,
}

impl Gateway {
    /// Create a gateway using [`LoginHandshake`] with the configured opcode.
    pub fn new(config: GatewayConfig, tracker: Arc<AttemptTracker>, stats: Arc<Stats>) -> Self {
        let handshake = Arc::new(LoginHandshake::new(config.handshake.opcode));
        Self {
            config,
            tracker,
            stats,
            handshake,
        }
    }

    /// Replace the first-message authorizer.
    pub fn with_handshake(mut self, handshake: Arc<dyn HandshakeAuthorizer>) -> Self {
        self.handshake = handshake;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Accept connections until `shutdown` fires, then drain live sessions.
    pub async fn run(self: Arc<Self>, listener: Listener, mut shutdown: ShutdownSignal) {
        match listener.local_addr() {
            Ok(addr) => tracing::info!(
                address = %addr,
                backend = %self.config.backend.address,
                max_attempts = self.config.admission.max_attempts,
                "Gateway accepting connections"
            ),
            Err(e) => tracing::warn!(error = %e, "Gateway listener has no local address"),
        }

        let mut sessions = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr, permit)) => {
                        let peer = Peer::accepted(addr);
                        let gateway = Arc::clone(&self);
                        let session_shutdown = shutdown.clone();
                        let span = tracing::info_span!("connection", id = %peer.id, peer = %peer.addr);
                        sessions.spawn(
                            async move {
                                gateway.serve(stream, peer, session_shutdown).await;
                                drop(permit);
                            }
                            .instrument(span),
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Accept error");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                Some(joined) = sessions.join_next() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Connection task panicked");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Gateway received shutdown signal, no longer accepting");
                    break;
                }
            }
        }

        self.drain(sessions).await;
        tracing::info!("Gateway stopped");
    }

    async fn drain(&self, mut sessions: JoinSet<()>) {
        if sessions.is_empty() {
            return;
        }
        tracing::info!(connections = sessions.len(), "Draining connections");

        let deadline = self.config.lifecycle.drain_timeout();
        let drained = tokio::time::timeout(deadline, async {
            while sessions.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(remaining = sessions.len(), "Drain timed out, aborting connections");
            sessions.abort_all();
            while sessions.join_next().await.is_some() {}
        }
    }

    /// Drive one connection from admission to the end of its tunnel.
    async fn serve(&self, mut client: TcpStream, peer: Peer, mut shutdown: ShutdownSignal) {
        tracing::info!("Connection attempt");

        let opened = tokio::select! {
            opened = self.open_session(&mut client, &peer) => opened,
            _ = shutdown.recv() => {
                tracing::debug!("Shutdown before session was established");
                return;
            }
        };

        let backend = match opened {
            Ok(backend) => backend,
            Err(err) => {
                let code = err.reject_code();
                tracing::warn!(error = %err, code = code.reason(), "Connection rejected");
                metrics::record_rejection(code.reason());
                send_rejection(&mut client, code, self.config.admission.reject_delay()).await;
                return;
            }
        };

        let tunnel = RelayTunnel::new(client, backend, Arc::clone(&self.stats));
        let teardown = tunnel.teardown_handle();
        let run = tunnel.run();
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => {}
            _ = shutdown.recv() => {
                teardown.fire(TeardownCause::Shutdown);
                run.await;
            }
        }
    }

    /// Admission, handshake and backend dial. On success the backend has
    /// already received the client's address and handshake.
    async fn open_session(&self, client: &mut TcpStream, peer: &Peer) -> Result<TcpStream, SessionError> {
        let ip = peer.addr.ip();
        let key = SourceKey::from_ip(ip).ok_or(SessionError::UnsupportedAddress(ip))?;

        let attempts = self.tracker.record_and_count(key);
        if attempts > self.config.admission.max_attempts {
            return Err(SessionError::AttemptsExceeded { key, attempts });
        }
        self.stats.connection_opened();

        let first_message = self.read_first_message(client).await?;
        let payload = self.handshake.authorize(&first_message)?;

        let mut backend = self.connect_backend().await?;

        let mut forward = Vec::with_capacity(4 + payload.len());
        forward.extend_from_slice(&key.octets());
        forward.extend_from_slice(&payload);
        backend.write_all(&forward).await.map_err(SessionError::Forward)?;
        backend.flush().await.map_err(SessionError::Forward)?;

        tracing::info!(source = %key, attempts, "Connection success");
        Ok(backend)
    }

    async fn read_first_message(&self, client: &mut TcpStream) -> Result<Vec<u8>, SessionError> {
        let mut buf = vec![0u8; self.config.handshake.read_buffer_bytes];
        let n = tokio::time::timeout(self.config.handshake.timeout(), client.read(&mut buf))
            .await
            .map_err(|_| SessionError::HandshakeTimeout)?
            .map_err(SessionError::HandshakeRead)?;
        buf.truncate(n);
        Ok(buf)
    }

    async fn connect_backend(&self) -> Result<TcpStream, SessionError> {
        let address = &self.config.backend.address;
        let connect = TcpStream::connect(address.as_str());

        match tokio::time::timeout(self.config.backend.connect_timeout(), connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(SessionError::BackendUnreachable {
                address: address.clone(),
                source,
            }),
            Err(_) => Err(SessionError::BackendTimeout {
                address: address.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RejectCode;
    use std::net::SocketAddr;
    use std::num::NonZeroUsize;
    use tokio::net::{TcpListener, TcpSocket};

    /// A backend that never accepts. Its backlog is filled so further dials
    /// go unanswered.
    async fn stalled_backend() -> (TcpListener, Vec<TcpStream>, SocketAddr) {
        let socket = TcpSocket::new_v4().unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(1).unwrap();
        let addr = listener.local_addr().unwrap();

        let mut queued = Vec::new();
        for _ in 0..8 {
            let dial = tokio::time::timeout(Duration::from_millis(100), TcpStream::connect(addr));
            if let Ok(Ok(stream)) = dial.await {
                queued.push(stream);
            }
        }
        (listener, queued, addr)
    }

    fn gateway_for(backend: SocketAddr, connect_timeout_ms: u64) -> Gateway {
        let mut config = GatewayConfig::default();
        config.backend.address = backend.to_string();
        config.backend.connect_timeout_ms = connect_timeout_ms;
        Gateway::new(
            config,
            Arc::new(AttemptTracker::new(NonZeroUsize::MIN)),
            Arc::new(Stats::new()),
        )
    }

    #[tokio::test]
    async fn dial_times_out_when_backend_never_answers() {
        let (_listener, _queued, addr) = stalled_backend().await;
        let gateway = gateway_for(addr, 200);

        let err = gateway.connect_backend().await.unwrap_err();
        assert!(matches!(err, SessionError::BackendTimeout { .. }), "{err}");
        assert_eq!(err.reject_code(), RejectCode::UnableToConnect);
    }

    #[tokio::test]
    async fn refused_dial_is_unreachable() {
        let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
        let gateway = gateway_for(addr, 1_000);

        let err = gateway.connect_backend().await.unwrap_err();
        assert!(matches!(err, SessionError::BackendUnreachable { .. }), "{err}");
    }
}
