//! Bidirectional relay with single teardown.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::{JoinError, JoinHandle};

use super::teardown::{FireOnDrop, Teardown, TeardownCause};
use super::Direction;
use crate::observability::Stats;

/// Read buffer size per pump.
pub const RELAY_BUFFER_SIZE: usize = 4096;

/// What a finished tunnel moved and why it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnelReport {
    pub client_to_backend: u64,
    pub backend_to_client: u64,
    pub cause: Option<TeardownCause>,
}

/// A client and a backend stream relayed as one unit.
///
/// Works over any byte stream; the gateway uses TCP, tests use in-memory
/// duplex pipes.
pub struct RelayTunnel<C, B> {
    client: C,
    backend: B,
    stats: Arc<Stats>,
    teardown: Arc<Teardown>,
}

impl<C, B> RelayTunnel<C, B>
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    B: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(client: C, backend: B, stats: Arc<Stats>) -> Self {
        Self {
            client,
            backend,
            stats,
            teardown: Arc::new(Teardown::new()),
        }
    }

    /// Handle for tearing the tunnel down from outside, e.g. on shutdown.
    pub fn teardown_handle(&self) -> Arc<Teardown> {
        Arc::clone(&self.teardown)
    }

    /// Relay until either side fails, then close both streams.
    ///
    /// Returns only after both pumps have exited. Dropping the future
    /// instead aborts both pumps, which closes the streams.
    pub async fn run(self) -> TunnelReport {
        let Self {
            client,
            backend,
            stats,
            teardown,
        } = self;

        let (client_read, client_write) = tokio::io::split(client);
        let (backend_read, backend_write) = tokio::io::split(backend);

        let mut upstream = PumpTask(tokio::spawn(pump(
            client_read,
            backend_write,
            Direction::ClientToBackend,
            Arc::clone(&teardown),
            Arc::clone(&stats),
        )));
        let mut downstream = PumpTask(tokio::spawn(pump(
            backend_read,
            client_write,
            Direction::BackendToClient,
            Arc::clone(&teardown),
            Arc::clone(&stats),
        )));

        // Declared after the pump tasks so it drops first.
        stats.tunnel_established();
        let open = OpenTunnel {
            teardown: Arc::clone(&teardown),
            stats: Arc::clone(&stats),
        };

        let (upstream, downstream) = tokio::join!(&mut upstream.0, &mut downstream.0);

        let report = TunnelReport {
            client_to_backend: close(upstream, Direction::ClientToBackend).await,
            backend_to_client: close(downstream, Direction::BackendToClient).await,
            cause: teardown.cause(),
        };
        drop(open);

        tracing::info!(
            cause = ?report.cause,
            client_to_backend = report.client_to_backend,
            backend_to_client = report.backend_to_client,
            "Closing connections"
        );
        report
    }
}

/// A spawned pump, aborted if its owner goes away before joining it.
struct PumpTask<T>(JoinHandle<T>);

impl<T> Drop for PumpTask<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Accounts for a running tunnel. If `run` is dropped midway, teardown
/// fires with [`TeardownCause::Shutdown`] and the tunnel still counts as
/// closed.
struct OpenTunnel {
    teardown: Arc<Teardown>,
    stats: Arc<Stats>,
}

impl Drop for OpenTunnel {
    fn drop(&mut self) {
        if self.teardown.fire(TeardownCause::Shutdown) {
            tracing::debug!("Tunnel dropped while relaying");
        }
        self.stats.tunnel_closed();
    }
}

struct PumpOutcome<R, W> {
    _reader: R,
    writer: W,
    forwarded: u64,
}

/// Copy `reader` into `writer` until teardown.
async fn pump<R, W>(
    mut reader: R,
    mut writer: W,
    direction: Direction,
    teardown: Arc<Teardown>,
    stats: Arc<Stats>,
) -> PumpOutcome<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let _guard = FireOnDrop {
        teardown: Arc::clone(&teardown),
        direction,
    };
    let mut cancelled = teardown.subscribe();
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    let mut forwarded = 0u64;

    loop {
        if *cancelled.borrow_and_update() {
            break;
        }

        let n = tokio::select! {
            biased;
            _ = cancelled.changed() => break,
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    teardown.fire(TeardownCause::Eof(direction));
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(%direction, error = %e, "Relay read failed");
                    teardown.fire(TeardownCause::ReadFailed(direction));
                    break;
                }
            },
        };
        stats.record_bytes(direction, n);

        let written = tokio::select! {
            biased;
            _ = cancelled.changed() => break,
            written = write_and_flush(&mut writer, &buf[..n]) => written,
        };
        if let Err(e) = written {
            tracing::debug!(%direction, error = %e, "Relay write failed");
            teardown.fire(TeardownCause::WriteFailed(direction));
            break;
        }
        forwarded += n as u64;
    }

    PumpOutcome {
        _reader: reader,
        writer,
        forwarded,
    }
}

async fn write_and_flush<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}

/// Shut down the pump's write side. The halves drop here, which closes the
/// underlying stream once both of its halves are gone.
async fn close<R, W>(joined: Result<PumpOutcome<R, W>, JoinError>, direction: Direction) -> u64
where
    W: AsyncWrite + Unpin,
{
    match joined {
        Ok(mut outcome) => {
            if let Err(e) = outcome.writer.shutdown().await {
                tracing::trace!(%direction, error = %e, "Shutdown after teardown failed");
            }
            outcome.forwarded
        }
        Err(e) => {
            tracing::error!(%direction, error = %e, "Relay pump panicked");
            0
        }
    }
}
