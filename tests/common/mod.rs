//! Shared utilities for gateway integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tcp_gatekeeper::admission::AttemptTracker;
use tcp_gatekeeper::net::Listener;
use tcp_gatekeeper::observability::Stats;
use tcp_gatekeeper::{Gateway, GatewayConfig, Shutdown};

/// Length of what the gateway forwards before relaying: IPv4 octets + opcode.
pub const PREAMBLE_LEN: usize = 5;

/// Start a backend that reports each connection's preamble, then echoes.
pub async fn start_echo_backend() -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut preamble = [0u8; PREAMBLE_LEN];
                if socket.read_exact(&mut preamble).await.is_err() {
                    return;
                }
                let _ = tx.send(preamble.to_vec());
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    (addr, rx)
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn unused_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A backend that never accepts, with a full backlog, so dials to it hang.
#[allow(dead_code)]
pub struct StalledBackend {
    pub addr: SocketAddr,
    _listener: TcpListener,
    _queued: Vec<TcpStream>,
}

#[allow(dead_code)]
pub async fn start_stalled_backend() -> StalledBackend {
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

    StalledBackend {
        addr,
        _listener: listener,
        _queued: queued,
    }
}

/// Defaults tightened for fast tests.
pub fn test_config(backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.backend.address = backend.to_string();
    config.backend.connect_timeout_ms = 500;
    config.admission.reject_delay_ms = 50;
    config.handshake.timeout_ms = 2_000;
    config.lifecycle.drain_timeout_secs = 2;
    config
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub stats: Arc<Stats>,
    #[allow(dead_code)]
    pub tracker: Arc<AttemptTracker>,
    pub shutdown: Shutdown,
    pub task: JoinHandle<()>,
}

pub async fn spawn_gateway(config: GatewayConfig) -> TestGateway {
    let tracker = Arc::new(AttemptTracker::new(config.admission.window_capacity()));
    let stats = Arc::new(Stats::new());
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let gateway = Arc::new(Gateway::new(config, tracker.clone(), stats.clone()));
    let task = tokio::spawn(gateway.run(listener, shutdown.subscribe()));

    TestGateway {
        addr,
        stats,
        tracker,
        shutdown,
        task,
    }
}

/// Read until the gateway closes and return the single code byte it sent.
pub async fn read_rejection(stream: &mut TcpStream) -> u8 {
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(3), stream.read_to_end(&mut received))
        .await
        .expect("gateway did not close the connection")
        .unwrap();
    assert_eq!(received.len(), 1, "expected exactly one code byte, got {received:?}");
    received[0]
}

/// Poll `condition` until it holds or two seconds pass.
#[allow(dead_code)]
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
