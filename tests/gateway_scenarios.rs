//! End-to-end gateway behaviour over real sockets.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use tcp_gatekeeper::admission::unix_now;
use tcp_gatekeeper::gateway::RejectCode;

mod common;

const LOGIN_OPCODE: u8 = 14;

#[tokio::test]
async fn valid_login_is_forwarded_and_relayed() {
    let (backend_addr, mut preambles) = common::start_echo_backend().await;
    let gateway = common::spawn_gateway(common::test_config(backend_addr)).await;

    let mut client = TcpStream::connect(gateway.addr).await.unwrap();
    client.write_all(&[LOGIN_OPCODE]).await.unwrap();

    let preamble = tokio::time::timeout(Duration::from_secs(2), preambles.recv())
        .await
        .expect("backend never received the handshake")
        .unwrap();
    assert_eq!(preamble, vec![127, 0, 0, 1, LOGIN_OPCODE]);

    client.write_all(b"ping").await.unwrap();
    let mut echoed = [0u8; 4];
    client.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"ping");

    let snapshot = gateway.stats.snapshot();
    assert_eq!(snapshot.connections_opened, 1);
    assert_eq!(snapshot.connections_established, 1);

    drop(client);
    let stats = gateway.stats.clone();
    common::wait_until(|| stats.snapshot().connections_established == 0).await;

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn extra_handshake_bytes_are_malformed() {
    let (backend_addr, mut preambles) = common::start_echo_backend().await;
    let gateway = common::spawn_gateway(common::test_config(backend_addr)).await;

    let mut client = TcpStream::connect(gateway.addr).await.unwrap();
    client.write_all(&[LOGIN_OPCODE, 0]).await.unwrap();

    assert_eq!(common::read_rejection(&mut client).await, RejectCode::MalformedLogin.as_byte());
    assert!(preambles.try_recv().is_err());

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn wrong_opcode_is_malformed() {
    let (backend_addr, _preambles) = common::start_echo_backend().await;
    let gateway = common::spawn_gateway(common::test_config(backend_addr)).await;

    let mut client = TcpStream::connect(gateway.addr).await.unwrap();
    client.write_all(&[LOGIN_OPCODE + 1]).await.unwrap();

    assert_eq!(common::read_rejection(&mut client).await, 27);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn attempt_after_max_is_refused() {
    let (backend_addr, _preambles) = common::start_echo_backend().await;
    let mut config = common::test_config(backend_addr);
    config.admission.max_attempts = 3;
    let gateway = common::spawn_gateway(config).await;

    // The first three reach handshake evaluation and fail it.
    for attempt in 1..=3 {
        let mut client = TcpStream::connect(gateway.addr).await.unwrap();
        client.write_all(&[0xFF]).await.unwrap();
        assert_eq!(
            common::read_rejection(&mut client).await,
            RejectCode::MalformedLogin.as_byte(),
            "attempt {attempt}"
        );
    }

    let mut client = TcpStream::connect(gateway.addr).await.unwrap();
    assert_eq!(common::read_rejection(&mut client).await, RejectCode::AttemptsExceeded.as_byte());
    assert_eq!(gateway.stats.snapshot().connections_opened, 3);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn sweep_readmits_a_quiet_source() {
    let (backend_addr, _preambles) = common::start_echo_backend().await;
    let mut config = common::test_config(backend_addr);
    config.admission.max_attempts = 1;
    let gateway = common::spawn_gateway(config).await;

    let mut first = TcpStream::connect(gateway.addr).await.unwrap();
    first.write_all(&[0]).await.unwrap();
    assert_eq!(common::read_rejection(&mut first).await, 27);

    let mut second = TcpStream::connect(gateway.addr).await.unwrap();
    assert_eq!(common::read_rejection(&mut second).await, 16);

    assert_eq!(gateway.tracker.sweep(unix_now() + 61), 1);

    let mut third = TcpStream::connect(gateway.addr).await.unwrap();
    third.write_all(&[0]).await.unwrap();
    assert_eq!(common::read_rejection(&mut third).await, 27);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn unreachable_backend_reports_unable_to_connect() {
    let backend_addr = common::unused_address().await;
    let gateway = common::spawn_gateway(common::test_config(backend_addr)).await;

    let mut client = TcpStream::connect(gateway.addr).await.unwrap();
    client.write_all(&[LOGIN_OPCODE]).await.unwrap();

    assert_eq!(common::read_rejection(&mut client).await, RejectCode::UnableToConnect.as_byte());

    let snapshot = gateway.stats.snapshot();
    assert_eq!(snapshot.connections_opened, 1);
    assert_eq!(snapshot.connections_established, 0);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn backend_dial_timeout_reports_unable_to_connect() {
    let backend = common::start_stalled_backend().await;
    let mut config = common::test_config(backend.addr);
    config.backend.connect_timeout_ms = 200;
    let gateway = common::spawn_gateway(config).await;

    let mut client = TcpStream::connect(gateway.addr).await.unwrap();
    let started = tokio::time::Instant::now();
    client.write_all(&[LOGIN_OPCODE]).await.unwrap();

    assert_eq!(common::read_rejection(&mut client).await, RejectCode::UnableToConnect.as_byte());
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(gateway.stats.snapshot().connections_established, 0);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn client_that_closes_early_is_rejected_session() {
    let (backend_addr, _preambles) = common::start_echo_backend().await;
    let gateway = common::spawn_gateway(common::test_config(backend_addr)).await;

    let mut client = TcpStream::connect(gateway.addr).await.unwrap();
    client.shutdown().await.unwrap();

    assert_eq!(common::read_rejection(&mut client).await, RejectCode::RejectedSession.as_byte());

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn shutdown_tears_down_live_tunnels() {
    let (backend_addr, mut preambles) = common::start_echo_backend().await;
    let gateway = common::spawn_gateway(common::test_config(backend_addr)).await;

    let mut client = TcpStream::connect(gateway.addr).await.unwrap();
    client.write_all(&[LOGIN_OPCODE]).await.unwrap();
    preambles.recv().await.unwrap();

    gateway.shutdown.trigger();

    let mut buf = [0u8; 8];
    let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .expect("tunnel was not torn down")
        .unwrap_or(0);
    assert_eq!(n, 0);

    tokio::time::timeout(Duration::from_secs(3), gateway.task)
        .await
        .expect("gateway did not stop")
        .unwrap();
}
