//! Integration tests for the connection registry.
//!
//! These drive real loopback listeners through the registry: duplicate
//! and unknown names, the full sweep, re-registration, bounded
//! disconnect latency and the behavior of saturated pools.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use gantry_core::types::ConnectionState;
use gantry_net::{
    ConnectionHandler, ConnectionRegistry, HandlerFactory, RegistryError, TokioPool,
    DEFAULT_ACCEPT_TIMEOUT,
};

/// Echoes everything it reads back to the peer.
struct EchoHandler;

#[async_trait]
impl ConnectionHandler for EchoHandler {
    async fn handle(&self, mut stream: TcpStream, _peer: SocketAddr) -> io::Result<()> {
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            stream.write_all(&buf[..n]).await?;
        }
    }
}

struct EchoFactory;

#[async_trait]
impl HandlerFactory for EchoFactory {
    async fn create_handler(&self) -> anyhow::Result<Arc<dyn ConnectionHandler>> {
        Ok(Arc::new(EchoHandler))
    }
}

/// Holds the connection open far longer than any test runs.
struct StallHandler;

#[async_trait]
impl ConnectionHandler for StallHandler {
    async fn handle(&self, _stream: TcpStream, _peer: SocketAddr) -> io::Result<()> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(())
    }
}

struct StallFactory;

#[async_trait]
impl HandlerFactory for StallFactory {
    async fn create_handler(&self) -> anyhow::Result<Arc<dyn ConnectionHandler>> {
        Ok(Arc::new(StallHandler))
    }
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[tokio::test]
async fn duplicate_connect_rejected() {
    let registry = ConnectionRegistry::new();
    let (first, _) = bind().await;
    let (second, _) = bind().await;

    registry.connect("x", first, Arc::new(EchoFactory)).unwrap();

    let err = registry
        .connect("x", second, Arc::new(EchoFactory))
        .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateConnection("x".to_string()));

    // The original entry is untouched.
    assert_eq!(registry.state("x"), Some(ConnectionState::Running));
    assert_eq!(registry.len(), 1);

    registry.dispose_all().await;
}

#[tokio::test]
async fn unknown_disconnect_leaves_registry_unchanged() {
    let registry = ConnectionRegistry::new();
    let (listener, _) = bind().await;
    registry.connect("keep", listener, Arc::new(EchoFactory)).unwrap();

    let err = registry.disconnect("nonexistent", false).await.unwrap_err();
    assert_eq!(
        err,
        RegistryError::UnknownConnection("nonexistent".to_string())
    );
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.state("keep"), Some(ConnectionState::Running));

    registry.dispose_all().await;
}

#[tokio::test]
async fn echo_round_trip() {
    let registry = ConnectionRegistry::new();
    let (listener, addr) = bind().await;
    registry.connect("echo", listener, Arc::new(EchoFactory)).unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"hello").await.unwrap();

    let mut buf = [0u8; 5];
    timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf, b"hello");

    drop(stream);
    registry.disconnect("echo", false).await.unwrap();
    assert!(registry.is_empty());
}

#[tokio::test]
async fn re_registration_after_disposal() {
    let registry = ConnectionRegistry::new();
    let (first, _) = bind().await;

    let first_id = registry.connect("x", first, Arc::new(EchoFactory)).unwrap();
    registry.disconnect("x", false).await.unwrap();
    assert_eq!(registry.state("x"), None);

    let (second, _) = bind().await;
    let second_id = registry.connect("x", second, Arc::new(EchoFactory)).unwrap();
    assert_ne!(first_id, second_id, "re-registration mints a fresh id");
    assert_eq!(registry.state("x"), Some(ConnectionState::Running));

    registry.dispose_all().await;
}

#[tokio::test]
async fn dispose_all_empties_registry() {
    let registry = ConnectionRegistry::new();
    for name in ["a", "b", "c"] {
        let (listener, _) = bind().await;
        registry.connect(name, listener, Arc::new(EchoFactory)).unwrap();
    }
    assert_eq!(registry.len(), 3);

    registry.dispose_all().await;

    assert!(registry.is_empty());
    assert!(registry.names().is_empty());
    for name in ["a", "b", "c"] {
        assert_eq!(registry.state(name), None);
    }

    // A second sweep over the now-empty registry is a no-op.
    registry.dispose_all().await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn reconnect_does_not_wait_for_old_teardown() {
    let registry = Arc::new(ConnectionRegistry::new());
    let (first, _) = bind().await;

    // A long accept timeout makes the old loop slow to notice
    // cancellation; removal from the map must not wait for it.
    registry
        .connect_with(
            "x",
            first,
            Arc::new(EchoFactory),
            None,
            Duration::from_secs(2),
        )
        .unwrap();

    let disconnecting = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.disconnect("x", false).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The name is free while the old entry is still tearing down.
    let (second, _) = bind().await;
    registry.connect("x", second, Arc::new(EchoFactory)).unwrap();

    disconnecting.await.unwrap().unwrap();
    registry.dispose_all().await;
}

#[tokio::test]
async fn zero_accept_timeout_gets_default() {
    let registry = ConnectionRegistry::new();
    let (listener, _) = bind().await;
    registry
        .connect_with("z", listener, Arc::new(EchoFactory), None, Duration::ZERO)
        .unwrap();

    let info = registry.info("z").unwrap();
    assert_eq!(info.accept_timeout, DEFAULT_ACCEPT_TIMEOUT);
    assert_eq!(info.state, ConnectionState::Running);
    assert_eq!(info.name, "z");

    registry.dispose_all().await;
}

#[tokio::test]
async fn graceful_disconnect_latency_is_bounded() {
    let registry = ConnectionRegistry::new();
    let (listener, _) = bind().await;
    registry
        .connect_with(
            "fast",
            listener,
            Arc::new(EchoFactory),
            None,
            Duration::from_millis(200),
        )
        .unwrap();

    let started = Instant::now();
    registry.disconnect("fast", false).await.unwrap();

    // One accept-timeout interval plus grace, with slack for CI.
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "disconnect took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn force_disconnect_aborts_stalled_handlers() {
    let registry = ConnectionRegistry::new();
    let (listener, addr) = bind().await;
    registry
        .connect_with(
            "stall",
            listener,
            Arc::new(StallFactory),
            None,
            Duration::from_millis(100),
        )
        .unwrap();

    // Get a handler stuck in flight.
    let _stream = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let started = Instant::now();
    registry.disconnect("stall", true).await.unwrap();
    assert!(
        started.elapsed() < Duration::from_millis(1500),
        "forced disconnect took {:?}",
        started.elapsed()
    );
    assert!(registry.is_empty());
}

#[tokio::test]
async fn saturated_pool_drops_connection_but_not_loop() {
    // One permit, and the accept loop itself takes it.
    let pool = Arc::new(TokioPool::bounded(1));
    let registry = ConnectionRegistry::with_defaults(pool, Duration::from_millis(100));
    let (listener, addr) = bind().await;
    registry.connect("tight", listener, Arc::new(EchoFactory)).unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"ping").await.unwrap();

    // The dispatch is rejected, so the stream just closes on us.
    let mut buf = [0u8; 16];
    match timeout(Duration::from_secs(5), stream.read(&mut buf)).await {
        Ok(Ok(0)) | Ok(Err(_)) => {}
        Ok(Ok(n)) => panic!("unexpected {} bytes from a dropped dispatch", n),
        Err(_) => panic!("read did not resolve"),
    }

    // The accept loop survived the rejection.
    assert_eq!(registry.state("tight"), Some(ConnectionState::Running));

    registry.dispose_all().await;
    assert!(registry.is_empty());
}
