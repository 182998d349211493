//! Transport sink tests

use std::io::ErrorKind;
use std::time::Duration;

use bytes::Bytes;
use tether_pipeline::{PipelineError, Sink};
use tether_protocol::{Batch, Event, MAX_FRAME_SIZE, decode_payload, encoded_frame_len};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use super::{DEFAULT_PORT, TransportSink, TransportSinkConfig};

// ============================================================================
// Helper Functions
// ============================================================================

/// Bind a peer on an ephemeral port
async fn bind_peer() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Find a port with nothing listening on it
async fn find_closed_port() -> u16 {
    let (listener, port) = bind_peer().await;
    drop(listener);
    port
}

fn sink_for(port: u16) -> TransportSink {
    TransportSink::new(
        TransportSinkConfig::new("127.0.0.1", port).with_connect_timeout(Duration::from_secs(2)),
    )
}

/// Read one frame from the peer side and decode it
async fn read_frame(stream: &mut TcpStream) -> Vec<Event> {
    let len = stream.read_u32().await.unwrap() as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    decode_payload(Bytes::from(payload)).unwrap()
}

fn io_kind(err: &PipelineError) -> Option<ErrorKind> {
    match err {
        PipelineError::Io(e) => Some(e.kind()),
        _ => None,
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_config_default() {
    let config = TransportSinkConfig::default();

    assert_eq!(config.host, "localhost");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.connect_timeout, Duration::from_secs(10));
    assert_eq!(config.write_timeout, Duration::from_secs(5));
    assert!(config.nodelay);
    assert!(config.keepalive);
}

#[test]
fn test_config_builders() {
    let config = TransportSinkConfig::new("collector", 9000)
        .with_connect_timeout(Duration::from_secs(1))
        .with_write_timeout(Duration::from_millis(250))
        .with_nodelay(false)
        .with_keepalive(false);

    assert_eq!(config.address(), "collector:9000");
    assert_eq!(config.connect_timeout, Duration::from_secs(1));
    assert_eq!(config.write_timeout, Duration::from_millis(250));
    assert!(!config.nodelay);
    assert!(!config.keepalive);
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_open_refused_is_connect_error() {
    let port = find_closed_port().await;
    let mut sink = sink_for(port);

    let err = sink.open().await.unwrap_err();
    assert!(matches!(err, PipelineError::Connect { .. }));
    assert!(err.is_io());
    assert!(!sink.is_open());
}

#[tokio::test]
async fn test_append_before_open_fails() {
    let mut sink = sink_for(DEFAULT_PORT);

    let err = sink.append(Event::new("x")).await.unwrap_err();
    assert_eq!(io_kind(&err), Some(ErrorKind::NotConnected));
    assert_eq!(sink.sent_bytes(), 0);
}

#[tokio::test]
async fn test_open_twice_fails() {
    let (listener, port) = bind_peer().await;
    let mut sink = sink_for(port);
    sink.open().await.unwrap();
    let _peer = listener.accept().await.unwrap();

    let err = sink.open().await.unwrap_err();
    assert!(matches!(err, PipelineError::AlreadyOpen(_)));
    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_close_then_append_fails() {
    let (listener, port) = bind_peer().await;
    let mut sink = sink_for(port);
    sink.open().await.unwrap();
    let _peer = listener.accept().await.unwrap();

    sink.close().await.unwrap();
    sink.close().await.unwrap();

    let err = sink.append(Event::new("late")).await.unwrap_err();
    assert_eq!(io_kind(&err), Some(ErrorKind::NotConnected));
}

// ============================================================================
// Framing Tests
// ============================================================================

#[tokio::test]
async fn test_append_sends_one_frame_per_event() {
    let (listener, port) = bind_peer().await;
    let mut sink = sink_for(port);
    sink.open().await.unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();

    let first = Event::builder("first").attribute("seq", 1_i64).build();
    let second = Event::new("second");
    let expected_bytes = encoded_frame_len(std::slice::from_ref(&first))
        + encoded_frame_len(std::slice::from_ref(&second));

    sink.append(first.clone()).await.unwrap();
    sink.append(second.clone()).await.unwrap();

    assert_eq!(read_frame(&mut peer).await, vec![first]);
    assert_eq!(read_frame(&mut peer).await, vec![second]);
    assert_eq!(sink.sent_bytes(), expected_bytes as u64);

    let snapshot = sink.metrics_handle().snapshot();
    assert_eq!(snapshot.writes, 2);
    assert_eq!(snapshot.events_written, 2);
    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_append_batch_sends_single_frame() {
    let (listener, port) = bind_peer().await;
    let mut sink = sink_for(port);
    sink.open().await.unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();

    let batch: Batch = (0..3).map(|i| Event::new(format!("e{i}"))).collect();
    let expected = batch.events().to_vec();
    let expected_bytes = batch.encoded_len();

    sink.append_batch(batch).await.unwrap();

    assert_eq!(read_frame(&mut peer).await, expected);
    assert_eq!(sink.sent_bytes(), expected_bytes as u64);
    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_append_batch_over_frame_limit_splits_in_order() {
    let (listener, port) = bind_peer().await;
    let mut sink = sink_for(port);
    sink.open().await.unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();

    // 200 x 100 KiB is past MAX_FRAME_SIZE as one frame
    let body = Bytes::from(vec![7_u8; 100 * 1024]);
    let batch: Batch = (0..200_i64)
        .map(|i| Event::builder(body.clone()).attribute("seq", i).build())
        .collect();
    let expected = batch.events().to_vec();
    assert!(batch.encoded_len() > MAX_FRAME_SIZE as usize);

    let reader = tokio::spawn(async move {
        let mut frames = Vec::new();
        let mut received = 0;
        while received < 200 {
            let frame = read_frame(&mut peer).await;
            received += frame.len();
            frames.push(frame);
        }
        frames
    });

    sink.append_batch(batch).await.unwrap();
    let frames = timeout(Duration::from_secs(10), reader).await.unwrap().unwrap();

    assert_eq!(frames.len(), 2);
    let expected_bytes: usize = frames.iter().map(|f| encoded_frame_len(f)).sum();
    assert_eq!(frames.concat(), expected);
    assert_eq!(sink.sent_bytes(), expected_bytes as u64);
    assert_eq!(sink.metrics_handle().snapshot().events_written, 200);
    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_event_too_large_for_any_frame_is_refused() {
    let (listener, port) = bind_peer().await;
    let mut sink = sink_for(port);
    sink.open().await.unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();

    let huge = Event::new(vec![0_u8; MAX_FRAME_SIZE as usize]);
    let batch: Batch = vec![Event::new("small"), huge].into_iter().collect();

    let err = sink.append_batch(batch).await.unwrap_err();
    assert!(err.is_serialization());
    assert!(sink.is_open());
    assert_eq!(sink.sent_bytes(), 0);

    let good = Event::new("after");
    sink.append(good.clone()).await.unwrap();
    assert_eq!(read_frame(&mut peer).await, vec![good]);
    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_batch_sends_nothing() {
    let (listener, port) = bind_peer().await;
    let mut sink = sink_for(port);
    sink.open().await.unwrap();
    let _peer = listener.accept().await.unwrap();

    sink.append_batch(Batch::new()).await.unwrap();
    assert_eq!(sink.sent_bytes(), 0);
    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_encode_error_keeps_connection() {
    let (listener, port) = bind_peer().await;
    let mut sink = sink_for(port);
    sink.open().await.unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();

    let oversized_key = "k".repeat(u16::MAX as usize + 1);
    let bad = Event::builder("bad").attribute(oversized_key, true).build();

    let err = sink.append(bad).await.unwrap_err();
    assert!(err.is_serialization());
    assert!(sink.is_open());
    assert_eq!(sink.sent_bytes(), 0);

    let good = Event::new("good");
    sink.append(good.clone()).await.unwrap();
    assert_eq!(read_frame(&mut peer).await, vec![good]);
    sink.close().await.unwrap();
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_peer_reset_faults_sink() {
    let (listener, port) = bind_peer().await;
    let mut sink = sink_for(port);
    sink.open().await.unwrap();
    let (peer, _) = listener.accept().await.unwrap();
    drop(peer);
    drop(listener);

    // The first writes may land in the kernel buffer before the reset arrives
    let failed = timeout(Duration::from_secs(5), async {
        loop {
            if let Err(e) = sink.append(Event::new(vec![0u8; 1024])).await {
                return e;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("write to a closed peer should eventually fail");

    assert!(failed.is_io());
    assert!(sink.is_faulted());
    assert_eq!(sink.metrics_handle().snapshot().write_errors, 1);

    let bytes_before = sink.sent_bytes();
    let err = sink.append(Event::new("after fault")).await.unwrap_err();
    assert_eq!(io_kind(&err), Some(ErrorKind::BrokenPipe));
    assert_eq!(sink.sent_bytes(), bytes_before);

    // Closing a faulted sink succeeds and resets it
    sink.close().await.unwrap();
    assert!(!sink.is_faulted());
}
