//! Integration tests for the stream transports (TCP and in-memory).
//!
//! These spin up a real TCP listener on a random port and verify that
//! bytes flow both ways and that `recv_exact` distinguishes a clean close
//! from a truncated message.

use gridduel_transport::{
    connect, memory_pair, Connection, TcpTransport, Transport, TransportError,
};

#[tokio::test]
async fn test_tcp_accept_and_send_receive() {
    // "127.0.0.1:0" tells the OS to pick an available port.
    let mut transport = TcpTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = transport.local_addr().expect("local addr").to_string();

    let server_handle = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });

    let client = connect(&addr).await.expect("client should connect");
    let server_conn = server_handle.await.expect("task should complete");

    assert!(server_conn.id().into_inner() > 0);
    assert_ne!(server_conn.id(), client.id());

    // --- Server sends, client receives ---
    server_conn.send(b"hello").await.expect("send should succeed");
    let received = client
        .recv_exact(5)
        .await
        .expect("recv should succeed")
        .expect("should have data");
    assert_eq!(received, b"hello");

    // --- Client sends, server receives in two exact reads ---
    client.send(&[7, 1, 2]).await.unwrap();
    let tag = server_conn.recv_exact(1).await.unwrap().unwrap();
    let rest = server_conn.recv_exact(2).await.unwrap().unwrap();
    assert_eq!(tag, [7]);
    assert_eq!(rest, [1, 2]);

    server_conn.close().await.expect("close should succeed");
}

#[tokio::test]
async fn test_tcp_recv_returns_none_on_clean_close() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap().to_string();

    let server_handle =
        tokio::spawn(async move { transport.accept().await.unwrap() });

    let client = connect(&addr).await.unwrap();
    let server_conn = server_handle.await.unwrap();

    client.close().await.unwrap();

    let result = server_conn.recv_exact(1).await.expect("recv should not error");
    assert!(result.is_none(), "should return None on client close");
}

#[tokio::test]
async fn test_memory_pair_round_trip() {
    let (a, b) = memory_pair(64);

    a.send(&[1, 2, 3]).await.unwrap();
    assert_eq!(b.recv_exact(3).await.unwrap().unwrap(), [1, 2, 3]);

    b.send(&[9]).await.unwrap();
    assert_eq!(a.recv_exact(1).await.unwrap().unwrap(), [9]);
}

#[tokio::test]
async fn test_memory_recv_exact_truncated_message_is_error() {
    let (a, b) = memory_pair(64);

    a.send(&[1, 2]).await.unwrap();
    a.close().await.unwrap();

    let result = b.recv_exact(3).await;
    assert!(
        matches!(result, Err(TransportError::ConnectionClosed(_))),
        "a close mid-message must not look like a clean close"
    );
}

#[tokio::test]
async fn test_memory_recv_exact_spans_multiple_writes() {
    let (a, b) = memory_pair(64);

    let reader = tokio::spawn(async move { b.recv_exact(4).await });

    a.send(&[1]).await.unwrap();
    tokio::task::yield_now().await;
    a.send(&[2, 3]).await.unwrap();
    a.send(&[4]).await.unwrap();

    let got = reader.await.unwrap().unwrap().unwrap();
    assert_eq!(got, [1, 2, 3, 4]);
}

#[tokio::test]
async fn test_send_to_dropped_peer_fails() {
    let (a, b) = memory_pair(4);
    drop(b);

    let result = a.send(&[0; 4]).await;
    assert!(
        matches!(result, Err(TransportError::SendFailed(_))),
        "sending to a dropped peer should fail"
    );
}
