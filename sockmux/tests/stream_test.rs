/*!
 * Stream I/O Tests
 * Echo, short reads, waiter FIFO ordering, and cancellation isolation
 */

mod common;

use common::{fast_manager, stream_pair};
use nix::sys::socket::{send, MsgFlags};
use pretty_assertions::assert_eq;
use sockmux::{SocketError, SocketEvent};
use std::os::fd::AsRawFd;
use std::time::Duration;

#[tokio::test]
async fn test_socketpair_echo() {
    let manager = fast_manager();
    let (alpha, beta) = stream_pair();
    let (fd_a, fd_b) = (alpha.as_raw_fd(), beta.as_raw_fd());
    let mut events_a = manager.add(alpha);
    let mut events_b = manager.add(beta);

    let written = manager.write(fd_a, &[0x01, 0x02, 0x03]).await.expect("write");
    assert_eq!(written, 3);

    let bytes = manager.read(fd_b, 8).await.expect("read");
    assert_eq!(bytes, vec![0x01, 0x02, 0x03]);

    assert_eq!(events_a.next().await, Some(SocketEvent::Write(3)));
    assert_eq!(events_b.next().await, Some(SocketEvent::Read(3)));
}

#[tokio::test]
async fn test_reads_concatenate_to_written_bytes() {
    let manager = fast_manager();
    let (alpha, beta) = stream_pair();
    let (fd_a, fd_b) = (alpha.as_raw_fd(), beta.as_raw_fd());
    let _events_a = manager.add(alpha);
    let _events_b = manager.add(beta);

    let payload: Vec<u8> = (0..8).collect();
    assert_eq!(manager.write(fd_a, &payload).await.expect("write"), 8);

    // Short reads are successful partial progress; the concatenation
    // equals what was written.
    let mut collected = Vec::new();
    while collected.len() < payload.len() {
        let chunk = manager.read(fd_b, 3).await.expect("read");
        assert!(!chunk.is_empty());
        assert!(chunk.len() <= 3);
        collected.extend_from_slice(&chunk);
    }
    assert_eq!(collected, payload);
}

#[tokio::test]
async fn test_read_waiters_complete_in_fifo_order() {
    let manager = fast_manager();
    let (alpha, beta) = stream_pair();
    let fd = alpha.as_raw_fd();
    let _events = manager.add(alpha);

    // Three one-byte readers queued in submission order while the
    // socket has nothing to read.
    let mut readers = Vec::new();
    for _ in 0..3 {
        let manager = manager.clone();
        readers.push(tokio::spawn(async move { manager.read(fd, 1).await }));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    send(beta.as_raw_fd(), &[0x11, 0x22, 0x33], MsgFlags::empty()).expect("send");

    let mut received = Vec::new();
    for reader in readers {
        let bytes = reader.await.expect("join").expect("read");
        assert_eq!(bytes.len(), 1);
        received.push(bytes[0]);
    }
    assert_eq!(received, vec![0x11, 0x22, 0x33]);
}

#[tokio::test]
async fn test_cancelled_waiter_leaves_others_pending() {
    let manager = fast_manager();
    let (alpha, beta) = stream_pair();
    let fd = alpha.as_raw_fd();
    let _events = manager.add(alpha);

    let first = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.read(fd, 1).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    let second = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.read(fd, 1).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    // Cancel the older waiter; the socket and the younger waiter are
    // unaffected.
    first.abort();
    assert!(first.await.is_err());
    assert!(manager.contains(fd));

    send(beta.as_raw_fd(), &[0x77], MsgFlags::empty()).expect("send");
    let bytes = second.await.expect("join").expect("read");
    assert_eq!(bytes, vec![0x77]);
}

#[tokio::test]
async fn test_hangup_with_pending_data_delivers_final_read() {
    let manager = fast_manager();
    let (alpha, beta) = stream_pair();
    let fd = alpha.as_raw_fd();
    let _events = manager.add(alpha);

    let reader = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.read(fd, 8).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    // No await point between the send and the close: the monitor
    // observes the readable data and the hangup in one poll tick, wakes
    // the queued reader, and removes the socket in the same pass. The
    // woken reader must still complete its read.
    send(beta.as_raw_fd(), &[0xDE, 0xAD], MsgFlags::empty()).expect("send");
    drop(beta);

    let bytes = reader.await.expect("join").expect("read");
    assert_eq!(bytes, vec![0xDE, 0xAD]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!manager.contains(fd));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_serialize_on_the_state() {
    let manager = fast_manager();
    let (alpha, beta) = stream_pair();
    let (fd_a, fd_b) = (alpha.as_raw_fd(), beta.as_raw_fd());
    let _events_a = manager.add(alpha);
    let _events_b = manager.add(beta);

    // A steady-state writable descriptor lets both writers take the
    // ready fast path together; the state serializes the syscalls.
    let one = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.write(fd_a, b"aaaa").await })
    };
    let two = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.write(fd_a, b"bbbb").await })
    };
    assert_eq!(one.await.expect("join").expect("write"), 4);
    assert_eq!(two.await.expect("join").expect("write"), 4);

    let mut collected = Vec::new();
    while collected.len() < 8 {
        collected.extend(manager.read(fd_b, 8).await.expect("read"));
    }
    assert!(
        collected == b"aaaabbbb" || collected == b"bbbbaaaa",
        "writes interleaved: {:?}",
        collected
    );
}

#[tokio::test]
async fn test_remove_fails_pending_waits_with_given_error() {
    let manager = fast_manager();
    let (alpha, _beta) = stream_pair();
    let fd = alpha.as_raw_fd();
    let _events = manager.add(alpha);

    let mut readers = Vec::new();
    for _ in 0..2 {
        let manager = manager.clone();
        readers.push(tokio::spawn(async move { manager.read(fd, 1).await }));
    }
    tokio::time::sleep(Duration::from_millis(10)).await;

    manager.remove(fd, Some(SocketError::BadFileDescriptor));
    for reader in readers {
        let error = reader.await.expect("join").unwrap_err();
        assert_eq!(error, SocketError::BadFileDescriptor);
    }
}

#[tokio::test]
async fn test_remove_defaults_to_connection_aborted() {
    let manager = fast_manager();
    let (alpha, _beta) = stream_pair();
    let fd = alpha.as_raw_fd();
    let _events = manager.add(alpha);

    let reader = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.read(fd, 1).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    manager.remove(fd, None);
    let error = reader.await.expect("join").unwrap_err();
    assert_eq!(error, SocketError::ConnectionAborted);
}
