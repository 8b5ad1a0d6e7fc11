/*!
 * Shared test helpers
 */
#![allow(dead_code)]

use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};
use sockmux::{MonitorConfig, SocketManager};
use std::os::fd::OwnedFd;
use std::time::Duration;

/// Connected Unix stream pair, already non-blocking.
pub fn stream_pair() -> (OwnedFd, OwnedFd) {
    socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::SOCK_NONBLOCK,
    )
    .expect("socketpair")
}

/// Connected Unix datagram pair, already non-blocking.
pub fn datagram_pair() -> (OwnedFd, OwnedFd) {
    socketpair(
        AddressFamily::Unix,
        SockType::Datagram,
        None,
        SockFlag::SOCK_NONBLOCK,
    )
    .expect("socketpair")
}

/// Manager with a 1ms poll cadence so tests settle quickly.
pub fn fast_manager() -> SocketManager {
    SocketManager::with_config(MonitorConfig {
        monitor_interval: Duration::from_millis(1),
        ..MonitorConfig::default()
    })
}
