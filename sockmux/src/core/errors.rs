/*!
 * Error Types
 * Failure taxonomy surfaced by socket operations
 */

use nix::errno::Errno;
use std::os::fd::RawFd;
use thiserror::Error;

/// Result type for socket operations
pub type SocketResult<T> = Result<T, SocketError>;

/// Errors surfaced by the multiplexer
///
/// Syscall errors pass through as [`SocketError::Os`] and never remove
/// the socket; the readiness conditions reported by the poll loop map to
/// the dedicated variants and do.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SocketError {
    /// Operation on a descriptor that is not registered
    #[error("socket {0} is not registered")]
    InvalidArgument(RawFd),

    /// Socket removed while waiting, or the OS reported an error condition
    #[error("connection aborted")]
    ConnectionAborted,

    /// Peer hung up
    #[error("connection reset by peer")]
    ConnectionReset,

    /// The OS rejected the descriptor as invalid
    #[error("bad file descriptor")]
    BadFileDescriptor,

    /// Raw OS error passed through from a syscall
    #[error("os error: {0}")]
    Os(#[from] Errno),
}
