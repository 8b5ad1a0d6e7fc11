/*!
 * Direction and Event Sets
 * The I/O directions callers can wait on, and the poll event vocabulary
 */

use nix::poll::PollFlags;
use std::fmt;

/// I/O direction a caller can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    /// Poll flag announcing readiness in this direction.
    pub(crate) fn readiness(self) -> PollFlags {
        match self {
            Direction::Read => PollFlags::POLLIN,
            Direction::Write => PollFlags::POLLOUT,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => write!(f, "read"),
            Direction::Write => write!(f, "write"),
        }
    }
}

/// Event set requested from the OS for every registered descriptor.
///
/// Error, hangup, and invalid-descriptor conditions are always reported
/// by `poll(2)`; requesting them explicitly keeps the vector's intent
/// visible in one place.
pub(crate) fn requested_events() -> PollFlags {
    PollFlags::POLLIN
        | PollFlags::POLLOUT
        | PollFlags::POLLERR
        | PollFlags::POLLHUP
        | PollFlags::POLLNVAL
}
