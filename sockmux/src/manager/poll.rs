/*!
 * Poll Step
 * One zero-timeout readiness poll over the registered descriptors
 *
 * Runs under the registry lock so the poll vector cannot change
 * mid-syscall; the zero timeout keeps the critical section bounded.
 */

use super::registry::Registry;
use crate::socket::SocketState;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::os::fd::RawFd;
use std::sync::Arc;

/// Readiness observed for one descriptor during a poll step
pub(crate) struct ReadySocket {
    pub(crate) fd: RawFd,
    pub(crate) revents: PollFlags,
    pub(crate) state: Arc<SocketState>,
}

/// Poll every registered descriptor once, store the returned events on
/// each state, and report the descriptors with any returned events in
/// ascending descriptor order.
pub(crate) fn poll_step(registry: &Registry) -> Result<Vec<ReadySocket>, Errno> {
    let entries = registry.entries();
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    // The states backing each entry, in vector order. The registry keeps
    // the map and the vector in lockstep, so the lookup cannot miss.
    let states: Vec<Arc<SocketState>> = entries
        .iter()
        .map(|entry| {
            registry
                .get(entry.fd)
                .expect("poll vector entry without registered state")
        })
        .collect();

    let mut poll_fds: Vec<PollFd> = states
        .iter()
        .zip(entries)
        .map(|(state, entry)| PollFd::new(state.borrowed(), entry.events))
        .collect();

    loop {
        match poll(&mut poll_fds, PollTimeout::ZERO) {
            Ok(_) => break,
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(errno),
        }
    }

    let mut ready = Vec::new();
    for ((poll_fd, entry), state) in poll_fds.iter().zip(entries).zip(states.iter()) {
        let revents = poll_fd.revents().unwrap_or_else(PollFlags::empty);
        state.set_returned_events(revents);
        if !revents.is_empty() {
            ready.push(ReadySocket {
                fd: entry.fd,
                revents,
                state: Arc::clone(state),
            });
        }
    }
    Ok(ready)
}
