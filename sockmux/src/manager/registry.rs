/*!
 * Socket Registry
 * Descriptor-to-state map and the poll vector, mutated together
 *
 * Both structures live behind one lock: a descriptor appears in the map
 * iff it appears in the poll vector, and the vector stays sorted by
 * ascending descriptor value so every poll tick iterates sockets in a
 * deterministic order.
 */

use crate::core::types::requested_events;
use crate::socket::SocketState;
use ahash::RandomState;
use nix::poll::PollFlags;
use std::collections::HashMap;
use std::os::fd::RawFd;
use std::sync::Arc;

/// One slot handed to the OS poll syscall
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollEntry {
    pub(crate) fd: RawFd,
    pub(crate) events: PollFlags,
}

#[derive(Default)]
pub(crate) struct Registry {
    sockets: HashMap<RawFd, Arc<SocketState>, RandomState>,
    poll_entries: Vec<PollEntry>,
    /// Whether the background monitor task is active
    monitoring: bool,
}

impl Registry {
    pub(crate) fn contains(&self, fd: RawFd) -> bool {
        self.sockets.contains_key(&fd)
    }

    pub(crate) fn get(&self, fd: RawFd) -> Option<Arc<SocketState>> {
        self.sockets.get(&fd).cloned()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.sockets.len()
    }

    pub(crate) fn entries(&self) -> &[PollEntry] {
        &self.poll_entries
    }

    pub(crate) fn states(&self) -> impl Iterator<Item = &Arc<SocketState>> {
        self.sockets.values()
    }

    /// Insert a new state and rebuild the poll vector. Returns false if
    /// the descriptor is already registered.
    pub(crate) fn insert(&mut self, state: Arc<SocketState>) -> bool {
        let fd = state.raw_fd();
        if self.sockets.contains_key(&fd) {
            return false;
        }
        self.sockets.insert(fd, state);
        self.rebuild();
        true
    }

    /// Remove and return the state for `fd`, rebuilding the poll vector.
    pub(crate) fn remove(&mut self, fd: RawFd) -> Option<Arc<SocketState>> {
        let state = self.sockets.remove(&fd)?;
        self.rebuild();
        Some(state)
    }

    /// Rebuild the poll vector: one entry per registered descriptor,
    /// requesting the full event set, sorted ascending by value.
    fn rebuild(&mut self) {
        self.poll_entries.clear();
        self.poll_entries.extend(self.sockets.keys().map(|&fd| PollEntry {
            fd,
            events: requested_events(),
        }));
        self.poll_entries.sort_unstable_by_key(|entry| entry.fd);
    }

    pub(crate) fn monitoring(&self) -> bool {
        self.monitoring
    }

    pub(crate) fn set_monitoring(&mut self, active: bool) {
        self.monitoring = active;
    }
}
