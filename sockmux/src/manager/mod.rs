/*!
 * Socket Manager
 * Process-wide coordinator for asynchronous socket readiness
 *
 * Owns the descriptor registry and the poll vector, runs the background
 * monitor task, and serializes registration, removal, and waiting. I/O
 * operations resolve the socket state, await readiness in the relevant
 * direction, then execute exactly one syscall.
 */

mod config;
mod monitor;
mod poll;
mod registry;

pub use config::{MonitorConfig, MonitorPriority, DEFAULT_MONITOR_INTERVAL};

use crate::core::errors::{SocketError, SocketResult};
use crate::core::types::Direction;
use crate::events::{EventSink, SocketEvents};
use crate::socket::SocketState;
use log::{error, info, trace, warn};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::PollFlags;
use nix::sys::socket::SockaddrLike;
use parking_lot::Mutex;
use poll::{poll_step, ReadySocket};
use registry::Registry;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::{Arc, OnceLock};
use tokio::sync::oneshot;

static GLOBAL: OnceLock<SocketManager> = OnceLock::new();

/// Aggregate view of the manager's state (diagnostics)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub registered_sockets: usize,
    pub pending_read_waiters: usize,
    pub pending_write_waiters: usize,
    pub monitoring: bool,
}

pub(crate) struct ManagerInner {
    pub(crate) registry: Mutex<Registry>,
    pub(crate) config: MonitorConfig,
}

/// Process-wide socket readiness coordinator
///
/// Cheap to clone; clones share the same registry and monitor task.
/// Registration must happen inside a tokio runtime, and the monitor task
/// lives on the runtime that was active at that point.
#[derive(Clone)]
pub struct SocketManager {
    inner: Arc<ManagerInner>,
}

impl SocketManager {
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    pub fn with_config(config: MonitorConfig) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                registry: Mutex::new(Registry::default()),
                config,
            }),
        }
    }

    /// Lazily-initialized process-wide instance with default
    /// configuration.
    pub fn global() -> &'static SocketManager {
        GLOBAL.get_or_init(SocketManager::new)
    }

    /// Whether `fd` is currently registered.
    pub fn contains(&self, fd: RawFd) -> bool {
        self.inner.registry.lock().contains(fd)
    }

    /// Whether the background monitor task is active.
    pub fn is_monitoring(&self) -> bool {
        self.inner.registry.lock().monitoring()
    }

    pub fn stats(&self) -> ManagerStats {
        let registry = self.inner.registry.lock();
        let mut stats = ManagerStats {
            registered_sockets: registry.len(),
            monitoring: registry.monitoring(),
            ..ManagerStats::default()
        };
        for state in registry.states() {
            stats.pending_read_waiters += state.pending_waiters(Direction::Read);
            stats.pending_write_waiters += state.pending_waiters(Direction::Write);
        }
        stats
    }

    /// Register an open socket, taking ownership of the descriptor, and
    /// return its event stream.
    ///
    /// The descriptor is forced into non-blocking mode; failure to do so
    /// is logged and registration proceeds (some descriptor kinds refuse
    /// the flag, and the zero-timeout poll keeps the monitor non-blocking
    /// regardless). The monitor task is spawned if it is not running.
    ///
    /// # Panics
    ///
    /// If the descriptor is already registered: re-registering a live
    /// descriptor is a programmer error.
    pub fn add(&self, fd: OwnedFd) -> SocketEvents {
        let raw = fd.as_raw_fd();
        let mut registry = self.inner.registry.lock();
        if registry.contains(raw) {
            // The registered state still owns this descriptor value;
            // leaking the duplicate beats closing a descriptor we do
            // not own.
            std::mem::forget(fd);
            panic!("socket {} registered twice", raw);
        }

        if let Err(errno) = set_nonblocking(&fd) {
            warn!("socket {}: could not set non-blocking mode: {}", raw, errno);
        }

        let (sink, events) = EventSink::new();
        let inserted = registry.insert(Arc::new(SocketState::new(fd, sink)));
        debug_assert!(inserted, "registry refused unregistered socket {}", raw);
        info!("socket {} registered ({} active)", raw, registry.len());

        if !registry.monitoring() {
            registry.set_monitoring(true);
            monitor::spawn(&self.inner);
        }
        events
    }

    /// Remove a socket: resume every queued waiter with `error` (or
    /// `ConnectionAborted`), emit the terminal close, and release the
    /// descriptor. Idempotent; unknown descriptors are a no-op, since
    /// the poll loop may already have removed the socket.
    pub fn remove(&self, fd: RawFd, error: Option<SocketError>) {
        self.inner.remove(fd, error);
    }

    /// Write bytes to a registered socket once it is writable; may write
    /// fewer bytes than requested.
    pub async fn write(&self, fd: RawFd, buf: &[u8]) -> SocketResult<usize> {
        let state = self.lookup(fd)?;
        self.wait(Direction::Write, fd).await?;
        state.write(buf)
    }

    /// Datagram send; identical contract to [`SocketManager::write`].
    pub async fn send_message(&self, fd: RawFd, buf: &[u8]) -> SocketResult<usize> {
        let state = self.lookup(fd)?;
        self.wait(Direction::Write, fd).await?;
        state.send_message(buf)
    }

    /// Datagram send to an explicit peer address.
    pub async fn send_message_to<A: SockaddrLike>(
        &self,
        fd: RawFd,
        buf: &[u8],
        peer: &A,
    ) -> SocketResult<usize> {
        let state = self.lookup(fd)?;
        self.wait(Direction::Write, fd).await?;
        state.send_message_to(buf, peer)
    }

    /// Read up to `max` bytes once the socket is readable; zero bytes is
    /// peer-closed.
    pub async fn read(&self, fd: RawFd, max: usize) -> SocketResult<Vec<u8>> {
        let state = self.lookup(fd)?;
        self.wait(Direction::Read, fd).await?;
        state.read(max)
    }

    /// Datagram receive; identical contract to [`SocketManager::read`].
    pub async fn receive_message(&self, fd: RawFd, max: usize) -> SocketResult<Vec<u8>> {
        let state = self.lookup(fd)?;
        self.wait(Direction::Read, fd).await?;
        state.receive_message(max)
    }

    /// Datagram receive returning the peer address when the protocol
    /// carries one.
    pub async fn receive_message_from<A: SockaddrLike>(
        &self,
        fd: RawFd,
        max: usize,
    ) -> SocketResult<(Vec<u8>, Option<A>)> {
        let state = self.lookup(fd)?;
        self.wait(Direction::Read, fd).await?;
        state.receive_message_from(max)
    }

    /// Suspend until `fd` is ready in `direction`.
    ///
    /// Triggers an immediate poll on entry instead of waiting out the
    /// monitor interval, then parks on the socket's FIFO until the
    /// monitor resumes it. Dropping the returned future cancels the wait
    /// without disturbing other waiters or the registration.
    pub async fn wait(&self, direction: Direction, fd: RawFd) -> SocketResult<()> {
        trace!("socket {}: waiting for {}", fd, direction);
        self.poll_now()?;
        let Some(state) = self.inner.registry.lock().get(fd) else {
            return Err(SocketError::ConnectionAborted);
        };
        loop {
            // Latest returned events first, on the state held from before
            // suspension: a waiter resumed by the same poll tick that hung
            // up the socket must still observe its readiness and complete
            // the final read.
            if state.is_ready(direction) {
                return Ok(());
            }
            if !self.inner.registry.lock().contains(fd) {
                return Err(SocketError::ConnectionAborted);
            }

            let (resume, suspended) = oneshot::channel();
            if !state.queue(direction, resume) {
                // Lost the race with removal; the state is draining.
                return Err(SocketError::ConnectionAborted);
            }

            match suspended.await {
                Ok(Ok(())) => self.poll_now()?,
                Ok(Err(error)) => return Err(error),
                // The state was torn down without resuming us.
                Err(_) => return Err(SocketError::ConnectionAborted),
            }
        }
    }

    fn lookup(&self, fd: RawFd) -> SocketResult<Arc<SocketState>> {
        self.inner
            .registry
            .lock()
            .get(fd)
            .ok_or(SocketError::InvalidArgument(fd))
    }

    /// One immediate zero-timeout poll over every registered descriptor,
    /// refreshing each state's cached returned events. Dispatch stays
    /// with the monitor task.
    fn poll_now(&self) -> SocketResult<()> {
        let registry = self.inner.registry.lock();
        match poll_step(&registry) {
            Ok(_) => Ok(()),
            Err(errno) => {
                error!("readiness poll failed: {}", errno);
                Err(SocketError::Os(errno))
            }
        }
    }
}

impl Default for SocketManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerInner {
    pub(crate) fn remove(&self, fd: RawFd, error: Option<SocketError>) {
        let Some(state) = self.registry.lock().remove(fd) else {
            return;
        };
        match &error {
            Some(error) => info!("socket {} removed: {}", fd, error),
            None => info!("socket {} removed", fd),
        }

        // Draining: every queued waiter resumes with the error, then the
        // stream is finalized. The descriptor closes when the last
        // in-flight operation releases the state.
        state.dequeue_all(error.clone().unwrap_or(SocketError::ConnectionAborted));
        state.finalize(error);
    }

    /// Dispatch one tick's readiness, in ascending descriptor order. At
    /// most one waiter per direction is resumed per socket per tick.
    pub(crate) fn dispatch(&self, ready: Vec<ReadySocket>) {
        for ReadySocket { fd, revents, state } in ready {
            if revents.contains(PollFlags::POLLOUT) {
                state.wake_one(Direction::Write);
            }
            if revents.contains(PollFlags::POLLIN) {
                state.wake_one(Direction::Read);
                state.notify_pending_read();
            }
            if revents.contains(PollFlags::POLLNVAL) {
                // Polling a closed or invalid descriptor is a programmer
                // error somewhere; fail the socket rather than the
                // process.
                error!("socket {}: poll reported an invalid descriptor", fd);
                self.remove(fd, Some(SocketError::BadFileDescriptor));
            } else if revents.contains(PollFlags::POLLHUP) {
                self.remove(fd, Some(SocketError::ConnectionReset));
            } else if revents.contains(PollFlags::POLLERR) {
                self.remove(fd, Some(SocketError::ConnectionAborted));
            }
        }
    }

    /// Drain every registered socket's waiters after a poll failure and
    /// stop monitoring. Sockets stay registered; a later registration
    /// restarts the monitor.
    pub(crate) fn handle_poll_failure(&self, errno: Errno) {
        let states: Vec<Arc<SocketState>> = {
            let mut registry = self.registry.lock();
            registry.set_monitoring(false);
            registry.states().cloned().collect()
        };
        for state in states {
            state.dequeue_all(SocketError::Os(errno));
        }
    }
}

/// Force `O_NONBLOCK` onto the descriptor's status flags.
fn set_nonblocking(fd: &OwnedFd) -> Result<(), Errno> {
    let raw = fd.as_raw_fd();
    let flags = OFlag::from_bits_retain(fcntl(raw, FcntlArg::F_GETFL)?);
    fcntl(raw, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}
