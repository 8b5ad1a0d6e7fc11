/*!
 * Socket State
 * One registered non-blocking descriptor
 *
 * Serializes all operations on one descriptor: executes the actual
 * syscalls one at a time, caches the latest returned poll events,
 * mediates per-direction wakeups, and publishes lifecycle events. The
 * syscall methods assume the manager already established readiness in
 * the relevant direction; a short read or write is successful partial
 * progress, and syscall errors pass through to the caller unchanged.
 */

use super::waiters::{Waiter, WaiterQueues};
use crate::core::errors::{SocketError, SocketResult};
use crate::core::types::Direction;
use crate::events::{EventSink, SocketEvent};
use nix::poll::PollFlags;
use nix::sys::socket::{self, MsgFlags, SockaddrLike};
use parking_lot::Mutex;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

// Suppress SIGPIPE on sends where the platform supports it; the write
// error reaches the caller either way.
#[cfg(target_os = "linux")]
const SEND_FLAGS: MsgFlags = MsgFlags::MSG_NOSIGNAL;
#[cfg(not(target_os = "linux"))]
const SEND_FLAGS: MsgFlags = MsgFlags::empty();

/// State for one registered socket
pub struct SocketState {
    fd: OwnedFd,
    raw: RawFd,
    sink: EventSink,
    /// Serializes the syscall bodies: one operation at a time touches
    /// the descriptor, and its completion event is emitted under the
    /// same guard so event order matches operation order.
    io: Mutex<()>,
    waiters: Mutex<WaiterQueues>,
    /// Returned events from the most recent poll over this descriptor
    revents: Mutex<PollFlags>,
}

impl SocketState {
    pub(crate) fn new(fd: OwnedFd, sink: EventSink) -> Self {
        let raw = fd.as_raw_fd();
        Self {
            fd,
            raw,
            sink,
            io: Mutex::new(()),
            waiters: Mutex::new(WaiterQueues::default()),
            revents: Mutex::new(PollFlags::empty()),
        }
    }

    /// Raw descriptor value this state is keyed by.
    pub fn raw_fd(&self) -> RawFd {
        self.raw
    }

    pub(crate) fn borrowed(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    // --- readiness cache ---

    pub(crate) fn set_returned_events(&self, revents: PollFlags) {
        *self.revents.lock() = revents;
    }

    pub(crate) fn is_ready(&self, direction: Direction) -> bool {
        self.revents.lock().contains(direction.readiness())
    }

    // --- waiter queues ---

    /// Append a waiter to the direction's FIFO. Refused (false) once the
    /// state is draining.
    pub(crate) fn queue(&self, direction: Direction, waiter: Waiter) -> bool {
        self.waiters.lock().queue(direction, waiter)
    }

    /// Pop the oldest waiter in the direction.
    pub(crate) fn dequeue(&self, direction: Direction) -> Option<Waiter> {
        self.waiters.lock().dequeue(direction)
    }

    /// Drain every waiter in both directions, resuming each with `error`.
    pub(crate) fn dequeue_all(&self, error: SocketError) {
        self.waiters.lock().dequeue_all(error);
    }

    /// Resume the oldest live waiter in the direction. Waiters whose
    /// callers were cancelled fail their send and are skipped without
    /// consuming the readiness notification.
    pub(crate) fn wake_one(&self, direction: Direction) {
        let mut queues = self.waiters.lock();
        while let Some(waiter) = queues.dequeue(direction) {
            if waiter.send(Ok(())).is_ok() {
                break;
            }
        }
    }

    pub(crate) fn pending_waiters(&self, direction: Direction) -> usize {
        self.waiters.lock().len(direction)
    }

    // --- events ---

    pub(crate) fn notify_pending_read(&self) {
        self.sink.emit(SocketEvent::PendingRead);
    }

    /// Emit the terminal close and finalize the event stream.
    pub(crate) fn finalize(&self, error: Option<SocketError>) {
        self.sink.close(error);
    }

    // --- syscalls ---

    /// Write the buffer in one syscall; may write fewer bytes than
    /// requested.
    pub fn write(&self, buf: &[u8]) -> SocketResult<usize> {
        let _io = self.io.lock();
        let count = socket::send(self.raw, buf, SEND_FLAGS)?;
        self.sink.emit(SocketEvent::Write(count));
        Ok(count)
    }

    /// Datagram send; identical contract to [`SocketState::write`].
    pub fn send_message(&self, buf: &[u8]) -> SocketResult<usize> {
        self.write(buf)
    }

    /// Datagram send to an explicit peer.
    pub fn send_message_to<A: SockaddrLike>(&self, buf: &[u8], peer: &A) -> SocketResult<usize> {
        let _io = self.io.lock();
        let count = socket::sendto(self.raw, buf, peer, SEND_FLAGS)?;
        self.sink.emit(SocketEvent::Write(count));
        Ok(count)
    }

    /// Read up to `max` bytes in one syscall, truncating the buffer to
    /// what was actually read. A zero count is peer-closed and is
    /// returned normally.
    pub fn read(&self, max: usize) -> SocketResult<Vec<u8>> {
        let _io = self.io.lock();
        let mut buf = vec![0u8; max];
        let count = socket::recv(self.raw, &mut buf, MsgFlags::empty())?;
        buf.truncate(count);
        self.sink.emit(SocketEvent::Read(count));
        Ok(buf)
    }

    /// Datagram receive; identical contract to [`SocketState::read`].
    pub fn receive_message(&self, max: usize) -> SocketResult<Vec<u8>> {
        self.read(max)
    }

    /// Datagram receive returning the peer address when the protocol
    /// carries one.
    pub fn receive_message_from<A: SockaddrLike>(
        &self,
        max: usize,
    ) -> SocketResult<(Vec<u8>, Option<A>)> {
        let _io = self.io.lock();
        let mut buf = vec![0u8; max];
        let (count, peer) = socket::recvfrom::<A>(self.raw, &mut buf)?;
        buf.truncate(count);
        self.sink.emit(SocketEvent::Read(count));
        Ok((buf, peer))
    }
}
