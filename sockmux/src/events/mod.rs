/*!
 * Socket Events
 * Per-socket single-subscriber lifecycle stream
 *
 * The stream buffers only the newest event: producers never block, and
 * an unconsumed event is overwritten by its successor. It is diagnostic,
 * not a transport; consumers that care about every completion must
 * consume promptly.
 */

use crate::core::errors::SocketError;
use parking_lot::Mutex;
use tokio::sync::watch;

/// Lifecycle notification for one registered socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Data is waiting to be read
    PendingRead,
    /// A read completed with this many bytes; zero is peer-closed
    Read(usize),
    /// A write completed with this many bytes
    Write(usize),
    /// Terminal event: the socket was removed
    Closed(Option<SocketError>),
}

/// Producer half, owned by the socket state.
pub(crate) struct EventSink {
    tx: Mutex<Option<watch::Sender<Option<SocketEvent>>>>,
}

impl EventSink {
    pub(crate) fn new() -> (Self, SocketEvents) {
        let (tx, rx) = watch::channel(None);
        let sink = Self {
            tx: Mutex::new(Some(tx)),
        };
        (sink, SocketEvents { rx })
    }

    /// Publish an event, overwriting any unconsumed predecessor.
    /// No-op once the stream has been finalized.
    pub(crate) fn emit(&self, event: SocketEvent) {
        if let Some(tx) = self.tx.lock().as_ref() {
            tx.send_replace(Some(event));
        }
    }

    /// Emit the terminal close and finalize the stream.
    pub(crate) fn close(&self, error: Option<SocketError>) {
        if let Some(tx) = self.tx.lock().take() {
            tx.send_replace(Some(SocketEvent::Closed(error)));
        }
    }
}

/// Consumer half, returned by registration.
pub struct SocketEvents {
    rx: watch::Receiver<Option<SocketEvent>>,
}

impl SocketEvents {
    /// Next unconsumed event, or `None` once the terminal
    /// [`SocketEvent::Closed`] has been consumed.
    pub async fn next(&mut self) -> Option<SocketEvent> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            if let Some(event) = self.rx.borrow_and_update().clone() {
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_newest_event_wins() {
        let (sink, mut events) = EventSink::new();
        sink.emit(SocketEvent::Write(1));
        sink.emit(SocketEvent::Write(2));
        assert_eq!(events.next().await, Some(SocketEvent::Write(2)));
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        let (sink, mut events) = EventSink::new();
        sink.close(Some(SocketError::ConnectionReset));
        sink.emit(SocketEvent::Read(3));
        assert_eq!(
            events.next().await,
            Some(SocketEvent::Closed(Some(SocketError::ConnectionReset)))
        );
        assert_eq!(events.next().await, None);
    }

    #[tokio::test]
    async fn test_events_before_close_are_observable() {
        let (sink, mut events) = EventSink::new();
        sink.emit(SocketEvent::PendingRead);
        assert_eq!(events.next().await, Some(SocketEvent::PendingRead));
        sink.close(None);
        assert_eq!(events.next().await, Some(SocketEvent::Closed(None)));
        assert_eq!(events.next().await, None);
    }
}
