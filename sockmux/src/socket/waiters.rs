/*!
 * Waiter Queues
 * Per-direction FIFOs of suspended operations awaiting readiness
 *
 * Each waiter is the producer end of a one-shot channel; the suspended
 * caller holds the consumer end. A waiter whose caller has been
 * cancelled simply fails its send and is skipped.
 */

use crate::core::errors::{SocketError, SocketResult};
use crate::core::types::Direction;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// Resume handle for one suspended operation
pub(crate) type Waiter = oneshot::Sender<SocketResult<()>>;

/// FIFO waiter queues for one socket, one per direction
#[derive(Default)]
pub(crate) struct WaiterQueues {
    read: VecDeque<Waiter>,
    write: VecDeque<Waiter>,
    /// Set once drained; late arrivals are refused
    draining: bool,
}

impl WaiterQueues {
    fn queue_mut(&mut self, direction: Direction) -> &mut VecDeque<Waiter> {
        match direction {
            Direction::Read => &mut self.read,
            Direction::Write => &mut self.write,
        }
    }

    /// Append a waiter. Returns false once the socket is draining.
    pub(crate) fn queue(&mut self, direction: Direction, waiter: Waiter) -> bool {
        if self.draining {
            return false;
        }
        self.queue_mut(direction).push_back(waiter);
        true
    }

    /// Pop the oldest waiter in the direction.
    pub(crate) fn dequeue(&mut self, direction: Direction) -> Option<Waiter> {
        self.queue_mut(direction).pop_front()
    }

    /// Drain every waiter in both directions, resuming each with `error`,
    /// and refuse waiters from then on.
    pub(crate) fn dequeue_all(&mut self, error: SocketError) {
        self.draining = true;
        for waiter in self.read.drain(..).chain(self.write.drain(..)) {
            let _ = waiter.send(Err(error.clone()));
        }
    }

    /// Queued waiters in the direction (diagnostics).
    pub(crate) fn len(&self, direction: Direction) -> usize {
        match direction {
            Direction::Read => self.read.len(),
            Direction::Write => self.write.len(),
        }
    }
}
