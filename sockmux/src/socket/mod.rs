/*!
 * Socket State
 * Per-descriptor ownership: syscall execution and waiter queues
 */

mod state;
mod waiters;

pub use state::SocketState;
