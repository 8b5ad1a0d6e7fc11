/*!
 * Sockmux
 * Process-wide asynchronous socket readiness multiplexer
 *
 * A single coordinator owns a set of non-blocking socket descriptors,
 * polls them for readiness on a configurable cadence, and resumes
 * suspended read/write operations when their descriptor becomes ready.
 * Each registered socket publishes a lifecycle event stream announcing
 * readiness, completions, and the terminal close.
 */

pub mod core;
pub mod events;
pub mod manager;
pub mod socket;

pub use crate::core::errors::{SocketError, SocketResult};
pub use crate::core::types::Direction;
pub use events::{SocketEvent, SocketEvents};
pub use manager::{ManagerStats, MonitorConfig, MonitorPriority, SocketManager};
pub use socket::SocketState;
