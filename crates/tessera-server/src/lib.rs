//! Server-side driver tying world mutation, entity labels, and overlay
//! widgets to the outbound send path.
//!
//! [`SyncServer`] is the single owner of all synchronization state and is
//! meant to live on the tick thread. [`TickSchedule`] turns wall-clock time
//! into a fixed number of ticks.

pub mod sync_server;
pub mod tick;

pub use sync_server::{SyncServer, TickReport};
pub use tick::TickSchedule;
