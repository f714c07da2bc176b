//! Ports: the seams to everything outside the process.
//!
//! - `QueueStore`: shared list store (Redis in production)
//! - `Clock`: wall-clock time for error-log timestamps

pub mod clock;
pub mod store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::store::QueueStore;
