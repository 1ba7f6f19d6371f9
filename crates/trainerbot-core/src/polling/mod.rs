//! Update consumption: the cursor, the long-poll loop and its heartbeat.

pub mod cursor;
pub mod heartbeat;
pub mod update_loop;

pub use cursor::UpdateCursor;
pub use heartbeat::{Heartbeat, Liveness};
pub use update_loop::UpdateLoop;
