//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry sweep: Removes expired and corrupt entries at configured intervals
//! - Blocking access: Runs store-touching cache work off the async workers

mod blocking;
mod cleanup;

pub use blocking::with_cache;
pub use cleanup::{spawn_cleanup_task, Sweep};
