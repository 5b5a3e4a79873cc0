//! Applying authenticated communications to local state.
//!
//! [`DispatchEngine`] performs the state transition for each communication
//! type and announces it on an [`EventBus`].

mod engine;
mod events;

pub use engine::DispatchEngine;
pub use events::{Event, EventBus, EventReceiver};
