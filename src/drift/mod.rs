//! Drift detection and restart triggering
//!
//! [`RestartTrigger`] consumes the watch session of one resource, compares one
//! data field against the value captured at startup and terminates the
//! process through [`Shutdown`] as soon as the two differ.

mod selector;
mod shutdown;
mod trigger;

pub use selector::*;
pub use shutdown::*;
pub use trigger::*;
