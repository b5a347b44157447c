//! Core engine types and utilities

pub mod types;
pub mod error;
pub mod logging;
pub mod signal;

pub use types::*;
pub use error::Error;
pub use signal::{Signal, SlotId};
