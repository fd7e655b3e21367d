//! Foundational low-level utilities shared across qaboard crates.
//!
//! Provides atomic file-write helpers for persisted session state and the
//! time utilities used to order board entries by creation instant.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms, parse_timestamp_unix_ms};
