// src/types/mod.rs

pub mod common;
pub mod date;

pub use common::{AdminCredentials, ApiEnvelope};
pub use date::{derive_event_windows, format_date, parse_date, DateRange, EventWindows};
