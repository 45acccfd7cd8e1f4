//! Conversions from raw change-log entries to typed mutation events.

pub mod event;
