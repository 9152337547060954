//! Observability subsystem.
//!
//! Every subsystem emits `tracing` events with structured fields. Each
//! forwarded request runs inside a span carrying its request id, method,
//! path and chosen backend.

pub mod logging;
