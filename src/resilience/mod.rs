//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (optional connect / response-head deadline)
//!     → On failure: gateway error for this request only
//! ```
//!
//! # Design Decisions
//! - No retries: a failed forward is terminal for that request
//! - Failures never touch the rotation cursor

pub mod timeouts;

pub use timeouts::{with_deadline, Deadlines};
