//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Backend URL strings (config)
//!     → backend.rs (parse & validate each URL)
//!     → registry.rs (ordered, immutable BackendRegistry)
//!
//! Per request:
//!     → round_robin.rs (advance shared cursor, get index)
//!     → registry.at(index) → forwarding target
//! ```
//!
//! # Design Decisions
//! - Registry is fixed for the process lifetime; no hot reload
//! - The cursor is the only shared mutable state
//! - Selection never blocks on backend I/O

pub mod backend;
pub mod registry;
pub mod round_robin;

pub use backend::{BackendEndpoint, BackendError};
pub use registry::{BackendRegistry, RegistryError};
pub use round_robin::RotationCursor;
