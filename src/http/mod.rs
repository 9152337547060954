//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route)
//!     → dispatcher.rs (advance cursor, pick backend)
//!     → request.rs (rewrite target, strip hop-by-hop headers)
//!     → hyper client (pooled connection to backend)
//!     → response.rs (strip headers, stream body back)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::{Dispatcher, RequestPhase, Selection};
pub use response::ForwardError;
pub use server::HttpServer;
