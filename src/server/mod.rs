//! Server module exposing the hook registry over HTTP
//!
//! This module provides a `ServerBuilder` that registers:
//! - The hook delivery route for every extension's events
//! - Health check routes
//! - Any custom routes added by the caller

pub mod builder;
pub mod host;
pub mod router;

pub use builder::ServerBuilder;
pub use host::AutomationHost;
pub use router::{HookResponse, build_router};
