//! Tracing setup shared by the workspace binaries.

mod subscriber;

pub use subscriber::{init_tracing, init_tracing_with_level};
