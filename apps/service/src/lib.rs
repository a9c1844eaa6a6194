//! Block production liveness monitoring.
//!
//! Every polling cycle asks three independent providers per network for the
//! latest block, cross-validates the answers into a single status, tracks
//! halt incidents and publishes rolling uptime.

pub mod config;
pub mod database;
pub mod monitoring;
pub mod orchestrator;
pub mod pool;
pub mod registry;
