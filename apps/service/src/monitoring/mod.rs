/// Monitoring engine module - turns provider observations into chain status
///
/// This module is responsible for:
/// - Fetching the chain head from three independent providers per network
/// - Cross-validating the observations into a single status
/// - Tracking halt incidents and computing rolling uptime
pub mod adapter;
pub mod clock;
pub mod cross_validator;
pub mod fetcher;
pub mod halt_tracker;
pub mod providers;
pub mod types;
pub mod uptime;
pub mod validation;

pub use adapter::{NetworkAdapter, Provider, SourceAdapter};
pub use clock::{Clock, SystemClock};
pub use cross_validator::{Detection, cross_validate};
pub use halt_tracker::{HaltTracker, HaltTransition};
pub use types::{BlockObservation, ChainStatus, NetworkConfig, Source, SourceResult};
pub use uptime::UptimeWindows;
