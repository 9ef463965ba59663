//! Endpoint usage metrics.
//!
//! - `endpoint_usage_counter{statusCode, method, pathPattern, params, instance, user}` - Counter
//! - `build_info{version, environment, hostname, container_tag}` - Gauge, always 1

pub mod instrumentation;
pub mod pattern;
pub mod types;

pub use instrumentation::Instrumentation;
pub use pattern::PatternIndex;
pub use types::{BuildInfo, MatchPolicy, RequestFacts};
