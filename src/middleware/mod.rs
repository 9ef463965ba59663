pub mod login;
pub mod metrics;

pub use login::{login_required, require_metrics_key};
pub use metrics::metered;
