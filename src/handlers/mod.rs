pub mod auth_handler;
pub mod health;
pub mod metrics;
pub mod redirect;
pub mod users_handler;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use redirect::redirect_unserved;
