pub mod auth;

pub use auth::{extract_token, CurrentUser};
