//! HTTP handlers for the user endpoints.

pub mod users;
pub use users::*;
