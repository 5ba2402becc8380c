pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod platform;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
