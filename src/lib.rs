pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod notify;
pub mod openapi;
pub mod rate_limit; // in-memory rate limiting
pub mod repo;
pub mod routes;
pub mod security;
pub mod storage; // media blobs: local disk or S3

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
