pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod rate_limit;
pub mod repo;
pub mod routes;
pub mod search;
pub mod security;
pub mod service;
pub mod tree;
pub mod vote;

// Re-export commonly used items for tests / external users
pub use config::Settings;
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
pub use service::{ForumService, VoteTarget};
