pub mod cache;
pub mod channel_search;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod jobs;
pub mod models;
pub mod queue;
pub mod quota;
pub mod rate_limit;
pub mod refresher;
pub mod replacement;
pub mod repository;
pub mod scheduler;
pub mod search;
pub mod spotify;
pub mod state;
pub mod vevo_detection;
pub mod youtube;

pub use state::{AppState, router};
