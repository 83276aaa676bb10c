pub mod about;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod follow;
pub mod middleware;
pub mod posts;
pub mod router;
