//! Shared models and request/response shapes for the yatube workspace.

pub mod api;
pub mod models;
