//! Library crate for chat-quiz-back, exposing modules for binaries and integration tests.

/// JSON configuration: game rules, seed catalog and timeouts.
pub mod config;
/// Entities and storage backends.
pub mod dao;
/// HTTP request and response shapes.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Axum route trees.
pub mod routes;
/// Quiz operations on top of the store.
pub mod services;
/// Shared application state.
pub mod state;
