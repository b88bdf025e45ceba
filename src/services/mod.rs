//! Quiz operations, each taking the store it works on.

/// Judging submissions and closing questions.
pub mod answer_evaluator;
/// Theme and question catalog management.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Chat-facing facade over the core services.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Random question drawing for a grid cell.
pub mod question_selector;
/// Round lifecycle and theme assignment.
pub mod round_manager;
/// Theme × score grid projection.
pub mod scoreboard;
/// Session creation and game start.
pub mod session_service;
/// Derived game state resolution.
pub mod state_resolver;
/// Storage connection supervisor with degraded-mode handling.
pub mod storage_supervisor;
