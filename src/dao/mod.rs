/// Entities persisted by the quiz core.
pub mod models;
/// Quiz storage trait and its backends.
pub mod quiz_store;
/// Storage abstraction layer for database operations.
pub mod storage;
