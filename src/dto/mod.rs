//! Wire shapes exchanged over the REST API.

use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Catalog management payloads.
pub mod catalog;
/// Chat game payloads.
pub mod game;
/// Health check payloads.
pub mod health;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
