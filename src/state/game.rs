//! Game state vocabulary and the round grid.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Derived state of a chat's game, computed from stored entities on every request.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// No active session for the chat.
    NotActive,
    /// Session running without further detail. Part of the vocabulary, never resolved.
    Active,
    /// A round is open and no cell is chosen yet.
    WaitQuestion,
    /// A question is open and awaiting answers.
    WaitAnswer,
    /// Stored data is inconsistent (active session without an active round).
    Error,
}

/// One column of the round grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeColumn {
    /// Theme id.
    pub id: Uuid,
    /// Theme title.
    pub title: String,
    /// Score to "resolved" flag, for every point value of the grid.
    pub answers: BTreeMap<u8, bool>,
}

/// Theme grid of a round keyed by theme id, in theme assignment order.
pub type ScoreTable = IndexMap<Uuid, ThemeColumn>;
