//! Stored entities and their status vocabularies.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Identifier of the chat hosting a game.
pub type ChatId = i64;
/// Identifier of a chat user submitting answers.
pub type UserId = i64;

/// Lifecycle of a game session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The chat is playing this session.
    Active,
    /// The session is over.
    Finished,
}

impl SessionStatus {
    /// Stored representation of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Finished => "finished",
        }
    }
}

/// Lifecycle of a round inside a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// The round's grid is in play.
    Active,
    /// A later round replaced this one.
    Finished,
}

impl RoundStatus {
    /// Stored representation of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            RoundStatus::Active => "active",
            RoundStatus::Finished => "finished",
        }
    }
}

/// Lifecycle of a question bound to a round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundQuestionStatus {
    /// The question is open and accepts answers.
    Active,
    /// Somebody answered correctly; the cell is resolved.
    Answered,
}

impl RoundQuestionStatus {
    /// Stored representation of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            RoundQuestionStatus::Active => "active",
            RoundQuestionStatus::Answered => "answered",
        }
    }
}

/// Outcome recorded for a single answer attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// Matched the reference answer.
    Correct,
    /// Did not match.
    Incorrect,
}

impl AnswerStatus {
    /// Stored representation of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            AnswerStatus::Correct => "correct",
            AnswerStatus::Incorrect => "incorrect",
        }
    }
}

/// One ongoing (or past) game for a chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Chat hosting the game.
    pub chat_id: ChatId,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

impl SessionEntity {
    /// Build a fresh active session for `chat_id`.
    pub fn new_active(chat_id: ChatId) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            status: SessionStatus::Active,
            created_at: SystemTime::now(),
        }
    }
}

/// Numbered phase of a session with its own theme grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Primary key of the round.
    pub id: Uuid,
    /// Owning session.
    pub session_id: Uuid,
    /// 1-based, strictly increasing within a session.
    pub number: u32,
    /// Lifecycle status.
    pub status: RoundStatus,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

impl RoundEntity {
    /// Build a fresh active round.
    pub fn new_active(session_id: Uuid, number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            number,
            status: RoundStatus::Active,
            created_at: SystemTime::now(),
        }
    }
}

/// Global catalog category, reused across rounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemeEntity {
    /// Primary key of the theme.
    pub id: Uuid,
    /// Label shown as a grid column.
    pub title: String,
}

/// Assignment of a theme to a round. Existence is the assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemeRoundEntity {
    /// Primary key of the link.
    pub id: Uuid,
    /// Round receiving the theme.
    pub round_id: Uuid,
    /// Assigned theme.
    pub theme_id: Uuid,
}

impl ThemeRoundEntity {
    /// Link `theme_id` to `round_id`.
    pub fn new(round_id: Uuid, theme_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            round_id,
            theme_id,
        }
    }
}

/// Immutable catalog question belonging to a theme.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Primary key of the question.
    pub id: Uuid,
    /// Theme the question belongs to (grid column).
    pub theme_id: Uuid,
    /// Point value of the question (grid row).
    pub score: u8,
    /// Prompt shown to the players.
    pub text: String,
    /// Reference answer compared against submissions.
    pub correct_answer: String,
}

/// Binding of a catalog question to a round as the playable or resolved cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundQuestionEntity {
    /// Primary key of the binding.
    pub id: Uuid,
    /// Round the question was picked in.
    pub round_id: Uuid,
    /// Catalog question being played.
    pub question_id: Uuid,
    /// Open or answered.
    pub status: RoundQuestionStatus,
}

impl RoundQuestionEntity {
    /// Open `question_id` inside `round_id`.
    pub fn new_active(round_id: Uuid, question_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            round_id,
            question_id,
            status: RoundQuestionStatus::Active,
        }
    }
}

/// Append-only record of one answer attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Primary key of the attempt.
    pub id: Uuid,
    /// Round question the attempt targets.
    pub rq_id: Uuid,
    /// Chat user who answered.
    pub user_id: UserId,
    /// Outcome of the comparison.
    pub status: AnswerStatus,
    /// Submission timestamp, used to order attempts.
    pub created_at: SystemTime,
}
