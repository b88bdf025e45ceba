//! DTO definitions for the per-chat game endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{AnswerEntity, AnswerStatus, ChatId, RoundEntity, SessionEntity, UserId},
    dto::{catalog::ThemeSummary, format_system_time},
    services::{question_selector::OpenedQuestion, round_manager::StartedRound},
    state::game::{GameState, ScoreTable},
};

/// Derived state of a chat, telling the dispatcher which commands are legal.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameStateResponse {
    /// Chat the state belongs to.
    pub chat_id: ChatId,
    /// Resolved state.
    pub state: GameState,
}

/// Session as returned by the game start.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Session id.
    pub id: Uuid,
    /// Chat hosting the session.
    pub chat_id: ChatId,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<SessionEntity> for SessionSummary {
    fn from(session: SessionEntity) -> Self {
        Self {
            id: session.id,
            chat_id: session.chat_id,
            created_at: format_system_time(session.created_at),
        }
    }
}

/// Round with the themes forming its grid columns.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundSummary {
    /// Round id.
    pub id: Uuid,
    /// 1-based round number within the session.
    pub number: u32,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Grid columns in assignment order.
    pub themes: Vec<ThemeSummary>,
}

impl From<StartedRound> for RoundSummary {
    fn from(started: StartedRound) -> Self {
        let StartedRound { round, themes } = started;
        Self {
            id: round.id,
            number: round.number,
            created_at: format_system_time(round.created_at),
            themes: themes.into_iter().map(ThemeSummary::from).collect(),
        }
    }
}

/// Response of the game start: the new session and its first round.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartGameResponse {
    /// The new session.
    pub session: SessionSummary,
    /// Its first round.
    pub round: RoundSummary,
}

/// Grid column of the score table.
#[derive(Debug, Serialize, ToSchema)]
pub struct ThemeColumnDto {
    /// Theme id.
    pub id: Uuid,
    /// Theme title.
    pub title: String,
    /// Point value to "already answered" flag.
    pub answers: BTreeMap<u8, bool>,
}

/// Theme × score grid of the active round.
#[derive(Debug, Serialize, ToSchema)]
pub struct TableResponse {
    /// Round the grid belongs to.
    pub round_id: Uuid,
    /// Number of that round.
    pub round_number: u32,
    /// Columns in theme assignment order.
    pub themes: Vec<ThemeColumnDto>,
}

impl TableResponse {
    /// Flatten a score table of `round` into columns.
    pub fn new(round: &RoundEntity, table: ScoreTable) -> Self {
        Self {
            round_id: round.id,
            round_number: round.number,
            themes: table
                .into_values()
                .map(|column| ThemeColumnDto {
                    id: column.id,
                    title: column.title,
                    answers: column.answers,
                })
                .collect(),
        }
    }
}

/// Cell chosen by a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PickQuestionRequest {
    /// Column of the cell.
    pub theme_id: Uuid,
    /// Point value of the cell.
    #[validate(range(min = 1))]
    pub score: u8,
}

/// Open question as shown to players. The reference answer is never exposed.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionPrompt {
    /// Binding id, used to follow answers.
    pub round_question_id: Uuid,
    /// Round the question was opened in.
    pub round_id: Uuid,
    /// Theme of the question.
    pub theme_id: Uuid,
    /// Point value.
    pub score: u8,
    /// Prompt shown to the players.
    pub text: String,
}

impl From<OpenedQuestion> for QuestionPrompt {
    fn from(opened: OpenedQuestion) -> Self {
        Self {
            round_question_id: opened.round_question.id,
            round_id: opened.round_question.round_id,
            theme_id: opened.question.theme_id,
            score: opened.question.score,
            text: opened.question.text,
        }
    }
}

/// Answer attempt submitted by a chat user.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    /// Chat user answering.
    pub user_id: UserId,
    /// Free-text answer.
    #[validate(length(min = 1, max = 512))]
    pub text: String,
}

/// Recorded attempt and its verdict.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    /// Recorded attempt id.
    pub answer_id: Uuid,
    /// Question the attempt targeted.
    pub round_question_id: Uuid,
    /// Chat user who answered.
    pub user_id: UserId,
    /// Whether the answer matched.
    pub correct: bool,
    /// RFC 3339 submission timestamp.
    pub created_at: String,
}

impl From<AnswerEntity> for AnswerResponse {
    fn from(answer: AnswerEntity) -> Self {
        Self {
            answer_id: answer.id,
            round_question_id: answer.rq_id,
            user_id: answer.user_id,
            correct: answer.status == AnswerStatus::Correct,
            created_at: format_system_time(answer.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::ThemeColumn;

    #[test]
    fn answer_payload_validation() {
        let empty = SubmitAnswerRequest {
            user_id: 1,
            text: String::new(),
        };
        assert!(empty.validate().is_err());

        let ok = SubmitAnswerRequest {
            user_id: 1,
            text: "Paris".into(),
        };
        assert!(ok.validate().is_ok());

        let zero = PickQuestionRequest {
            theme_id: Uuid::new_v4(),
            score: 0,
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn table_serializes_scores_as_object_keys() {
        let round = RoundEntity::new_active(Uuid::new_v4(), 2);
        let theme_id = Uuid::new_v4();
        let mut table = ScoreTable::new();
        table.insert(
            theme_id,
            ThemeColumn {
                id: theme_id,
                title: "Science".into(),
                answers: BTreeMap::from([(1, false), (2, true)]),
            },
        );

        let json = serde_json::to_value(TableResponse::new(&round, table)).unwrap();
        assert_eq!(json["round_number"], 2);
        assert_eq!(json["themes"][0]["title"], "Science");
        assert_eq!(json["themes"][0]["answers"]["2"], true);
        assert_eq!(json["themes"][0]["answers"]["1"], false);
    }
}
