//! DTO definitions for catalog administration.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{QuestionEntity, ThemeEntity};

/// Catalog theme as listed to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ThemeSummary {
    /// Theme id.
    pub id: Uuid,
    /// Theme title.
    pub title: String,
}

impl From<ThemeEntity> for ThemeSummary {
    fn from(theme: ThemeEntity) -> Self {
        Self {
            id: theme.id,
            title: theme.title,
        }
    }
}

/// New catalog theme.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateThemeRequest {
    /// Title shown as a grid column.
    #[validate(length(min = 1, max = 128))]
    pub title: String,
}

/// New catalog question. `score` must be a point value of the configured grid.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateQuestionRequest {
    /// Theme the question belongs to.
    pub theme_id: Uuid,
    /// Point value of the question.
    pub score: u8,
    /// Prompt shown to the players.
    #[validate(length(min = 1, max = 1024))]
    pub text: String,
    /// Reference answer.
    #[validate(length(min = 1, max = 256))]
    pub answer: String,
}

/// Stored question without its reference answer.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionSummary {
    /// Question id.
    pub id: Uuid,
    /// Owning theme.
    pub theme_id: Uuid,
    /// Point value.
    pub score: u8,
    /// Prompt.
    pub text: String,
}

impl From<QuestionEntity> for QuestionSummary {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            theme_id: question.theme_id,
            score: question.score,
            text: question.text,
        }
    }
}
