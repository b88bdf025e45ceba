//! Opening a grid cell: drawing a random question for a theme/score pair.

use tracing::info;
use uuid::Uuid;

use crate::{
    config::GameRules,
    dao::{
        models::{QuestionEntity, RoundEntity, RoundQuestionEntity, RoundStatus},
        quiz_store::QuizStore,
    },
    error::ServiceError,
};

/// A catalog question bound to a round as its open cell.
#[derive(Debug, Clone)]
pub struct OpenedQuestion {
    /// Drawn catalog question.
    pub question: QuestionEntity,
    /// Its active binding to the round.
    pub round_question: RoundQuestionEntity,
}

/// Open the `theme_id`/`score` cell of `round` with a uniformly drawn catalog question.
///
/// Fails with [`ServiceError::Conflict`] while another question of the round is open.
pub async fn pick_question(
    store: &dyn QuizStore,
    rules: &GameRules,
    round: &RoundEntity,
    theme_id: Uuid,
    score: u8,
) -> Result<OpenedQuestion, ServiceError> {
    if !rules.accepts_score(score) {
        return Err(ServiceError::InvalidInput(format!(
            "score {score} is outside {}..={}",
            rules.min_score, rules.max_score
        )));
    }
    if round.status != RoundStatus::Active {
        return Err(ServiceError::Conflict(format!(
            "round `{}` is not active",
            round.id
        )));
    }

    let themes = store.themes_for_round(round.id).await?;
    if !themes.iter().any(|theme| theme.id == theme_id) {
        return Err(ServiceError::InvalidInput(format!(
            "theme `{theme_id}` is not part of round {}",
            round.number
        )));
    }

    if let Some(open) = store.find_active_round_question(round.id).await? {
        return Err(ServiceError::Conflict(format!(
            "round question `{}` is still open",
            open.id
        )));
    }

    let question = store
        .random_question(theme_id, score)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "no question for theme `{theme_id}` with score {score}"
            ))
        })?;

    let round_question = RoundQuestionEntity::new_active(round.id, question.id);
    store.insert_round_question(round_question.clone()).await?;
    info!(
        round_id = %round.id,
        rq_id = %round_question.id,
        question_id = %question.id,
        score,
        "question opened"
    );

    Ok(OpenedQuestion {
        question,
        round_question,
    })
}

/// The open question of `round`, if any.
pub async fn active_question(
    store: &dyn QuizStore,
    round: &RoundEntity,
) -> Result<Option<OpenedQuestion>, ServiceError> {
    let Some(round_question) = store.find_active_round_question(round.id).await? else {
        return Ok(None);
    };

    let question = store
        .find_question(round_question.question_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "question `{}` bound to round question `{}`",
                round_question.question_id, round_question.id
            ))
        })?;

    Ok(Some(OpenedQuestion {
        question,
        round_question,
    }))
}
