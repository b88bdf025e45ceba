//! Judging submissions against the open question and closing it on a correct answer.

use std::time::SystemTime;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        models::{AnswerEntity, AnswerStatus, RoundQuestionStatus, UserId},
        quiz_store::QuizStore,
    },
    error::ServiceError,
};

/// Lower-case `text` and collapse whitespace runs into single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exact match after [`normalize`] on both sides.
pub fn is_correct(submitted: &str, expected: &str) -> bool {
    normalize(submitted) == normalize(expected)
}

/// Record `user_id`'s attempt at round question `rq_id`.
///
/// The attempt is only stored while the round question is still active, and a correct answer
/// closes it in the same store call. Submitting to an answered question, or losing the race to
/// another correct answer, is a [`ServiceError::Conflict`] and stores nothing.
pub async fn submit_answer(
    store: &dyn QuizStore,
    rq_id: Uuid,
    user_id: UserId,
    text: &str,
) -> Result<AnswerEntity, ServiceError> {
    let round_question = store
        .find_round_question(rq_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round question `{rq_id}`")))?;
    if round_question.status != RoundQuestionStatus::Active {
        return Err(already_answered(rq_id));
    }

    let question = store
        .find_question(round_question.question_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("question `{}`", round_question.question_id))
        })?;

    let status = if is_correct(text, &question.correct_answer) {
        AnswerStatus::Correct
    } else {
        AnswerStatus::Incorrect
    };
    let answer = AnswerEntity {
        id: Uuid::new_v4(),
        rq_id,
        user_id,
        status,
        created_at: SystemTime::now(),
    };
    if !store.record_answer(answer.clone()).await? {
        return Err(already_answered(rq_id));
    }

    match status {
        AnswerStatus::Correct => info!(%rq_id, user_id, "question answered"),
        AnswerStatus::Incorrect => debug!(%rq_id, user_id, "incorrect answer"),
    }
    Ok(answer)
}

fn already_answered(rq_id: Uuid) -> ServiceError {
    ServiceError::Conflict(format!("round question `{rq_id}` is already answered"))
}

/// Attempts recorded for `rq_id`, oldest first.
pub async fn list_answers(
    store: &dyn QuizStore,
    rq_id: Uuid,
) -> Result<Vec<AnswerEntity>, ServiceError> {
    Ok(store.answers_for(rq_id).await?)
}
