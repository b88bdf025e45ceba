//! Process-local [`QuizStore`] used for development runs and tests.
//!
//! Every trait method runs as a single critical section over all tables, so check-then-write
//! sequences (status compare-and-set, "one active row" rules) are atomic.

use std::sync::Arc;

use futures::future::BoxFuture;
use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    models::{
        AnswerEntity, AnswerStatus, ChatId, QuestionEntity, RoundEntity, RoundQuestionEntity,
        RoundQuestionStatus, RoundStatus, SessionEntity, SessionStatus, ThemeEntity,
        ThemeRoundEntity,
    },
    quiz_store::QuizStore,
    storage::{StorageError, StorageResult},
};

/// [`QuizStore`] keeping every table in process memory.
#[derive(Clone, Default)]
pub struct InMemoryQuizStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    sessions: Vec<SessionEntity>,
    rounds: Vec<RoundEntity>,
    themes: Vec<ThemeEntity>,
    theme_rounds: Vec<ThemeRoundEntity>,
    questions: Vec<QuestionEntity>,
    round_questions: Vec<RoundQuestionEntity>,
    answers: Vec<AnswerEntity>,
}

impl InMemoryQuizStore {
    /// Empty store with no catalog.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Shuffle a copy of `items` and keep the first `limit` entries.
fn shuffled<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    let mut picked = items.to_vec();
    picked.shuffle(&mut rand::rng());
    picked.truncate(limit);
    picked
}

impl QuizStore for InMemoryQuizStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.write().await;
            if session.status == SessionStatus::Active
                && guard
                    .sessions
                    .iter()
                    .any(|s| s.chat_id == session.chat_id && s.status == SessionStatus::Active)
            {
                return Err(StorageError::conflict(format!(
                    "chat `{}` already has an active session",
                    session.chat_id
                )));
            }
            guard.sessions.push(session);
            Ok(())
        })
    }

    fn find_active_session(
        &self,
        chat_id: ChatId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard
                .sessions
                .iter()
                .find(|s| s.chat_id == chat_id && s.status == SessionStatus::Active)
                .cloned())
        })
    }

    fn update_session_status(
        &self,
        id: Uuid,
        expected: SessionStatus,
        next: SessionStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.write().await;
            let Some(session) = guard
                .sessions
                .iter_mut()
                .find(|s| s.id == id && s.status == expected)
            else {
                return Ok(false);
            };
            session.status = next;
            Ok(true)
        })
    }

    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.write().await;
            if round.status == RoundStatus::Active
                && guard
                    .rounds
                    .iter()
                    .any(|r| r.session_id == round.session_id && r.status == RoundStatus::Active)
            {
                return Err(StorageError::conflict(format!(
                    "session `{}` already has an active round",
                    round.session_id
                )));
            }
            guard.rounds.push(round);
            Ok(())
        })
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard.rounds.iter().find(|r| r.id == id).cloned())
        })
    }

    fn find_active_round(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard
                .rounds
                .iter()
                .find(|r| r.session_id == session_id && r.status == RoundStatus::Active)
                .cloned())
        })
    }

    fn find_latest_round(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard
                .rounds
                .iter()
                .filter(|r| r.session_id == session_id)
                .max_by_key(|r| r.number)
                .cloned())
        })
    }

    fn update_round_status(
        &self,
        id: Uuid,
        expected: RoundStatus,
        next: RoundStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.write().await;
            let Some(round) = guard
                .rounds
                .iter_mut()
                .find(|r| r.id == id && r.status == expected)
            else {
                return Ok(false);
            };
            round.status = next;
            Ok(true)
        })
    }

    fn insert_theme(&self, theme: ThemeEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.themes.push(theme);
            Ok(())
        })
    }

    fn list_themes(&self) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.read().await.themes.clone()) })
    }

    fn random_themes(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(shuffled(&guard.themes, limit))
        })
    }

    fn insert_theme_rounds(
        &self,
        links: Vec<ThemeRoundEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.theme_rounds.extend(links);
            Ok(())
        })
    }

    fn themes_for_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard
                .theme_rounds
                .iter()
                .filter(|link| link.round_id == round_id)
                .filter_map(|link| guard.themes.iter().find(|t| t.id == link.theme_id))
                .cloned()
                .collect())
        })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.questions.push(question);
            Ok(())
        })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard.questions.iter().find(|q| q.id == id).cloned())
        })
    }

    fn random_question(
        &self,
        theme_id: Uuid,
        score: u8,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            let matching: Vec<QuestionEntity> = guard
                .questions
                .iter()
                .filter(|q| q.theme_id == theme_id && q.score == score)
                .cloned()
                .collect();
            Ok(shuffled(&matching, 1).pop())
        })
    }

    fn answered_questions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard
                .round_questions
                .iter()
                .filter(|rq| rq.round_id == round_id && rq.status == RoundQuestionStatus::Answered)
                .filter_map(|rq| guard.questions.iter().find(|q| q.id == rq.question_id))
                .cloned()
                .collect())
        })
    }

    fn insert_round_question(
        &self,
        round_question: RoundQuestionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.write().await;
            if round_question.status == RoundQuestionStatus::Active
                && guard.round_questions.iter().any(|rq| {
                    rq.round_id == round_question.round_id
                        && rq.status == RoundQuestionStatus::Active
                })
            {
                return Err(StorageError::conflict(format!(
                    "round `{}` already has an open question",
                    round_question.round_id
                )));
            }
            guard.round_questions.push(round_question);
            Ok(())
        })
    }

    fn find_round_question(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundQuestionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard.round_questions.iter().find(|rq| rq.id == id).cloned())
        })
    }

    fn find_active_round_question(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundQuestionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard
                .round_questions
                .iter()
                .find(|rq| rq.round_id == round_id && rq.status == RoundQuestionStatus::Active)
                .cloned())
        })
    }

    fn update_round_question_status(
        &self,
        id: Uuid,
        expected: RoundQuestionStatus,
        next: RoundQuestionStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.write().await;
            let Some(rq) = guard
                .round_questions
                .iter_mut()
                .find(|rq| rq.id == id && rq.status == expected)
            else {
                return Ok(false);
            };
            rq.status = next;
            Ok(true)
        })
    }

    fn record_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.write().await;
            let Some(rq) = guard
                .round_questions
                .iter_mut()
                .find(|rq| rq.id == answer.rq_id && rq.status == RoundQuestionStatus::Active)
            else {
                return Ok(false);
            };
            if answer.status == AnswerStatus::Correct {
                rq.status = RoundQuestionStatus::Answered;
            }
            guard.answers.push(answer);
            Ok(true)
        })
    }

    fn answers_for(&self, rq_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(guard
                .answers
                .iter()
                .filter(|a| a.rq_id == rq_id)
                .cloned()
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
