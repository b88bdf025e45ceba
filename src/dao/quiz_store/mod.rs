//! Storage seam for sessions, rounds, the question catalog and answers.

/// Process-local backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    AnswerEntity, ChatId, QuestionEntity, RoundEntity, RoundQuestionEntity, RoundQuestionStatus,
    RoundStatus, SessionEntity, SessionStatus, ThemeEntity, ThemeRoundEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use memory::InMemoryQuizStore;

/// Abstraction over the persistence layer for quiz sessions and the question catalog.
///
/// Status updates are compare-and-set: they only apply when the stored status still equals
/// `expected` and report whether the row was transitioned. Inserting a row with an "active"
/// status fails with [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict)
/// when the owner already has an active row of that kind.
pub trait QuizStore: Send + Sync {
    /// Store a new session.
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// The active session of `chat_id`, if any.
    fn find_active_session(
        &self,
        chat_id: ChatId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Move session `id` from `expected` to `next`.
    fn update_session_status(
        &self,
        id: Uuid,
        expected: SessionStatus,
        next: SessionStatus,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Store a new round.
    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Round by id.
    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// The active round of `session_id`, if any.
    fn find_active_round(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// The round of `session_id` with the highest number, whatever its status.
    fn find_latest_round(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Move round `id` from `expected` to `next`.
    fn update_round_status(
        &self,
        id: Uuid,
        expected: RoundStatus,
        next: RoundStatus,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Add a theme to the catalog.
    fn insert_theme(&self, theme: ThemeEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Every catalog theme.
    fn list_themes(&self) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>>;
    /// Up to `limit` distinct themes drawn in random order from the whole catalog.
    fn random_themes(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>>;
    /// Link themes to a round; the slice order is the assignment order.
    fn insert_theme_rounds(
        &self,
        links: Vec<ThemeRoundEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Themes linked to `round_id`, in assignment order.
    fn themes_for_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>>;

    /// Add a question to the catalog.
    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Question by id.
    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
    /// One question matching `theme_id`/`score`, drawn uniformly at random.
    fn random_question(
        &self,
        theme_id: Uuid,
        score: u8,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
    /// Questions bound to `round_id` through an answered round question.
    fn answered_questions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;

    /// Bind a question to a round.
    fn insert_round_question(
        &self,
        round_question: RoundQuestionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Round question by id.
    fn find_round_question(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundQuestionEntity>>>;
    /// The open question of `round_id`, if any.
    fn find_active_round_question(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundQuestionEntity>>>;
    /// Move round question `id` from `expected` to `next`.
    fn update_round_question_status(
        &self,
        id: Uuid,
        expected: RoundQuestionStatus,
        next: RoundQuestionStatus,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Store `answer` if its round question is still active.
    ///
    /// A correct answer also moves the round question to answered. Returns `false` and stores
    /// nothing when the round question is missing or already answered.
    fn record_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// Attempts recorded for a round question, oldest first.
    fn answers_for(&self, rq_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>>;

    /// Cheap liveness probe of the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection in place.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
