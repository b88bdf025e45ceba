//! Single source of truth for what a chat may do next.

use tracing::{debug, warn};

use crate::{
    dao::{
        models::{ChatId, RoundEntity, SessionEntity},
        quiz_store::QuizStore,
    },
    error::ServiceError,
    state::game::GameState,
};

/// Walk the session → round → round question chain for `chat_id`.
///
/// Lookup misses are folded into the returned state; only storage failures are errors.
pub async fn get_state(store: &dyn QuizStore, chat_id: ChatId) -> Result<GameState, ServiceError> {
    let Some(session) = store.find_active_session(chat_id).await? else {
        debug!(chat_id, "no active session");
        return Ok(GameState::NotActive);
    };

    let Some(round) = store.find_active_round(session.id).await? else {
        warn!(
            chat_id,
            session_id = %session.id,
            "active session without an active round"
        );
        return Ok(GameState::Error);
    };

    let state = match store.find_active_round_question(round.id).await? {
        Some(_) => GameState::WaitAnswer,
        None => GameState::WaitQuestion,
    };
    debug!(chat_id, round_id = %round.id, ?state, "resolved game state");
    Ok(state)
}

/// Active session of `chat_id`, or [`ServiceError::NotFound`].
pub async fn require_session(
    store: &dyn QuizStore,
    chat_id: ChatId,
) -> Result<SessionEntity, ServiceError> {
    store
        .find_active_session(chat_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no active session for chat `{chat_id}`")))
}

/// Active round of `chat_id`, or [`ServiceError::NotFound`] when the chain is broken.
pub async fn require_round(
    store: &dyn QuizStore,
    chat_id: ChatId,
) -> Result<RoundEntity, ServiceError> {
    let session = require_session(store, chat_id).await?;
    store.find_active_round(session.id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("no active round for chat `{chat_id}`"))
    })
}
