//! Session creation and the game start flow.

use tracing::{info, warn};

use crate::{
    config::GameRules,
    dao::{
        models::{ChatId, RoundStatus, SessionEntity, SessionStatus},
        quiz_store::QuizStore,
    },
    error::ServiceError,
    services::round_manager::{self, StartedRound},
};

/// Open a new active session for `chat_id`.
pub async fn create_session(
    store: &dyn QuizStore,
    chat_id: ChatId,
) -> Result<SessionEntity, ServiceError> {
    if let Some(existing) = store.find_active_session(chat_id).await? {
        return Err(ServiceError::Conflict(format!(
            "chat `{chat_id}` already plays session `{}`",
            existing.id
        )));
    }

    let session = SessionEntity::new_active(chat_id);
    store.insert_session(session.clone()).await?;
    info!(chat_id, session_id = %session.id, "session created");
    Ok(session)
}

/// Create the session of `chat_id` and open its first round.
///
/// When the first round cannot be opened the session is finished again so the chat does not
/// stay in the inconsistent "session without round" state.
pub async fn start_game(
    store: &dyn QuizStore,
    rules: &GameRules,
    chat_id: ChatId,
) -> Result<(SessionEntity, StartedRound), ServiceError> {
    let session = create_session(store, chat_id).await?;

    match round_manager::start_round(store, rules, &session).await {
        Ok(started) => Ok((session, started)),
        Err(err) => {
            if let Err(rollback) = store
                .update_session_status(session.id, SessionStatus::Active, SessionStatus::Finished)
                .await
            {
                warn!(
                    chat_id,
                    session_id = %session.id,
                    error = %rollback,
                    "failed to finish session after round start failure"
                );
            }
            Err(err)
        }
    }
}

/// Bring `chat_id` back to a consistent state after a game or round start stopped midway.
///
/// An active session without an active round gets its latest round reopened, or is finished
/// when it never had one. Consistent chats are left alone.
pub async fn recover_chat(store: &dyn QuizStore, chat_id: ChatId) -> Result<(), ServiceError> {
    let Some(session) = store.find_active_session(chat_id).await? else {
        return Ok(());
    };
    if store.find_active_round(session.id).await?.is_some() {
        return Ok(());
    }

    if let Some(latest) = store.find_latest_round(session.id).await? {
        if store
            .update_round_status(latest.id, RoundStatus::Finished, RoundStatus::Active)
            .await?
        {
            warn!(chat_id, round_id = %latest.id, "reopened round after interrupted start");
            return Ok(());
        }
    }

    store
        .update_session_status(session.id, SessionStatus::Active, SessionStatus::Finished)
        .await?;
    warn!(chat_id, session_id = %session.id, "finished session left without a round");
    Ok(())
}
