//! Chat-facing game operations on top of the shared state.
//!
//! Reads resolve the store and call the core services directly. Mutations additionally run
//! under the chat's gate via [`AppState::run_exclusive`](crate::state::AppState::run_exclusive).
//! Game and round starts write several rows, so a timed out start is followed by
//! [`session_service::recover_chat`] under the same gate.

use tracing::warn;

use crate::{
    dao::{models::ChatId, quiz_store::QuizStore},
    dto::game::{
        AnswerResponse, GameStateResponse, PickQuestionRequest, QuestionPrompt, RoundSummary,
        StartGameResponse, SubmitAnswerRequest, TableResponse,
    },
    error::ServiceError,
    services::{
        answer_evaluator, question_selector, round_manager, scoreboard, session_service,
        state_resolver,
    },
    state::SharedState,
};

/// Undo the partial writes of a start that ran out of time.
async fn recover_after_timeout(store: &dyn QuizStore, chat_id: ChatId) {
    if let Err(err) = session_service::recover_chat(store, chat_id).await {
        warn!(chat_id, error = %err, "failed to recover chat after timed out start");
    }
}

/// Current game state of `chat_id`.
pub async fn get_state(
    state: &SharedState,
    chat_id: ChatId,
) -> Result<GameStateResponse, ServiceError> {
    let store = state.require_quiz_store().await?;
    let game_state = state_resolver::get_state(store.as_ref(), chat_id).await?;
    Ok(GameStateResponse {
        chat_id,
        state: game_state,
    })
}

/// Create a session for `chat_id` and open its first round.
pub async fn start_game(
    state: &SharedState,
    chat_id: ChatId,
) -> Result<StartGameResponse, ServiceError> {
    let store = state.require_quiz_store().await?;
    let rules = state.rules();

    let recovery = store.clone();
    let (session, started) = state
        .run_exclusive_or_abort(
            chat_id,
            || async move { session_service::start_game(store.as_ref(), &rules, chat_id).await },
            || async move { recover_after_timeout(recovery.as_ref(), chat_id).await },
        )
        .await?;

    Ok(StartGameResponse {
        session: session.into(),
        round: started.into(),
    })
}

/// Finish the active round of `chat_id` and open the next one.
pub async fn start_round(state: &SharedState, chat_id: ChatId) -> Result<RoundSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    let rules = state.rules();

    let recovery = store.clone();
    let started = state
        .run_exclusive_or_abort(
            chat_id,
            || async move {
                let session = state_resolver::require_session(store.as_ref(), chat_id).await?;
                round_manager::start_round(store.as_ref(), &rules, &session).await
            },
            || async move { recover_after_timeout(recovery.as_ref(), chat_id).await },
        )
        .await?;

    Ok(started.into())
}

/// Score table of the active round of `chat_id`.
pub async fn table(state: &SharedState, chat_id: ChatId) -> Result<TableResponse, ServiceError> {
    let store = state.require_quiz_store().await?;
    let round = state_resolver::require_round(store.as_ref(), chat_id).await?;
    let table = scoreboard::build_table(store.as_ref(), &state.rules(), round.id).await?;
    Ok(TableResponse::new(&round, table))
}

/// Open the requested cell in the active round of `chat_id`.
pub async fn pick_question(
    state: &SharedState,
    chat_id: ChatId,
    request: PickQuestionRequest,
) -> Result<QuestionPrompt, ServiceError> {
    let store = state.require_quiz_store().await?;
    let rules = state.rules();

    let opened = state
        .run_exclusive(chat_id, || async move {
            let round = state_resolver::require_round(store.as_ref(), chat_id).await?;
            question_selector::pick_question(
                store.as_ref(),
                &rules,
                &round,
                request.theme_id,
                request.score,
            )
            .await
        })
        .await?;

    Ok(opened.into())
}

/// Question currently open in the active round of `chat_id`.
pub async fn active_question(
    state: &SharedState,
    chat_id: ChatId,
) -> Result<QuestionPrompt, ServiceError> {
    let store = state.require_quiz_store().await?;
    let round = state_resolver::require_round(store.as_ref(), chat_id).await?;
    question_selector::active_question(store.as_ref(), &round)
        .await?
        .map(QuestionPrompt::from)
        .ok_or_else(|| ServiceError::NotFound(format!("no open question for chat `{chat_id}`")))
}

/// Judge an answer against the open question of `chat_id`.
pub async fn submit_answer(
    state: &SharedState,
    chat_id: ChatId,
    request: SubmitAnswerRequest,
) -> Result<AnswerResponse, ServiceError> {
    let store = state.require_quiz_store().await?;

    let answer = state
        .run_exclusive(chat_id, || async move {
            let round = state_resolver::require_round(store.as_ref(), chat_id).await?;
            let open = store
                .find_active_round_question(round.id)
                .await?
                .ok_or_else(|| {
                    ServiceError::Conflict(format!("no open question for chat `{chat_id}`"))
                })?;
            answer_evaluator::submit_answer(store.as_ref(), open.id, request.user_id, &request.text)
                .await
        })
        .await?;

    Ok(answer.into())
}

/// Attempts recorded for the open question of `chat_id`.
pub async fn list_answers(
    state: &SharedState,
    chat_id: ChatId,
) -> Result<Vec<AnswerResponse>, ServiceError> {
    let store = state.require_quiz_store().await?;
    let round = state_resolver::require_round(store.as_ref(), chat_id).await?;
    let open = store
        .find_active_round_question(round.id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no open question for chat `{chat_id}`")))?;

    let answers = answer_evaluator::list_answers(store.as_ref(), open.id).await?;
    Ok(answers.into_iter().map(AnswerResponse::from).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::quiz_store::InMemoryQuizStore,
        services::catalog_service,
        state::{AppState, game::GameState},
    };

    async fn seeded_state() -> SharedState {
        let config = AppConfig::default();
        let store = Arc::new(InMemoryQuizStore::new());
        catalog_service::seed_catalog(store.as_ref(), &config.rules(), config.catalog())
            .await
            .unwrap();
        AppState::with_store(config, store).await
    }

    #[tokio::test]
    async fn degraded_state_rejects_operations() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            get_state(&state, 1).await,
            Err(ServiceError::Degraded)
        ));
        assert!(matches!(
            start_game(&state, 1).await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test]
    async fn full_turn_through_the_facade() {
        let state = seeded_state().await;
        let chat_id = 100;

        let started = start_game(&state, chat_id).await.unwrap();
        assert_eq!(started.round.number, 1);
        assert_eq!(started.round.themes.len(), 3);

        let theme_id = started.round.themes[0].id;
        let prompt = pick_question(&state, chat_id, PickQuestionRequest { theme_id, score: 1 })
            .await
            .unwrap();
        assert_eq!(prompt.theme_id, theme_id);
        assert_eq!(
            get_state(&state, chat_id).await.unwrap().state,
            GameState::WaitAnswer
        );
        assert_eq!(
            active_question(&state, chat_id).await.unwrap().round_question_id,
            prompt.round_question_id
        );

        let wrong = submit_answer(
            &state,
            chat_id,
            SubmitAnswerRequest {
                user_id: 1,
                text: "definitely not it".into(),
            },
        )
        .await
        .unwrap();
        assert!(!wrong.correct);
        assert_eq!(list_answers(&state, chat_id).await.unwrap().len(), 1);

        let grid = table(&state, chat_id).await.unwrap();
        assert!(grid.themes.iter().all(|c| c.answers.values().all(|v| !v)));

        let next = start_round(&state, chat_id).await.unwrap();
        assert_eq!(next.number, 2);
        assert_eq!(
            get_state(&state, chat_id).await.unwrap().state,
            GameState::WaitQuestion
        );
    }

    #[tokio::test]
    async fn answering_without_open_question_is_a_conflict() {
        let state = seeded_state().await;
        start_game(&state, 5).await.unwrap();

        let err = submit_answer(
            &state,
            5,
            SubmitAnswerRequest {
                user_id: 1,
                text: "Paris".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(matches!(
            active_question(&state, 5).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
