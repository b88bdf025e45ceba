//! Per-chat game routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dao::models::ChatId,
    dto::game::{
        AnswerResponse, GameStateResponse, PickQuestionRequest, QuestionPrompt, RoundSummary,
        StartGameResponse, SubmitAnswerRequest, TableResponse,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Per-chat game endpoints consumed by the chat-bot dispatcher.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/chats/{chat_id}/state", get(get_state))
        .route("/chats/{chat_id}/session", post(start_game))
        .route("/chats/{chat_id}/rounds", post(start_round))
        .route("/chats/{chat_id}/table", get(get_table))
        .route("/chats/{chat_id}/questions", post(pick_question))
        .route("/chats/{chat_id}/questions/active", get(get_active_question))
        .route(
            "/chats/{chat_id}/answers",
            get(list_answers).post(submit_answer),
        )
}

/// Resolve which commands are currently legal in the chat.
#[utoipa::path(
    get,
    path = "/chats/{chat_id}/state",
    tag = "game",
    params(("chat_id" = i64, Path, description = "Chat identifier")),
    responses((status = 200, description = "Derived game state", body = GameStateResponse))
)]
pub async fn get_state(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<GameStateResponse>, AppError> {
    Ok(Json(game_service::get_state(&state, chat_id).await?))
}

/// Start a game: create the chat's session and open round 1.
#[utoipa::path(
    post,
    path = "/chats/{chat_id}/session",
    tag = "game",
    params(("chat_id" = i64, Path, description = "Chat identifier")),
    responses(
        (status = 201, description = "Game started", body = StartGameResponse),
        (status = 409, description = "A session is already active"),
        (status = 422, description = "Not enough themes in the catalog")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
) -> Result<(StatusCode, Json<StartGameResponse>), AppError> {
    let started = game_service::start_game(&state, chat_id).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Finish the current round and open the next one with fresh themes.
#[utoipa::path(
    post,
    path = "/chats/{chat_id}/rounds",
    tag = "game",
    params(("chat_id" = i64, Path, description = "Chat identifier")),
    responses(
        (status = 201, description = "Round started", body = RoundSummary),
        (status = 404, description = "No active session"),
        (status = 422, description = "Not enough themes in the catalog")
    )
)]
pub async fn start_round(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
) -> Result<(StatusCode, Json<RoundSummary>), AppError> {
    let round = game_service::start_round(&state, chat_id).await?;
    Ok((StatusCode::CREATED, Json(round)))
}

/// Theme × score grid of the active round.
#[utoipa::path(
    get,
    path = "/chats/{chat_id}/table",
    tag = "game",
    params(("chat_id" = i64, Path, description = "Chat identifier")),
    responses(
        (status = 200, description = "Score table", body = TableResponse),
        (status = 404, description = "No active round")
    )
)]
pub async fn get_table(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<TableResponse>, AppError> {
    Ok(Json(game_service::table(&state, chat_id).await?))
}

/// Open a grid cell with a random question.
#[utoipa::path(
    post,
    path = "/chats/{chat_id}/questions",
    tag = "game",
    params(("chat_id" = i64, Path, description = "Chat identifier")),
    request_body = PickQuestionRequest,
    responses(
        (status = 201, description = "Question opened", body = QuestionPrompt),
        (status = 400, description = "Score out of range or theme not in the round"),
        (status = 404, description = "No question for this cell"),
        (status = 409, description = "Another question is still open")
    )
)]
pub async fn pick_question(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
    Valid(Json(request)): Valid<Json<PickQuestionRequest>>,
) -> Result<(StatusCode, Json<QuestionPrompt>), AppError> {
    let prompt = game_service::pick_question(&state, chat_id, request).await?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

#[utoipa::path(
    get,
    path = "/chats/{chat_id}/questions/active",
    tag = "game",
    params(("chat_id" = i64, Path, description = "Chat identifier")),
    responses(
        (status = 200, description = "Open question", body = QuestionPrompt),
        (status = 404, description = "No open question")
    )
)]
pub async fn get_active_question(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<QuestionPrompt>, AppError> {
    Ok(Json(game_service::active_question(&state, chat_id).await?))
}

/// Submit an answer to the open question.
#[utoipa::path(
    post,
    path = "/chats/{chat_id}/answers",
    tag = "game",
    params(("chat_id" = i64, Path, description = "Chat identifier")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 201, description = "Answer recorded", body = AnswerResponse),
        (status = 409, description = "No open question or it was answered meanwhile")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
    Valid(Json(request)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<(StatusCode, Json<AnswerResponse>), AppError> {
    let answer = game_service::submit_answer(&state, chat_id, request).await?;
    Ok((StatusCode::CREATED, Json(answer)))
}

/// Attempts made on the open question, oldest first.
#[utoipa::path(
    get,
    path = "/chats/{chat_id}/answers",
    tag = "game",
    params(("chat_id" = i64, Path, description = "Chat identifier")),
    responses(
        (status = 200, description = "Recorded attempts", body = [AnswerResponse]),
        (status = 404, description = "No open question")
    )
)]
pub async fn list_answers(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<Vec<AnswerResponse>>, AppError> {
    Ok(Json(game_service::list_answers(&state, chat_id).await?))
}
