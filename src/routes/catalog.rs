//! Catalog management routes.

use axum::{Json, Router, extract::State, http::StatusCode, routing::{get, post}};
use axum_valid::Valid;

use crate::{
    dto::catalog::{CreateQuestionRequest, CreateThemeRequest, QuestionSummary, ThemeSummary},
    error::AppError,
    services::catalog_service,
    state::SharedState,
};

/// Catalog management endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/catalog/themes", get(list_themes).post(create_theme))
        .route("/catalog/questions", post(create_question))
}

/// List every catalog theme.
#[utoipa::path(
    get,
    path = "/catalog/themes",
    tag = "catalog",
    responses((status = 200, description = "Catalog themes", body = [ThemeSummary]))
)]
pub async fn list_themes(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ThemeSummary>>, AppError> {
    let store = state.require_quiz_store().await?;
    let themes = catalog_service::list_themes(store.as_ref()).await?;
    Ok(Json(themes.into_iter().map(ThemeSummary::from).collect()))
}

/// Add a theme to the catalog.
#[utoipa::path(
    post,
    path = "/catalog/themes",
    tag = "catalog",
    request_body = CreateThemeRequest,
    responses(
        (status = 201, description = "Theme created", body = ThemeSummary),
        (status = 409, description = "A theme with this title exists")
    )
)]
pub async fn create_theme(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<CreateThemeRequest>>,
) -> Result<(StatusCode, Json<ThemeSummary>), AppError> {
    let store = state.require_quiz_store().await?;
    let theme = catalog_service::add_theme(store.as_ref(), &request.title).await?;
    Ok((StatusCode::CREATED, Json(theme.into())))
}

/// Add a question to an existing theme.
#[utoipa::path(
    post,
    path = "/catalog/questions",
    tag = "catalog",
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question created", body = QuestionSummary),
        (status = 400, description = "Score outside the grid"),
        (status = 404, description = "Unknown theme")
    )
)]
pub async fn create_question(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<CreateQuestionRequest>>,
) -> Result<(StatusCode, Json<QuestionSummary>), AppError> {
    let store = state.require_quiz_store().await?;
    let question = catalog_service::add_question(
        store.as_ref(),
        &state.rules(),
        request.theme_id,
        request.score,
        &request.text,
        &request.answer,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(question.into())))
}
