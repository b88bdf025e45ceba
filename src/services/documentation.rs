//! OpenAPI document of the REST API.

use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Chat Quiz Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::chats::get_state,
        crate::routes::chats::start_game,
        crate::routes::chats::start_round,
        crate::routes::chats::get_table,
        crate::routes::chats::pick_question,
        crate::routes::chats::get_active_question,
        crate::routes::chats::submit_answer,
        crate::routes::chats::list_answers,
        crate::routes::catalog::list_themes,
        crate::routes::catalog::create_theme,
        crate::routes::catalog::create_question,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::state::game::GameState,
            crate::dto::game::GameStateResponse,
            crate::dto::game::StartGameResponse,
            crate::dto::game::SessionSummary,
            crate::dto::game::RoundSummary,
            crate::dto::game::TableResponse,
            crate::dto::game::ThemeColumnDto,
            crate::dto::game::PickQuestionRequest,
            crate::dto::game::QuestionPrompt,
            crate::dto::game::SubmitAnswerRequest,
            crate::dto::game::AnswerResponse,
            crate::dto::catalog::ThemeSummary,
            crate::dto::catalog::CreateThemeRequest,
            crate::dto::catalog::CreateQuestionRequest,
            crate::dto::catalog::QuestionSummary,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Per-chat quiz operations used by the chat-bot dispatcher"),
        (name = "catalog", description = "Theme and question catalog management"),
    )
)]
pub struct ApiDoc;
