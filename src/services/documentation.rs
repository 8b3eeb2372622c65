use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the guess party backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::persons::list_persons,
        crate::routes::devices::register_device,
        crate::routes::game::create_game,
        crate::routes::game::find_game,
        crate::routes::game::update_round,
        crate::routes::sessions::get_session,
        crate::routes::sessions::start_round,
        crate::routes::sessions::correct_guess,
        crate::routes::sessions::end_round,
        crate::routes::sessions::next_round,
        crate::routes::sessions::reset_game,
        crate::routes::sessions::session_events,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::CatalogStatus,
            crate::dto::person::PersonDto,
            crate::dto::device::DeviceResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::UpdateRoundRequest,
            crate::dto::game::UpdateRoundResponse,
            crate::dto::game::GameRecordResponse,
            crate::dto::game::RoundScoreDto,
            crate::dto::session::SessionView,
            crate::dto::session::SessionPhaseDto,
            crate::dto::session::FinishReasonDto,
            crate::dto::session::TotalsDto,
            crate::dto::session::OutcomeDto,
            crate::dto::session::GuessResponse,
            crate::dto::session::GuessRejectionDto,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "persons", description = "Person catalog"),
        (name = "devices", description = "Device identity"),
        (name = "game", description = "Stored game records"),
        (name = "sessions", description = "Live sessions and their event streams"),
    )
)]
pub struct ApiDoc;
