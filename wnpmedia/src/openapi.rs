use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WNPBridge Media API",
        version = "0.1.0",
        description = "État du lecteur WebNowPlaying et commandes de lecture",
    ),
    paths(
        crate::api::detect,
        crate::api::status,
        crate::api::control,
        crate::api::health,
    ),
    components(
        schemas(
            crate::api::MediaData,
            crate::api::MediaResponse,
            crate::api::ControlRequest,
            crate::api::ControlResponse,
            crate::api::ErrorResponse,
            crate::api::HealthResponse,
            crate::api::PollReport,
        )
    ),
    tags(
        (name = "media", description = "Endpoints du pont WebNowPlaying")
    )
)]
pub struct MediaApiDoc;
