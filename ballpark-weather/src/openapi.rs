use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use common::errors::ErrorResponse;
use common::models::{CacheState, ForecastSample, LocationRefreshStatus, RefreshStatus};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::get_forecast,
        handlers::list_stadiums,
        handlers::refresh_status,
    ),
    components(schemas(
        ForecastSample,
        RefreshStatus,
        LocationRefreshStatus,
        CacheState,
        ErrorResponse,
    )),
    tags(
        (name = "weather", description = "Cached ballpark forecasts"),
    ),
)]
struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
