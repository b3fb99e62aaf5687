//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{HealthResponse, ProfListResponse};
use super::handlers::{system, tutors};
use crate::domain::{PendingCall, Role, TutorPresence};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI specification, served at `/api-docs/openapi.json`
/// when the `swagger-ui` feature is enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "tutor-presence-hub",
        description = "Presence hub for online tutors. The live protocol runs over `GET /ws`."
    ),
    paths(system::health_handler, tutors::list_profs, tutors::get_prof),
    components(schemas(
        HealthResponse,
        ProfListResponse,
        TutorPresence,
        PendingCall,
        Role,
        ErrorResponse,
        ErrorBody
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "Presence", description = "Read-only views of connected tutors")
    )
)]
pub struct ApiDoc;
