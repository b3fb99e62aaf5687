//! Presence DTOs for the read-only REST views.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::TutorPresence;

/// Response body for `GET /api/v1/profs`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfListResponse {
    /// Connected tutors sorted by username.
    pub profs: Vec<TutorPresence>,
    /// Number of connected tutors.
    pub count: usize,
}

impl From<Vec<TutorPresence>> for ProfListResponse {
    fn from(profs: Vec<TutorPresence>) -> Self {
        Self {
            count: profs.len(),
            profs,
        }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` when the server answers.
    pub status: String,
    /// RFC 3339 server time.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Registered WebSocket connections.
    pub connections: usize,
    /// Connected tutors.
    pub tutors: usize,
}
