//! Presence views sent to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One row of a presence snapshot.
///
/// Derived from the tutor table on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TutorPresence {
    /// Tutor username.
    pub username: String,
    /// Whether the tutor accepts calls.
    #[serde(rename = "disponible")]
    pub available: bool,
    /// Number of students waiting in the tutor's queue.
    #[serde(rename = "appelEnAttente")]
    pub pending_calls: usize,
}

/// A student waiting for a tutor to pick up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PendingCall {
    /// Requesting student's username.
    #[serde(rename = "eleve")]
    pub student: String,
    /// When the request was queued.
    #[serde(rename = "timestamp")]
    pub requested_at: DateTime<Utc>,
}

impl PendingCall {
    /// Creates a call request stamped with the current time.
    #[must_use]
    pub fn new(student: impl Into<String>) -> Self {
        Self {
            student: student.into(),
            requested_at: Utc::now(),
        }
    }
}
