//! Connected users: role and registration record.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role a user declares when registering.
///
/// Serialized with the French wire names used by the web clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    /// A student (`"eleve"`). Default when the client omits the role.
    #[default]
    #[serde(rename = "eleve")]
    Student,
    /// A tutor (`"prof"`), tracked in the availability table.
    #[serde(rename = "prof")]
    Tutor,
}

impl Role {
    /// Returns `true` for [`Role::Tutor`].
    #[must_use]
    pub const fn is_tutor(self) -> bool {
        matches!(self, Self::Tutor)
    }
}

/// What a connection registered as. Lives only as long as the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Username, unique per live session (last register wins).
    pub username: String,
    /// Declared role.
    pub role: Role,
}

impl Registration {
    /// Creates a registration record.
    #[must_use]
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_uses_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Tutor).ok().as_deref(), Some("\"prof\""));
        assert_eq!(serde_json::to_string(&Role::Student).ok().as_deref(), Some("\"eleve\""));
    }

    #[test]
    fn default_role_is_student() {
        assert_eq!(Role::default(), Role::Student);
        assert!(!Role::default().is_tutor());
    }
}
