//! WebSocket wire messages.
//!
//! Every frame is a JSON object discriminated by its `"type"` field.
//! Inbound frames are parsed into [`ClientMessage`] at the boundary;
//! anything that does not match a known variant is rejected as malformed.

use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{PendingCall, Role, TutorPresence};
use crate::error::HubError;

/// Messages a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Binds the connection to a username and role.
    Register {
        /// Username to register under.
        username: String,
        /// Declared role; `"eleve"` when absent, null or empty.
        #[serde(default, deserialize_with = "role_or_default")]
        role: Option<Role>,
    },
    /// Asks for the current tutor list.
    GetProfList,
    /// Tutor flips its own availability.
    ToggleAvailability,
    /// Student asks to be queued for a tutor.
    DemandAppel {
        /// Tutor username.
        target: String,
    },
    /// Student leaves a tutor's queue.
    AnnulerAppel {
        /// Tutor username.
        target: String,
    },
    /// Tutor picks up a waiting student.
    AccepterAppel {
        /// Student username.
        eleve: String,
    },
}

impl ClientMessage {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::MalformedMessage`] if the frame is not JSON, has
    /// an unknown `type`, or lacks required fields.
    pub fn parse(text: &str) -> Result<Self, HubError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::GetProfList => "getProfList",
            Self::ToggleAvailability => "toggleAvailability",
            Self::DemandAppel { .. } => "demandAppel",
            Self::AnnulerAppel { .. } => "annulerAppel",
            Self::AccepterAppel { .. } => "accepterAppel",
        }
    }
}

/// Reads the `role` field; an empty string counts as no role.
fn role_or_default<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => {
            Role::deserialize(raw.as_str().into_deserializer()).map(Some)
        }
        _ => Ok(None),
    }
}

/// Messages the hub sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Presence snapshot of every connected tutor.
    ProfList {
        /// Tutors sorted by username.
        profs: Vec<TutorPresence>,
    },
    /// A tutor's waiting queue, sent to that tutor.
    AppelEnAttente {
        /// Waiting students, oldest first.
        appels: Vec<PendingCall>,
    },
    /// Confirms a `demandAppel` to the requesting student.
    DemandAppelConfirmee {
        /// Tutor the student is waiting for.
        prof: String,
    },
    /// Tells a student that the tutor picked them up.
    AppelAccepte {
        /// Tutor username.
        prof: String,
        /// Student username.
        eleve: String,
    },
    /// Reports a rejected request to its sender.
    Erreur {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerMessage {
    /// Serializes the message to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Internal`] if serialization fails.
    pub fn to_json(&self) -> Result<String, HubError> {
        serde_json::to_string(self).map_err(|e| HubError::Internal(e.to_string()))
    }
}
