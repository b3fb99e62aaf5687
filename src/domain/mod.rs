//! Domain layer: connection identity, registry, and tutor availability.
//!
//! Everything here is plain synchronous state. Concurrency is handled one
//! level up by [`crate::service::PresenceHub`], which owns a registry and a
//! tutor table behind a single lock.

pub mod connection_handle;
pub mod connection_id;
pub mod connection_registry;
pub mod presence;
pub mod tutor_table;
pub mod user;

pub use connection_handle::{ConnectionHandle, SendOutcome};
pub use connection_id::ConnectionId;
pub use connection_registry::{BroadcastReport, ConnectionRegistry};
pub use presence::{PendingCall, TutorPresence};
pub use tutor_table::{TutorState, TutorTable};
pub use user::{Registration, Role};
