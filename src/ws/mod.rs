//! WebSocket layer: connection driver, wire messages, lifecycle.
//!
//! The endpoint at `/ws` carries the presence protocol: clients register
//! as a student or tutor and receive `profList` snapshots whenever the set
//! of connected tutors changes.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod session;
