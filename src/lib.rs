//! # tutor-presence-hub
//!
//! WebSocket presence hub for a tutoring platform.
//!
//! Students and tutors open a WebSocket and register under a username.
//! The hub keeps every connected tutor's availability and pending-call
//! queue, and broadcasts a `profList` snapshot to every registered client
//! whenever that picture changes. A small read-only REST surface exposes
//! the same snapshot.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler → Session state machine (ws/)
//!     │
//!     ├── PresenceHub + Broadcaster (service/)
//!     │
//!     └── ConnectionRegistry, TutorTable, ConnectionHandle (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod router;
pub mod service;
pub mod ws;

pub use router::build_app;
