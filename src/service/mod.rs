//! Service layer: the presence hub and its broadcaster.

pub mod broadcaster;
pub mod presence_hub;

pub use presence_hub::PresenceHub;
