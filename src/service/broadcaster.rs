//! Presence broadcaster: tutor snapshot → every registered connection.

use crate::domain::{BroadcastReport, ConnectionRegistry, TutorTable};
use crate::ws::messages::ServerMessage;

/// Serializes the current tutor snapshot as a `profList` message and
/// queues it on every registered connection.
///
/// Holds no state of its own. Callers invoke it while holding the hub lock,
/// so the message reflects the state at the moment of sending.
pub fn publish(connections: &ConnectionRegistry, tutors: &TutorTable) -> BroadcastReport {
    let message = ServerMessage::ProfList {
        profs: tutors.snapshot(),
    };
    let payload = match message.to_json() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize prof list");
            return BroadcastReport::default();
        }
    };

    let report = connections.broadcast(&payload);
    tracing::debug!(
        tutors = tutors.len(),
        delivered = report.delivered,
        dropped = report.dropped,
        skipped = report.skipped,
        "prof list broadcast"
    );
    report
}
