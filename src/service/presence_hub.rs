//! Presence hub: the single owner of all shared connection state.
//!
//! [`PresenceHub`] keeps the [`ConnectionRegistry`] and the [`TutorTable`]
//! together behind one [`tokio::sync::RwLock`]. Every mutation takes the
//! write lock, applies its change, and broadcasts before releasing it, so
//! concurrent register/disconnect events cannot lose updates and each
//! `profList` matches the state it was computed from. Sends are
//! non-blocking, which keeps the critical section short.

use tokio::sync::{RwLock, mpsc};

use super::broadcaster;
use crate::domain::{
    ConnectionHandle, ConnectionRegistry, PendingCall, Registration, Role, TutorPresence,
    TutorTable,
};
use crate::error::HubError;
use crate::ws::messages::ServerMessage;

/// In-memory registry of live connections and connected tutors.
#[derive(Debug)]
pub struct PresenceHub {
    state: RwLock<HubState>,
    outbound_capacity: usize,
}

#[derive(Debug, Default)]
struct HubState {
    connections: ConnectionRegistry,
    tutors: TutorTable,
}

impl HubState {
    fn publish(&self) {
        let report = broadcaster::publish(&self.connections, &self.tutors);
        if report.dropped > 0 {
            tracing::warn!(dropped = report.dropped, "prof list not delivered to full queues");
        }
    }

    fn send_to(&self, username: &str, message: &ServerMessage) {
        if let Some(handle) = self.connections.get(username) {
            send(handle, message);
        }
    }

    fn notify_queue(&self, tutor: &str) {
        if let Some(state) = self.tutors.get(tutor) {
            self.send_to(
                tutor,
                &ServerMessage::AppelEnAttente {
                    appels: state.pending_calls().to_vec(),
                },
            );
        }
    }

    fn ensure_owner(
        &self,
        handle: &ConnectionHandle,
        registration: &Registration,
    ) -> Result<(), HubError> {
        if self.connections.owner(&registration.username) == Some(handle.id()) {
            Ok(())
        } else {
            Err(HubError::NotRegistered)
        }
    }

    /// Drops everything `registration` holds, if `handle` still owns it.
    /// Returns `true` when the tutor list changed.
    fn release(&mut self, handle: &ConnectionHandle, registration: &Registration) -> bool {
        let username = registration.username.as_str();
        if !self.connections.release(username, handle.id()) {
            tracing::debug!(username, connection = %handle.id(), "username taken over, nothing to release");
            return false;
        }
        let affected = self.tutors.withdraw_student(username);
        for tutor in &affected {
            self.notify_queue(tutor);
        }
        let tutor_removed = match registration.role {
            Role::Tutor => {
                let removed = self.tutors.remove(username).is_some();
                tracing::info!(username, tutors = self.tutors.len(), "tutor disconnected");
                removed
            }
            Role::Student => {
                tracing::info!(
                    username,
                    connections = self.connections.len(),
                    "student disconnected"
                );
                false
            }
        };
        tutor_removed || !affected.is_empty()
    }
}

fn send(handle: &ConnectionHandle, message: &ServerMessage) {
    match message.to_json() {
        Ok(payload) => {
            let _ = handle.try_send(payload);
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize outbound message"),
    }
}

impl PresenceHub {
    /// Creates an empty hub whose connections get outbound queues of
    /// `outbound_capacity` messages.
    #[must_use]
    pub fn new(outbound_capacity: usize) -> Self {
        Self {
            state: RwLock::new(HubState::default()),
            outbound_capacity: outbound_capacity.max(1),
        }
    }

    /// Allocates the outbound queue for a newly accepted connection.
    #[must_use]
    pub fn open_connection(&self) -> (ConnectionHandle, mpsc::Receiver<String>) {
        ConnectionHandle::channel(self.outbound_capacity)
    }

    /// Registers `handle` under `registration`.
    ///
    /// If the connection was registered under another username, that
    /// username is released first. A username already held by another
    /// connection is taken over. Tutors are put online and the tutor list is
    /// broadcast; students receive the current list directly.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidUsername`] if the username is blank.
    pub async fn register(
        &self,
        handle: &ConnectionHandle,
        previous: Option<&Registration>,
        registration: &Registration,
    ) -> Result<(), HubError> {
        if registration.username.trim().is_empty() {
            return Err(HubError::InvalidUsername);
        }
        let username = registration.username.as_str();

        let mut state = self.state.write().await;
        let mut tutors_changed = false;

        if let Some(previous) = previous
            && previous.username != registration.username
        {
            tutors_changed |= state.release(handle, previous);
        }

        if let Some(replaced) = state.connections.register(username, handle.clone())
            && replaced.id() != handle.id()
        {
            tracing::warn!(username, replaced = %replaced.id(), "username taken over by a new connection");
        }

        match registration.role {
            Role::Tutor => {
                state.tutors.set_tutor_online(username);
                tutors_changed = true;
                tracing::info!(username, tutors = state.tutors.len(), "tutor connected");
            }
            Role::Student => {
                tutors_changed |= state.tutors.remove(username).is_some();
                tracing::info!(
                    username,
                    connections = state.connections.len(),
                    "student connected"
                );
            }
        }

        if tutors_changed {
            state.publish();
        } else {
            send(
                handle,
                &ServerMessage::ProfList {
                    profs: state.tutors.snapshot(),
                },
            );
        }
        Ok(())
    }

    /// Runs the disconnect path for a registered connection.
    ///
    /// No-op if another connection has since taken over the username.
    pub async fn disconnect(&self, handle: &ConnectionHandle, registration: &Registration) {
        let mut state = self.state.write().await;
        if state.release(handle, registration) {
            state.publish();
        }
    }

    /// Sends the current tutor list to one connection.
    pub async fn send_prof_list(&self, handle: &ConnectionHandle) {
        let state = self.state.read().await;
        send(
            handle,
            &ServerMessage::ProfList {
                profs: state.tutors.snapshot(),
            },
        );
    }

    /// Flips the calling tutor's availability and broadcasts.
    ///
    /// Returns the new availability.
    ///
    /// # Errors
    ///
    /// - [`HubError::NotRegistered`] if `handle` no longer owns the username.
    /// - [`HubError::NotATutor`] if the caller registered as a student.
    /// - [`HubError::TutorNotFound`] if the tutor entry is gone.
    pub async fn toggle_availability(
        &self,
        handle: &ConnectionHandle,
        registration: &Registration,
    ) -> Result<bool, HubError> {
        let mut state = self.state.write().await;
        state.ensure_owner(handle, registration)?;
        if !registration.role.is_tutor() {
            return Err(HubError::NotATutor(registration.username.clone()));
        }
        let available = state.tutors.toggle_availability(&registration.username)?;
        tracing::info!(username = %registration.username, available, "availability changed");
        state.publish();
        Ok(available)
    }

    /// Queues the caller in `tutor`'s pending calls.
    ///
    /// A caller already waiting stays at its position. The caller always
    /// gets a confirmation; the tutor and everyone else are only notified
    /// when the queue actually changed.
    ///
    /// # Errors
    ///
    /// - [`HubError::NotRegistered`] if `handle` no longer owns the username.
    /// - [`HubError::CallToSelf`] if the caller targets its own username.
    /// - [`HubError::TutorNotFound`] if `tutor` is not connected.
    pub async fn request_call(
        &self,
        handle: &ConnectionHandle,
        registration: &Registration,
        tutor: &str,
    ) -> Result<(), HubError> {
        let mut state = self.state.write().await;
        state.ensure_owner(handle, registration)?;
        if tutor == registration.username {
            return Err(HubError::CallToSelf(tutor.to_owned()));
        }
        let queued = state
            .tutors
            .enqueue_call(tutor, PendingCall::new(registration.username.as_str()))?;
        if queued {
            tracing::info!(student = %registration.username, tutor, "call queued");
            state.notify_queue(tutor);
            state.publish();
        }
        send(
            handle,
            &ServerMessage::DemandAppelConfirmee {
                prof: tutor.to_owned(),
            },
        );
        Ok(())
    }

    /// Removes the caller from `tutor`'s pending calls.
    ///
    /// # Errors
    ///
    /// - [`HubError::NotRegistered`] if `handle` no longer owns the username.
    /// - [`HubError::TutorNotFound`] if `tutor` is not connected.
    pub async fn cancel_call(
        &self,
        handle: &ConnectionHandle,
        registration: &Registration,
        tutor: &str,
    ) -> Result<(), HubError> {
        let mut state = self.state.write().await;
        state.ensure_owner(handle, registration)?;
        if state.tutors.dequeue_call(tutor, &registration.username)? {
            tracing::info!(student = %registration.username, tutor, "call cancelled");
            state.notify_queue(tutor);
            state.publish();
        }
        Ok(())
    }

    /// The calling tutor picks `student` out of its queue.
    ///
    /// # Errors
    ///
    /// - [`HubError::NotRegistered`] if `handle` no longer owns the username.
    /// - [`HubError::NotATutor`] if the caller registered as a student.
    /// - [`HubError::CallNotFound`] if `student` is not waiting.
    pub async fn accept_call(
        &self,
        handle: &ConnectionHandle,
        registration: &Registration,
        student: &str,
    ) -> Result<(), HubError> {
        let mut state = self.state.write().await;
        state.ensure_owner(handle, registration)?;
        if !registration.role.is_tutor() {
            return Err(HubError::NotATutor(registration.username.clone()));
        }
        let tutor = registration.username.as_str();
        if !state.tutors.dequeue_call(tutor, student)? {
            return Err(HubError::CallNotFound {
                tutor: tutor.to_owned(),
                student: student.to_owned(),
            });
        }
        tracing::info!(tutor, student, "call accepted");
        state.send_to(
            student,
            &ServerMessage::AppelAccepte {
                prof: tutor.to_owned(),
                eleve: student.to_owned(),
            },
        );
        state.notify_queue(tutor);
        state.publish();
        Ok(())
    }

    /// Current presence snapshot, sorted by username.
    pub async fn snapshot(&self) -> Vec<TutorPresence> {
        self.state.read().await.tutors.snapshot()
    }

    /// Presence of one tutor.
    pub async fn tutor(&self, username: &str) -> Option<TutorPresence> {
        self.state.read().await.tutors.presence(username)
    }

    /// Returns `true` if `username` is registered.
    pub async fn is_registered(&self, username: &str) -> bool {
        self.state.read().await.connections.contains(username)
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Number of connected tutors.
    pub async fn tutor_count(&self) -> usize {
        self.state.read().await.tutors.len()
    }
}

impl Default for PresenceHub {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_OUTBOUND_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            let Ok(msg) = serde_json::from_str(&text) else {
                panic!("unexpected frame {text}");
            };
            out.push(msg);
        }
        out
    }

    fn last_prof_list(rx: &mut mpsc::Receiver<String>) -> Option<Vec<TutorPresence>> {
        drain(rx).into_iter().rev().find_map(|m| match m {
            ServerMessage::ProfList { profs } => Some(profs),
            _ => None,
        })
    }

    fn row(username: &str, pending_calls: usize) -> TutorPresence {
        TutorPresence {
            username: username.to_string(),
            available: true,
            pending_calls,
        }
    }

    fn tutor(name: &str) -> Registration {
        Registration::new(name, Role::Tutor)
    }

    fn student(name: &str) -> Registration {
        Registration::new(name, Role::Student)
    }

    #[tokio::test]
    async fn tutor_receives_own_registration_broadcast() {
        let hub = PresenceHub::new(8);
        let (alice, mut rx) = hub.open_connection();

        let result = hub.register(&alice, None, &tutor("alice")).await;
        assert!(result.is_ok());
        assert_eq!(last_prof_list(&mut rx), Some(vec![row("alice", 0)]));
    }

    #[tokio::test]
    async fn tutor_disconnect_is_broadcast_to_remaining_clients() {
        let hub = PresenceHub::new(8);
        let (alice, _alice_rx) = hub.open_connection();
        let (bob, mut bob_rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;
        let _ = hub.register(&bob, None, &tutor("bob")).await;
        assert_eq!(
            last_prof_list(&mut bob_rx),
            Some(vec![row("alice", 0), row("bob", 0)])
        );

        hub.disconnect(&alice, &tutor("alice")).await;
        assert_eq!(last_prof_list(&mut bob_rx), Some(vec![row("bob", 0)]));
        assert!(!hub.is_registered("alice").await);
        assert_eq!(hub.tutor_count().await, 1);
    }

    #[tokio::test]
    async fn student_registration_gets_list_without_broadcast() {
        let hub = PresenceHub::new(8);
        let (alice, mut alice_rx) = hub.open_connection();
        let (eve, mut eve_rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;
        let _ = drain(&mut alice_rx);

        let _ = hub.register(&eve, None, &student("eve")).await;
        assert_eq!(last_prof_list(&mut eve_rx), Some(vec![row("alice", 0)]));
        assert!(drain(&mut alice_rx).is_empty());
        assert_eq!(hub.connection_count().await, 2);
    }

    #[tokio::test]
    async fn registering_twice_is_idempotent() {
        let hub = PresenceHub::new(8);
        let (alice, mut rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;
        let first = last_prof_list(&mut rx);
        let _ = hub
            .register(&alice, Some(&tutor("alice")), &tutor("alice"))
            .await;
        assert_eq!(last_prof_list(&mut rx), first);
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn blank_username_is_rejected_without_state_change() {
        let hub = PresenceHub::new(8);
        let (conn, mut rx) = hub.open_connection();
        let result = hub.register(&conn, None, &tutor("  ")).await;
        assert!(matches!(result, Err(HubError::InvalidUsername)));
        assert_eq!(hub.connection_count().await, 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn reregistering_under_new_name_releases_old_one() {
        let hub = PresenceHub::new(8);
        let (conn, mut rx) = hub.open_connection();
        let _ = hub.register(&conn, None, &tutor("alice")).await;
        let _ = hub
            .register(&conn, Some(&tutor("alice")), &tutor("alicia"))
            .await;

        assert!(!hub.is_registered("alice").await);
        assert!(hub.is_registered("alicia").await);
        assert_eq!(last_prof_list(&mut rx), Some(vec![row("alicia", 0)]));
    }

    #[tokio::test]
    async fn superseded_connection_cannot_evict_new_owner() {
        let hub = PresenceHub::new(8);
        let (old, _old_rx) = hub.open_connection();
        let (new, mut new_rx) = hub.open_connection();
        let _ = hub.register(&old, None, &tutor("alice")).await;
        let _ = hub.register(&new, None, &tutor("alice")).await;
        let _ = drain(&mut new_rx);

        hub.disconnect(&old, &tutor("alice")).await;
        assert!(hub.is_registered("alice").await);
        assert_eq!(hub.snapshot().await, vec![row("alice", 0)]);
        assert!(drain(&mut new_rx).is_empty());
    }

    #[tokio::test]
    async fn student_taking_a_tutor_name_removes_tutor_entry() {
        let hub = PresenceHub::new(8);
        let (first, _first_rx) = hub.open_connection();
        let (second, mut second_rx) = hub.open_connection();
        let _ = hub.register(&first, None, &tutor("alice")).await;
        let _ = hub.register(&second, None, &student("alice")).await;

        assert!(hub.snapshot().await.is_empty());
        assert_eq!(last_prof_list(&mut second_rx), Some(Vec::new()));
    }

    #[tokio::test]
    async fn call_queue_flow() {
        let hub = PresenceHub::new(16);
        let (alice, mut alice_rx) = hub.open_connection();
        let (bob, mut bob_rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;
        let _ = hub.register(&bob, None, &student("bob")).await;
        let _ = drain(&mut alice_rx);
        let _ = drain(&mut bob_rx);

        let queued = hub.request_call(&bob, &student("bob"), "alice").await;
        assert!(queued.is_ok());
        let to_alice = drain(&mut alice_rx);
        assert!(to_alice.iter().any(|m| matches!(
            m,
            ServerMessage::AppelEnAttente { appels } if appels.len() == 1
        )));
        let to_bob = drain(&mut bob_rx);
        assert!(to_bob.contains(&ServerMessage::DemandAppelConfirmee {
            prof: "alice".to_string()
        }));
        assert_eq!(hub.tutor("alice").await, Some(row("alice", 1)));

        let accepted = hub.accept_call(&alice, &tutor("alice"), "bob").await;
        assert!(accepted.is_ok());
        let to_bob = drain(&mut bob_rx);
        assert!(to_bob.contains(&ServerMessage::AppelAccepte {
            prof: "alice".to_string(),
            eleve: "bob".to_string(),
        }));
        assert_eq!(hub.tutor("alice").await, Some(row("alice", 0)));
    }

    #[tokio::test]
    async fn cancel_call_empties_queue() {
        let hub = PresenceHub::new(16);
        let (alice, _alice_rx) = hub.open_connection();
        let (bob, _bob_rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;
        let _ = hub.register(&bob, None, &student("bob")).await;
        let _ = hub.request_call(&bob, &student("bob"), "alice").await;

        assert!(hub.cancel_call(&bob, &student("bob"), "alice").await.is_ok());
        assert_eq!(hub.tutor("alice").await, Some(row("alice", 0)));
    }

    #[tokio::test]
    async fn call_errors_leave_state_untouched() {
        let hub = PresenceHub::new(16);
        let (alice, _alice_rx) = hub.open_connection();
        let (bob, _bob_rx) = hub.open_connection();
        let (stranger, _stranger_rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;
        let _ = hub.register(&bob, None, &student("bob")).await;

        assert!(matches!(
            hub.request_call(&bob, &student("bob"), "ghost").await,
            Err(HubError::TutorNotFound(_))
        ));
        assert!(matches!(
            hub.accept_call(&bob, &student("bob"), "alice").await,
            Err(HubError::NotATutor(_))
        ));
        assert!(matches!(
            hub.accept_call(&alice, &tutor("alice"), "bob").await,
            Err(HubError::CallNotFound { .. })
        ));
        assert!(matches!(
            hub.request_call(&stranger, &student("bob"), "alice").await,
            Err(HubError::NotRegistered)
        ));
        assert_eq!(hub.snapshot().await, vec![row("alice", 0)]);
    }

    #[tokio::test]
    async fn departing_student_leaves_every_queue() {
        let hub = PresenceHub::new(16);
        let (alice, mut alice_rx) = hub.open_connection();
        let (bob, _bob_rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;
        let _ = hub.register(&bob, None, &student("bob")).await;
        let _ = hub.request_call(&bob, &student("bob"), "alice").await;
        let _ = drain(&mut alice_rx);

        hub.disconnect(&bob, &student("bob")).await;
        assert_eq!(last_prof_list(&mut alice_rx), Some(vec![row("alice", 0)]));
    }

    #[tokio::test]
    async fn student_turned_tutor_leaves_every_queue() {
        let hub = PresenceHub::new(16);
        let (alice, _alice_rx) = hub.open_connection();
        let (bob, _bob_rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;
        let _ = hub.register(&bob, None, &student("bob")).await;
        let _ = hub.request_call(&bob, &student("bob"), "alice").await;
        let _ = hub.register(&bob, Some(&student("bob")), &tutor("bob")).await;
        assert_eq!(hub.tutor("alice").await, Some(row("alice", 1)));

        hub.disconnect(&bob, &tutor("bob")).await;
        assert!(!hub.is_registered("bob").await);
        assert_eq!(hub.tutor("alice").await, Some(row("alice", 0)));
    }

    #[tokio::test]
    async fn departing_tutor_leaves_other_tutors_queues() {
        let hub = PresenceHub::new(16);
        let (alice, mut alice_rx) = hub.open_connection();
        let (carl, _carl_rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;
        let _ = hub.register(&carl, None, &tutor("carl")).await;
        assert!(hub.request_call(&carl, &tutor("carl"), "alice").await.is_ok());
        let _ = drain(&mut alice_rx);

        hub.disconnect(&carl, &tutor("carl")).await;
        assert_eq!(hub.snapshot().await, vec![row("alice", 0)]);
        let to_alice = drain(&mut alice_rx);
        assert!(to_alice.contains(&ServerMessage::AppelEnAttente { appels: Vec::new() }));
    }

    #[tokio::test]
    async fn calling_yourself_is_rejected() {
        let hub = PresenceHub::new(16);
        let (alice, _alice_rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;

        assert!(matches!(
            hub.request_call(&alice, &tutor("alice"), "alice").await,
            Err(HubError::CallToSelf(_))
        ));
        assert_eq!(hub.tutor("alice").await, Some(row("alice", 0)));
    }

    #[tokio::test]
    async fn full_queue_drops_broadcast_for_that_peer_only() {
        let hub = PresenceHub::new(1);
        let (alice, mut alice_rx) = hub.open_connection();
        let (bob, mut bob_rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;
        // bob's single slot now holds alice's broadcast and is never drained
        let _ = hub.register(&bob, None, &tutor("bob")).await;
        let _ = drain(&mut alice_rx);

        let _ = hub.toggle_availability(&alice, &tutor("alice")).await;
        assert_eq!(
            last_prof_list(&mut alice_rx).map(|profs| profs.len()),
            Some(2)
        );
        assert_eq!(drain(&mut bob_rx).len(), 1);
        assert_eq!(hub.tutor_count().await, 2);
    }

    #[tokio::test]
    async fn toggle_availability_flips_and_broadcasts() {
        let hub = PresenceHub::new(8);
        let (alice, mut rx) = hub.open_connection();
        let _ = hub.register(&alice, None, &tutor("alice")).await;

        let Ok(available) = hub.toggle_availability(&alice, &tutor("alice")).await else {
            panic!("tutor may toggle availability");
        };
        assert!(!available);
        let Some(profs) = last_prof_list(&mut rx) else {
            panic!("toggle must broadcast");
        };
        assert_eq!(profs.first().map(|p| p.available), Some(false));
    }

    #[tokio::test]
    async fn concurrent_registrations_all_land() {
        let hub = Arc::new(PresenceHub::new(64));
        let mut tasks = Vec::new();
        for i in 0..20 {
            let hub = Arc::clone(&hub);
            tasks.push(tokio::spawn(async move {
                let (handle, rx) = hub.open_connection();
                let name = format!("tutor{i:02}");
                let _ = hub.register(&handle, None, &tutor(&name)).await;
                (handle, rx)
            }));
        }
        let mut live = Vec::new();
        for task in tasks {
            let Ok(conn) = task.await else {
                panic!("registration task failed");
            };
            live.push(conn);
        }

        let snapshot = hub.snapshot().await;
        assert_eq!(snapshot.len(), 20);
        assert_eq!(snapshot.first().map(|p| p.username.as_str()), Some("tutor00"));
        assert_eq!(hub.connection_count().await, 20);
    }
}
