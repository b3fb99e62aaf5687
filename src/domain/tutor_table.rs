//! Tutor availability table.
//!
//! One [`TutorState`] per connected tutor, keyed by username in a
//! `BTreeMap` so snapshots come out sorted by username.

use std::collections::BTreeMap;

use super::presence::{PendingCall, TutorPresence};
use crate::error::HubError;

/// Availability flag and pending-call queue of one tutor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorState {
    available: bool,
    pending_calls: Vec<PendingCall>,
}

impl TutorState {
    fn online() -> Self {
        Self {
            available: true,
            pending_calls: Vec::new(),
        }
    }

    /// Whether the tutor accepts calls.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available
    }

    /// Queued call requests, oldest first.
    #[must_use]
    pub fn pending_calls(&self) -> &[PendingCall] {
        &self.pending_calls
    }
}

/// Connected tutors and their state.
#[derive(Debug, Default)]
pub struct TutorTable {
    tutors: BTreeMap<String, TutorState>,
}

impl TutorTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `{available: true, pending_calls: []}` unless `username` is
    /// already present. Returns `true` if an entry was inserted.
    pub fn set_tutor_online(&mut self, username: &str) -> bool {
        if self.tutors.contains_key(username) {
            return false;
        }
        self.tutors.insert(username.to_owned(), TutorState::online());
        true
    }

    /// Deletes the tutor's entry.
    pub fn remove(&mut self, username: &str) -> Option<TutorState> {
        self.tutors.remove(username)
    }

    /// Returns the tutor's state.
    #[must_use]
    pub fn get(&self, username: &str) -> Option<&TutorState> {
        self.tutors.get(username)
    }

    /// Returns `true` if `username` is a connected tutor.
    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.tutors.contains_key(username)
    }

    /// Number of connected tutors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tutors.len()
    }

    /// Returns `true` if no tutor is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tutors.is_empty()
    }

    /// Flips the tutor's availability and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::TutorNotFound`] if `username` is not in the table.
    pub fn toggle_availability(&mut self, username: &str) -> Result<bool, HubError> {
        let state = self.state_mut(username)?;
        state.available = !state.available;
        Ok(state.available)
    }

    /// Appends `call` to the tutor's queue unless that student is already
    /// waiting. Returns `true` if the call was queued.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::TutorNotFound`] if `tutor` is not in the table.
    pub fn enqueue_call(&mut self, tutor: &str, call: PendingCall) -> Result<bool, HubError> {
        let state = self.state_mut(tutor)?;
        if state.pending_calls.iter().any(|c| c.student == call.student) {
            return Ok(false);
        }
        state.pending_calls.push(call);
        Ok(true)
    }

    /// Removes `student` from the tutor's queue. Returns `true` if it was
    /// waiting there.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::TutorNotFound`] if `tutor` is not in the table.
    pub fn dequeue_call(&mut self, tutor: &str, student: &str) -> Result<bool, HubError> {
        let state = self.state_mut(tutor)?;
        let before = state.pending_calls.len();
        state.pending_calls.retain(|c| c.student != student);
        Ok(state.pending_calls.len() != before)
    }

    /// Drops `student` from every queue and returns the tutors affected.
    pub fn withdraw_student(&mut self, student: &str) -> Vec<String> {
        let mut affected = Vec::new();
        for (tutor, state) in &mut self.tutors {
            let before = state.pending_calls.len();
            state.pending_calls.retain(|c| c.student != student);
            if state.pending_calls.len() != before {
                affected.push(tutor.clone());
            }
        }
        affected
    }

    /// Presence rows for every tutor, sorted by username.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TutorPresence> {
        self.tutors
            .iter()
            .map(|(username, state)| presence_row(username, state))
            .collect()
    }

    /// Presence row for a single tutor.
    #[must_use]
    pub fn presence(&self, username: &str) -> Option<TutorPresence> {
        self.tutors
            .get_key_value(username)
            .map(|(username, state)| presence_row(username, state))
    }

    fn state_mut(&mut self, username: &str) -> Result<&mut TutorState, HubError> {
        self.tutors
            .get_mut(username)
            .ok_or_else(|| HubError::TutorNotFound(username.to_owned()))
    }
}

fn presence_row(username: &str, state: &TutorState) -> TutorPresence {
    TutorPresence {
        username: username.to_owned(),
        available: state.available,
        pending_calls: state.pending_calls.len(),
    }
}
