// src/core/session.rs — Per-user session state, held in memory only

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::core::types::UserId;
use crate::provider::Message;

/// Step within the image-generation parameter collection.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum FlowState {
    #[default]
    Idle,
    AwaitingPrompt,
    AwaitingNegativePrompt,
    AwaitingGenerationParams,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// USER/ASSISTANT transcript sent to the chat provider, in order.
    pub messages: Vec<Message>,
    pub state: FlowState,
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
}

/// Keyed store of sessions. The router is its only mutator, and the
/// dispatcher guarantees one in-flight event per user.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Session>> {
        // A panic mid-update leaves at worst one stale session behind.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the user's session, created on first access.
    pub fn get(&self, user: UserId) -> Session {
        self.lock().entry(user).or_default().clone()
    }

    /// Replace the user's session with the initial empty value.
    pub fn reset(&self, user: UserId) {
        self.lock().insert(user, Session::default());
    }

    /// Mutate the user's session in place.
    pub fn update<R>(&self, user: UserId, mutation: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.lock();
        mutation(sessions.entry(user).or_default())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
