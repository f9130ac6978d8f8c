//! Injectable chat session state
//!
//! Chat surfaces share messages, the selected analysis mode and per-request
//! analyses. They go through an explicit [`SessionStore`] handed to whoever
//! needs it, never through ambient global state.

use crate::orchestrator::{Orchestrator, Submission};
use chrono::{DateTime, Utc};
use eza_types::{AnalysisMode, CanonicalResult, RequestId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    /// Analysis request submitted for this message, if any.
    pub request_id: Option<RequestId>,
}

/// Read/write API over shared chat session state.
pub trait SessionStore: Send + Sync {
    fn push_message(&self, message: ChatMessage);
    fn messages(&self) -> Vec<ChatMessage>;

    fn mode(&self) -> AnalysisMode;
    fn set_mode(&self, mode: AnalysisMode);

    fn put_analysis(&self, request_id: RequestId, result: CanonicalResult);
    fn analysis(&self, request_id: &RequestId) -> Option<CanonicalResult>;
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    messages: RwLock<Vec<ChatMessage>>,
    mode: RwLock<AnalysisMode>,
    analyses: RwLock<HashMap<RequestId, CanonicalResult>>,
}

impl MemorySessionStore {
    pub fn new(mode: AnalysisMode) -> Self {
        Self {
            mode: RwLock::new(mode),
            ..Self::default()
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn push_message(&self, message: ChatMessage) {
        self.messages.write().push(message);
    }

    fn messages(&self) -> Vec<ChatMessage> {
        self.messages.read().clone()
    }

    fn mode(&self) -> AnalysisMode {
        *self.mode.read()
    }

    fn set_mode(&self, mode: AnalysisMode) {
        *self.mode.write() = mode;
    }

    fn put_analysis(&self, request_id: RequestId, result: CanonicalResult) {
        self.analyses.write().insert(request_id, result);
    }

    fn analysis(&self, request_id: &RequestId) -> Option<CanonicalResult> {
        self.analyses.read().get(request_id).cloned()
    }
}

/// Sends chat input for analysis in the store's current mode and mirrors
/// every update into the store.
#[derive(Clone)]
pub struct ChatSession {
    store: Arc<dyn SessionStore>,
    orchestrator: Orchestrator,
}

impl ChatSession {
    pub fn new(store: Arc<dyn SessionStore>, orchestrator: Orchestrator) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Record a user message and submit it for analysis.
    pub fn send(&self, content: impl Into<String>) -> Submission {
        let content = content.into();
        let mode = self.store.mode();
        let submission = self.orchestrator.submit(content.clone(), mode);

        self.store.push_message(ChatMessage {
            role: Role::User,
            content,
            sent_at: Utc::now(),
            request_id: Some(submission.request_id.clone()),
        });

        let store = self.store.clone();
        let request_id = submission.request_id.clone();
        let mut updates = submission.updates.clone();
        tokio::spawn(async move {
            loop {
                let current = updates.borrow_and_update().clone();
                let complete = current.is_complete();
                store.put_analysis(request_id.clone(), current);
                if complete || updates.changed().await.is_err() {
                    break;
                }
            }
            debug!(request_id = %request_id, "Session analysis settled");
        });

        submission
    }
}
