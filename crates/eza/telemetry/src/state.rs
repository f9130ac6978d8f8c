//! Connection state machine
//!
//! ```text
//! Disconnected --connect--> Connecting --opened--> Connected
//!      ^                        |                      |
//!      +------connect_failed----+---------lost---------+
//! ```
//!
//! There is no terminal state: the client keeps cycling until torn down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection attempt starts.
    Connect,
    /// The stream opened.
    Opened,
    /// The attempt failed before the stream opened.
    ConnectFailed(String),
    /// An open stream errored or closed.
    Lost(String),
    /// The owner tore the client down.
    Teardown,
}

impl ConnectionEvent {
    fn name(&self) -> &'static str {
        match self {
            ConnectionEvent::Connect => "connect",
            ConnectionEvent::Opened => "opened",
            ConnectionEvent::ConnectFailed(_) => "connect_failed",
            ConnectionEvent::Lost(_) => "lost",
            ConnectionEvent::Teardown => "teardown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid connection transition: {event} while {from}")]
pub struct TransitionError {
    pub from: ConnectionState,
    pub event: &'static str,
}

/// Inspectable reconnect state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    /// Attempts since the last successful open.
    attempts: u32,
    /// Streams opened over the client's lifetime.
    connections: u64,
    last_error: Option<String>,
    changed_at: DateTime<Utc>,
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            connections: 0,
            last_error: None,
            changed_at: Utc::now(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn connections(&self) -> u64 {
        self.connections
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    /// Apply an event, returning the new state.
    pub fn apply(&mut self, event: ConnectionEvent) -> Result<ConnectionState, TransitionError> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        let next = match (self.state, &event) {
            (S::Disconnected, E::Connect) => {
                self.attempts = self.attempts.saturating_add(1);
                S::Connecting
            }
            (S::Connecting, E::Opened) => {
                self.attempts = 0;
                self.connections += 1;
                self.last_error = None;
                S::Connected
            }
            (S::Connecting, E::ConnectFailed(reason)) | (S::Connected, E::Lost(reason)) => {
                self.last_error = Some(reason.clone());
                S::Disconnected
            }
            (_, E::Teardown) => S::Disconnected,
            (from, event) => {
                return Err(TransitionError {
                    from,
                    event: event.name(),
                })
            }
        };

        self.state = next;
        self.changed_at = Utc::now();
        Ok(next)
    }
}
