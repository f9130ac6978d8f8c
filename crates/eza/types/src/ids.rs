//! Identity types

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one logical analysis request.
///
/// Generated locally on submission; the backend may echo it (or its own
/// analysis id) on every partial payload of a staged response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(format!("req-{}", Uuid::new_v4()))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("req-"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = RequestId::from("an-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"an-42\"");
    }
}
