//! Normalizer options

use serde::{Deserialize, Serialize};

/// Options for [`crate::normalize_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Sub-analyses the caller asked for. Each one is present in the
    /// resulting breakdown, as an empty object when the backend omitted it.
    #[serde(default)]
    pub requested_breakdown: Vec<String>,
}

impl NormalizeOptions {
    pub fn with_breakdown<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requested_breakdown: names.into_iter().map(Into::into).collect(),
        }
    }
}
