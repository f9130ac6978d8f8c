//! Stage aggregation configuration

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::StageRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// How many completed analysis ids are remembered so late duplicates
    /// can be dropped.
    #[serde(default = "default_completed_id_memory")]
    pub completed_id_memory: usize,
}

fn default_completed_id_memory() -> usize {
    1024
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            completed_id_memory: default_completed_id_memory(),
        }
    }
}
