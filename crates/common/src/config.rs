use crate::types::SecurityLevel;
use serde::{Deserialize, Serialize};

// Configuration for the toolkit, loaded from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Level used by `init` when none is given on the command line
    pub level: SecurityLevel,
    /// Worker pool size for parallel validation (`None` = logical CPU count)
    pub threads: Option<usize>,
    /// Default `env_logger` filter
    pub log_filter: String,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            level: SecurityLevel::L128,
            threads: None,
            log_filter: "info".to_string(),
        }
    }
}
