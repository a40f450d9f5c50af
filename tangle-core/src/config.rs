//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum number of nodes a single build pass may create.
    ///
    /// `None` means unbounded. Nodes created before the limit is hit stay in
    /// their node tables.
    pub max_build_nodes: Option<usize>,
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Builder-style setter for [`max_build_nodes`](Self::max_build_nodes).
    pub fn with_max_build_nodes(mut self, limit: usize) -> Self {
        self.max_build_nodes = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = RuntimeConfig::from_json("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.max_build_nodes, None);
    }

    #[test]
    fn parses_build_limit() {
        let config = RuntimeConfig::from_json(r#"{"max_build_nodes": 64}"#).unwrap();
        assert_eq!(config.max_build_nodes, Some(64));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(RuntimeConfig::from_json(r#"{"max_build_nodes": "lots"}"#).is_err());
    }
}
