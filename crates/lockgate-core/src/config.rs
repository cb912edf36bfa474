//! Caller-owned gate configuration.
//!
//! Field names on the wire are camelCase to match the config object the
//! presentation layer ships (`storageKey`, `keysHash`, ...). Every field has
//! a default so a partial config file is valid.

use serde::{Deserialize, Serialize};

use crate::error::GateError;

pub const DEFAULT_STORAGE_KEY: &str = "lockgate.code";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateConfig {
    /// Key under which the unlock token is persisted.
    pub storage_key: String,
    /// Allow-list of precomputed SHA-256 digests (64 lowercase hex chars
    /// each). Empty means any non-empty credential unlocks.
    pub keys_hash: Vec<String>,
    /// Shown on empty input or mismatch.
    pub error_message: String,
    /// Shown on success.
    pub success_message: String,
    /// Label restored on the submit control after an error.
    pub submit_text: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            keys_hash: vec![],
            error_message: "Wrong code, please try again".to_string(),
            success_message: "Unlocked".to_string(),
            submit_text: "Unlock".to_string(),
        }
    }
}

impl GateConfig {
    /// Reject malformed allow-list entries up front; a digest that is not 64
    /// lowercase hex characters could never match and would silently lock
    /// the region forever.
    pub fn validate(&self) -> Result<(), GateError> {
        for (index, entry) in self.keys_hash.iter().enumerate() {
            let well_formed =
                entry.len() == 64 && entry.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
            if !well_formed {
                return Err(GateError::InvalidAllowListEntry { index });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = GateConfig::default();
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert!(config.keys_hash.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: GateConfig = serde_json::from_str(
            r#"{"keysHash": ["ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"]}"#,
        )
        .unwrap();
        assert_eq!(config.keys_hash.len(), 1);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.submit_text, "Unlock");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_allow_list() {
        let mut config = GateConfig::default();
        config.keys_hash = vec!["not-a-digest".to_string()];
        assert!(matches!(
            config.validate(),
            Err(GateError::InvalidAllowListEntry { index: 0 })
        ));

        // Uppercase hex is rejected rather than normalised.
        config.keys_hash =
            vec!["BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD".to_string()];
        assert!(config.validate().is_err());
    }
}
