//! Unlock gate state machine.
//!
//! One gate governs one protected region. The candidate secret never leaves
//! the process: it is trimmed, digested, and compared against the configured
//! allow-list of digests. A successful match persists an unlock token whose
//! presence, not re-verification, authorizes access on later loads.
//!
//! State machine: `Locked` (initial) -> `Verifying` -> `Unlocked` (terminal)
//! or `Error` (non-terminal; resubmission allowed). Submissions within one
//! gate instance are strictly serialized: a submit while one is in flight
//! gets [`SubmitOutcome::Busy`] instead of queuing or cancelling.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;
use zeroize::Zeroizing;

use crate::config::GateConfig;
use crate::digest::{DigestError, DigestProvider, DigestSource};
use crate::error::GateError;
use crate::store::TokenStore;

/// Token value persisted when the allow-list is empty and any non-empty
/// credential unlocks.
pub const UNLOCK_SENTINEL: &str = "unlocked";

const VERIFY_FAILED_MESSAGE: &str = "Verification failed, please try again";

/// Transient per-instance state; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Verifying,
    Unlocked,
    Error,
}

/// What a submission produced, carrying the configured presentation strings
/// so callers only have to display them. `Rejected` and `Failed` include the
/// label to restore on the re-enabled submit control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Unlocked { message: String },
    EmptyInput { message: String },
    Rejected { message: String, submit_text: String },
    Failed { message: String, submit_text: String },
    Busy,
}

pub struct UnlockGate {
    config: GateConfig,
    store: Arc<dyn TokenStore>,
    digests: Arc<dyn DigestSource>,
    state: Mutex<GateState>,
}

impl UnlockGate {
    /// Build a gate with platform-selected digest acceleration.
    ///
    /// Reads the persisted token once: a non-empty value means the prior
    /// proof is trusted and the gate starts `Unlocked`, with no digest work.
    pub fn new(config: GateConfig, store: Arc<dyn TokenStore>) -> Result<Self, GateError> {
        Self::with_source(config, store, Arc::new(DigestProvider::new()))
    }

    pub fn with_source(
        config: GateConfig,
        store: Arc<dyn TokenStore>,
        digests: Arc<dyn DigestSource>,
    ) -> Result<Self, GateError> {
        config.validate()?;
        let initial = match store.get(&config.storage_key) {
            Ok(Some(token)) if !token.is_empty() => GateState::Unlocked,
            Ok(_) => GateState::Locked,
            Err(err) => {
                // An unreadable store means no proof of prior success.
                warn!(error = %err, "token store read failed, starting locked");
                GateState::Locked
            }
        };
        Ok(Self {
            config,
            store,
            digests,
            state: Mutex::new(initial),
        })
    }

    pub fn state(&self) -> GateState {
        *self.state.lock()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Pure read of persisted state; performs no computation.
    pub fn is_unlocked(&self) -> bool {
        matches!(
            self.store.get(&self.config.storage_key),
            Ok(Some(token)) if !token.is_empty()
        )
    }

    /// Verify `candidate` against the allow-list.
    ///
    /// Never errors: true iff the trimmed credential's digest is in the
    /// allow-list, or the allow-list is empty and the credential is
    /// non-empty. Persists the unlock token as a side effect of a true
    /// result. Recomputes on every call, so repeating a correct credential
    /// is idempotent.
    pub async fn unlock(&self, candidate: &str) -> bool {
        let code = Zeroizing::new(candidate.trim().to_string());
        if code.is_empty() {
            return false;
        }
        match self.verify(&code).await {
            Ok(Some(token)) => {
                self.persist_token(&token);
                *self.state.lock() = GateState::Unlocked;
                true
            }
            Ok(None) => {
                self.demote_to_error();
                false
            }
            Err(err) => {
                warn!(error = %err, "digest computation failed");
                self.demote_to_error();
                false
            }
        }
    }

    /// Drive the state machine for one submission.
    ///
    /// Empty input is rejected before any state transition or digest work.
    /// While a verification is in flight further submissions get `Busy`.
    /// Once the gate is `Unlocked` the state is terminal and submissions
    /// short-circuit to success: token presence is the sole authority.
    pub async fn submit(&self, candidate: &str) -> SubmitOutcome {
        let code = Zeroizing::new(candidate.trim().to_string());
        {
            let mut state = self.state.lock();
            match *state {
                GateState::Unlocked => {
                    return SubmitOutcome::Unlocked {
                        message: self.config.success_message.clone(),
                    };
                }
                GateState::Verifying => return SubmitOutcome::Busy,
                GateState::Locked | GateState::Error => {
                    if code.is_empty() {
                        // Stay in Locked/Error; no digest computation.
                        return SubmitOutcome::EmptyInput {
                            message: self.config.error_message.clone(),
                        };
                    }
                    *state = GateState::Verifying;
                }
            }
        }

        match self.verify(&code).await {
            Ok(Some(token)) => {
                self.persist_token(&token);
                *self.state.lock() = GateState::Unlocked;
                SubmitOutcome::Unlocked {
                    message: self.config.success_message.clone(),
                }
            }
            Ok(None) => {
                *self.state.lock() = GateState::Error;
                SubmitOutcome::Rejected {
                    message: self.config.error_message.clone(),
                    submit_text: self.config.submit_text.clone(),
                }
            }
            Err(err) => {
                warn!(error = %err, "digest computation failed");
                *self.state.lock() = GateState::Error;
                SubmitOutcome::Failed {
                    message: VERIFY_FAILED_MESSAGE.to_string(),
                    submit_text: self.config.submit_text.clone(),
                }
            }
        }
    }

    /// Drop the persisted token, forcing re-verification on the next load.
    pub fn reset(&self) -> Result<(), GateError> {
        self.store.remove(&self.config.storage_key)?;
        *self.state.lock() = GateState::Locked;
        Ok(())
    }

    /// Returns the token to persist on success, `None` on mismatch. The
    /// credential must already be trimmed and non-empty.
    async fn verify(&self, code: &str) -> Result<Option<String>, DigestError> {
        if self.config.keys_hash.is_empty() {
            return Ok(Some(UNLOCK_SENTINEL.to_string()));
        }
        let digest = self.digests.digest_hex(code).await?;
        if self.config.keys_hash.iter().any(|entry| *entry == digest) {
            Ok(Some(digest))
        } else {
            Ok(None)
        }
    }

    /// A persist failure is swallowed: the unlock holds for this session
    /// but will not survive a reload.
    fn persist_token(&self, token: &str) {
        if let Err(err) = self.store.set(&self.config.storage_key, token) {
            warn!(
                key = %self.config.storage_key,
                error = %err,
                "unlock token persist failed, unlock is session-only"
            );
        }
    }

    fn demote_to_error(&self) {
        let mut state = self.state.lock();
        if *state != GateState::Unlocked {
            *state = GateState::Error;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_STORAGE_KEY as DEFAULT_KEY;
    use crate::sha256;
    use crate::store::MemoryTokenStore;

    fn config_with_keys(keys: Vec<String>) -> GateConfig {
        GateConfig {
            keys_hash: keys,
            ..GateConfig::default()
        }
    }

    fn gate(keys: Vec<String>) -> UnlockGate {
        UnlockGate::new(config_with_keys(keys), Arc::new(MemoryTokenStore::new())).unwrap()
    }

    #[tokio::test]
    async fn empty_allow_list_unlocks_on_any_nonempty_code() {
        let gate = gate(vec![]);
        assert!(!gate.is_unlocked());
        assert!(gate.unlock("anything").await);
        assert!(gate.is_unlocked());
        assert_eq!(gate.state(), GateState::Unlocked);
    }

    #[tokio::test]
    async fn whitespace_only_is_rejected_before_computation() {
        let gate = gate(vec![]);
        assert!(!gate.unlock("   ").await);
        assert!(!gate.is_unlocked());
        // Never entered Verifying.
        assert_eq!(gate.state(), GateState::Locked);
    }

    #[tokio::test]
    async fn mismatch_then_match() {
        let gate = gate(vec![sha256::digest_hex(b"letmein")]);

        assert!(!gate.unlock("wrong").await);
        assert!(!gate.is_unlocked());
        assert_eq!(gate.state(), GateState::Error);

        assert!(gate.unlock("letmein").await);
        assert!(gate.is_unlocked());
    }

    #[tokio::test]
    async fn credential_is_trimmed_before_digesting() {
        let gate = gate(vec![sha256::digest_hex(b"letmein")]);
        assert!(gate.unlock("  letmein  ").await);
    }

    #[tokio::test]
    async fn unlock_is_idempotent() {
        let store = Arc::new(MemoryTokenStore::new());
        let expected = sha256::digest_hex(b"letmein");
        let gate =
            UnlockGate::new(config_with_keys(vec![expected.clone()]), store.clone()).unwrap();

        assert!(gate.unlock("letmein").await);
        assert_eq!(
            store.get(DEFAULT_KEY).unwrap().as_deref(),
            Some(expected.as_str())
        );
        assert!(gate.unlock("letmein").await);
        assert_eq!(
            store.get(DEFAULT_KEY).unwrap().as_deref(),
            Some(expected.as_str())
        );
    }

    #[tokio::test]
    async fn persisted_sentinel_for_empty_allow_list() {
        let store = Arc::new(MemoryTokenStore::new());
        let gate = UnlockGate::new(config_with_keys(vec![]), store.clone()).unwrap();
        assert!(gate.unlock("anything").await);
        assert_eq!(store.get(DEFAULT_KEY).unwrap().as_deref(), Some(UNLOCK_SENTINEL));
    }

    #[tokio::test]
    async fn submit_outcomes_carry_configured_messages() {
        let gate = gate(vec![sha256::digest_hex(b"letmein")]);
        let config = gate.config().clone();

        match gate.submit("").await {
            SubmitOutcome::EmptyInput { message } => assert_eq!(message, config.error_message),
            other => panic!("expected EmptyInput, got {other:?}"),
        }
        assert_eq!(gate.state(), GateState::Locked);

        match gate.submit("wrong").await {
            SubmitOutcome::Rejected {
                message,
                submit_text,
            } => {
                assert_eq!(message, config.error_message);
                assert_eq!(submit_text, config.submit_text);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert_eq!(gate.state(), GateState::Error);

        match gate.submit("letmein").await {
            SubmitOutcome::Unlocked { message } => assert_eq!(message, config.success_message),
            other => panic!("expected Unlocked, got {other:?}"),
        }

        // Unlocked is terminal; a further submit short-circuits.
        match gate.submit("wrong").await {
            SubmitOutcome::Unlocked { .. } => {}
            other => panic!("expected Unlocked short-circuit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn storage_failure_degrades_to_session_unlock() {
        let store = Arc::new(MemoryTokenStore::failing_writes());
        let gate = UnlockGate::new(config_with_keys(vec![]), store.clone()).unwrap();

        assert!(gate.unlock("anything").await);
        // Session state is unlocked, durable state is not.
        assert_eq!(gate.state(), GateState::Unlocked);
        assert!(!gate.is_unlocked());
    }

    #[tokio::test]
    async fn prior_token_unlocks_without_computation() {
        struct PanickingSource;

        #[async_trait::async_trait]
        impl DigestSource for PanickingSource {
            async fn digest_hex(&self, _text: &str) -> Result<String, DigestError> {
                panic!("digest must not be computed when a token exists");
            }
        }

        let store = Arc::new(MemoryTokenStore::new());
        store.set(DEFAULT_KEY, UNLOCK_SENTINEL).unwrap();

        let gate = UnlockGate::with_source(
            config_with_keys(vec![sha256::digest_hex(b"letmein")]),
            store,
            Arc::new(PanickingSource),
        )
        .unwrap();
        assert_eq!(gate.state(), GateState::Unlocked);
        assert!(gate.is_unlocked());
    }

    #[tokio::test]
    async fn failing_digest_source_reaches_error_state() {
        struct FailingSource;

        #[async_trait::async_trait]
        impl DigestSource for FailingSource {
            async fn digest_hex(&self, _text: &str) -> Result<String, DigestError> {
                Err(DigestError("injected".into()))
            }
        }

        let gate = UnlockGate::with_source(
            config_with_keys(vec![sha256::digest_hex(b"letmein")]),
            Arc::new(MemoryTokenStore::new()),
            Arc::new(FailingSource),
        )
        .unwrap();

        match gate.submit("letmein").await {
            SubmitOutcome::Failed { submit_text, .. } => {
                assert_eq!(submit_text, gate.config().submit_text)
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(gate.state(), GateState::Error);
        assert!(!gate.is_unlocked());
    }

    #[tokio::test]
    async fn reset_locks_again() {
        let gate = gate(vec![]);
        assert!(gate.unlock("anything").await);
        gate.reset().unwrap();
        assert!(!gate.is_unlocked());
        assert_eq!(gate.state(), GateState::Locked);
    }

    #[tokio::test]
    async fn malformed_allow_list_rejected_at_construction() {
        let result = UnlockGate::new(
            config_with_keys(vec!["bogus".to_string()]),
            Arc::new(MemoryTokenStore::new()),
        );
        assert!(matches!(
            result,
            Err(GateError::InvalidAllowListEntry { index: 0 })
        ));
    }
}
