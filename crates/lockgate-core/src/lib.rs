//! lockgate-core — credential-gated content unlock
//!
//! Proves knowledge of a secret without transmitting it anywhere: the
//! candidate code is digested locally and compared against an allow-list of
//! precomputed SHA-256 digests; a match persists an unlock token whose mere
//! presence authorizes access on later loads.
//!
//! The scheme is honesty-based by design: a determined local user can read
//! the allow-list digests and bypass the gate. It keeps honest readers out
//! of a protected region, nothing more.
//!
//! # Module layout
//! - `sha256`   — self-contained SHA-256, the software digest path
//! - `digest`   — provider choosing accelerated vs software at call time
//! - `config`   — caller-owned gate configuration
//! - `store`    — durable token storage seam (file-backed + in-memory)
//! - `gate`     — the Locked/Verifying/Unlocked/Error state machine
//! - `registry` — per-region gate instances with idempotent init
//! - `paths`    — default data directory resolution
//! - `error`    — unified error type

pub mod config;
pub mod digest;
pub mod error;
pub mod gate;
pub mod paths;
pub mod registry;
pub mod sha256;
pub mod store;

pub use config::GateConfig;
pub use digest::{AcceleratedDigest, DigestError, DigestProvider, DigestSource};
pub use error::GateError;
pub use gate::{GateState, SubmitOutcome, UnlockGate, UNLOCK_SENTINEL};
pub use registry::GateRegistry;
pub use store::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore};
