//! Digest provider: platform-accelerated SHA-256 with a software fallback.
//!
//! One interface, two interchangeable paths selected at call time. The
//! accelerated backend is used when the CPU exposes the SHA extensions; on
//! absence or any backend failure the self-contained engine in [`crate::sha256`]
//! takes over silently. Callers only ever observe a 64-character lowercase
//! hex digest; which path produced it is never surfaced.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::sha256;

#[derive(Debug, Error)]
#[error("digest computation failed: {0}")]
pub struct DigestError(pub String);

/// A fallible digest primitive preferred over the software engine.
pub trait AcceleratedDigest: Send + Sync {
    fn digest(&self, data: &[u8]) -> Result<[u8; 32], DigestError>;
}

/// `sha2`-backed primitive. The crate dispatches to SHA-NI / NEON at runtime,
/// which is what makes this the accelerated path.
pub struct Sha2Backend;

impl AcceleratedDigest for Sha2Backend {
    fn digest(&self, data: &[u8]) -> Result<[u8; 32], DigestError> {
        use sha2::Digest as _;
        Ok(sha2::Sha256::digest(data).into())
    }
}

/// Probe for a usable accelerated primitive on this CPU.
fn detect_backend() -> Option<Arc<dyn AcceleratedDigest>> {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("sha") {
            return Some(Arc::new(Sha2Backend));
        }
        None
    }
    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("sha2") {
            return Some(Arc::new(Sha2Backend));
        }
        None
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        None
    }
}

pub struct DigestProvider {
    accelerated: Option<Arc<dyn AcceleratedDigest>>,
}

impl DigestProvider {
    /// Provider with whatever acceleration the platform offers.
    pub fn new() -> Self {
        Self {
            accelerated: detect_backend(),
        }
    }

    /// Provider pinned to the software engine.
    pub fn software_only() -> Self {
        Self { accelerated: None }
    }

    /// Provider pinned to a specific accelerated backend.
    pub fn with_backend(backend: Arc<dyn AcceleratedDigest>) -> Self {
        Self {
            accelerated: Some(backend),
        }
    }

    /// SHA-256 of the UTF-8 bytes of `text`, as 64 lowercase hex characters.
    ///
    /// Always resolves; a backend failure falls through to the software
    /// engine, which cannot fail.
    pub async fn digest_hex(&self, text: &str) -> String {
        let data = text.as_bytes();
        if let Some(backend) = &self.accelerated {
            match backend.digest(data) {
                Ok(out) => return hex::encode(out),
                Err(err) => {
                    debug!(error = %err, "accelerated digest failed, using software engine");
                }
            }
        }
        sha256::digest_hex(data)
    }
}

impl Default for DigestProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Seam the unlock gate hashes through. The stock implementation is
/// [`DigestProvider`], which never errors; the `Result` exists so the gate's
/// verification-failed transition stays reachable for injected sources.
#[async_trait]
pub trait DigestSource: Send + Sync {
    async fn digest_hex(&self, text: &str) -> Result<String, DigestError>;
}

#[async_trait]
impl DigestSource for DigestProvider {
    async fn digest_hex(&self, text: &str) -> Result<String, DigestError> {
        Ok(DigestProvider::digest_hex(self, text).await)
    }
}
