//! Per-region gate registry.
//!
//! Each protected region gets its own gate instance, keyed by the region's
//! identity; there is no process-wide singleton. `init_region` is idempotent
//! so a second initialization pass over the same region (the original's
//! repeated page-transition hooks) cannot build a duplicate gate.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::GateConfig;
use crate::digest::{DigestProvider, DigestSource};
use crate::error::GateError;
use crate::gate::UnlockGate;
use crate::store::TokenStore;

pub struct GateRegistry {
    store: Arc<dyn TokenStore>,
    digests: Arc<dyn DigestSource>,
    gates: Mutex<HashMap<String, Arc<UnlockGate>>>,
}

impl GateRegistry {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self::with_source(store, Arc::new(DigestProvider::new()))
    }

    pub fn with_source(store: Arc<dyn TokenStore>, digests: Arc<dyn DigestSource>) -> Self {
        Self {
            store,
            digests,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the gate for `region`. A region that is already
    /// initialized keeps its existing gate; the new config is ignored.
    pub fn init_region(&self, region: &str, config: GateConfig) -> Result<Arc<UnlockGate>, GateError> {
        let mut gates = self.gates.lock();
        if let Some(gate) = gates.get(region) {
            return Ok(gate.clone());
        }
        let gate = Arc::new(UnlockGate::with_source(
            config,
            self.store.clone(),
            self.digests.clone(),
        )?);
        gates.insert(region.to_string(), gate.clone());
        Ok(gate)
    }

    pub fn get(&self, region: &str) -> Option<Arc<UnlockGate>> {
        self.gates.lock().get(region).cloned()
    }
}
