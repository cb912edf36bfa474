use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("allow-list entry {index} is not a 64-character lowercase hex digest")]
    InvalidAllowListEntry { index: usize },

    #[error("token store error: {0}")]
    Store(#[from] StoreError),
}
