use crate::keyed::Key;
use crate::scene::{NodeId, NodeKind};
use thiserror::Error;

/// Failures raised inside the scene pipeline.
///
/// None of these are fatal: callers contain them at the item, group or pick
/// scope and log them, so a single bad entity never stalls a pass.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("target group `{0}` has no resolvable targets")]
    MissingGroup(&'static str),
    #[error("no key left after {0}")]
    KeysExhausted(Key),
    #[error("key {0} appears more than once in one collection")]
    DuplicateKey(Key),
    #[error("node update failed for key {key}: {reason}")]
    NodeUpdate { key: Key, reason: String },
    #[error("failed to release resource {handle}: {reason}")]
    ResourceDisposal { handle: u64, reason: String },
    #[error("resource operation failed: {0}")]
    Resource(String),
    #[error("node {0:?} is no longer part of the scene")]
    StaleNode(NodeId),
    #[error("no builder registered for kind {0:?}")]
    UnknownKind(NodeKind),
}

impl SceneError {
    pub fn node_update(key: Key, reason: impl Into<String>) -> Self {
        SceneError::NodeUpdate {
            key,
            reason: reason.into(),
        }
    }
}
