//! Common types for the ShardSim environment abstraction.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unique identifier for a simulated node.
///
/// Identifiers are laid out per execution group: node `offset` of group `g`
/// is `g * stride + offset`, where `stride` is the maximum number of nodes a
/// group may host. This keeps ids globally unique without coordination.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Creates a NodeId from its group index and local offset.
    pub fn from_parts(group: u32, offset: u32, stride: u32) -> Self {
        Self(u64::from(group) * u64::from(stride) + u64::from(offset))
    }

    /// Returns the execution group hosting this node.
    pub fn group(&self, stride: u32) -> u32 {
        (self.0 / u64::from(stride.max(1))) as u32
    }

    /// Returns the node's offset inside its group.
    pub fn offset(&self, stride: u32) -> u32 {
        (self.0 % u64::from(stride.max(1))) as u32
    }

    /// Returns the raw numeric id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Completion handle for a non-blocking send.
///
/// The transport flips the flag once the recipient has taken the message
/// out of its inbox. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct SendHandle {
    delivered: Arc<AtomicBool>,
}

impl SendHandle {
    /// Creates a handle that has not completed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle that is already complete.
    pub fn completed() -> Self {
        let handle = Self::new();
        handle.complete();
        handle
    }

    /// Returns true once the message has been received.
    pub fn is_complete(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }

    /// Marks the send as complete.
    pub fn complete(&self) {
        self.delivered.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_layout() {
        let id = NodeId::from_parts(3, 7, 100);
        assert_eq!(id, NodeId(307));
        assert_eq!(id.group(100), 3);
        assert_eq!(id.offset(100), 7);
    }

    #[test]
    fn test_node_id_display_is_padded() {
        assert_eq!(NodeId(7).to_string(), "0007");
    }

    #[test]
    fn test_send_handle_clones_share_state() {
        let handle = SendHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_complete());

        handle.complete();
        assert!(clone.is_complete());
        assert!(SendHandle::completed().is_complete());
    }
}
