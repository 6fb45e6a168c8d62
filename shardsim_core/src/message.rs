//! Protocol messages exchanged between nodes.

use crate::block::Block;
use serde::{Deserialize, Serialize};
use shardsim_env::NodeId;

/// Every message a node can receive. Handling is an exhaustive match, so a
/// new variant is a compile error until every node knows what to do with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Handshake: `source` wants to be a peer
    NewPeer { source: NodeId },

    /// A main-chain block, freshly mined or relayed
    NewMainBlock { source: NodeId, block: Block },

    /// `source` is missing the main-chain block with this number
    NeedMainBlock { source: NodeId, number: u64 },

    /// A beacon-chain block, freshly proposed or relayed
    NewBeaconBlock { source: NodeId, block: Block },

    /// `source` announces itself as a validator
    NewValidator { source: NodeId },
}

impl Message {
    /// Node that sent this message.
    pub fn source(&self) -> NodeId {
        match self {
            Message::NewPeer { source }
            | Message::NewMainBlock { source, .. }
            | Message::NeedMainBlock { source, .. }
            | Message::NewBeaconBlock { source, .. }
            | Message::NewValidator { source } => *source,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::NewPeer { .. } => "new_peer",
            Message::NewMainBlock { .. } => "new_main_block",
            Message::NeedMainBlock { .. } => "need_main_block",
            Message::NewBeaconBlock { .. } => "new_beacon_block",
            Message::NewValidator { .. } => "new_validator",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_of_every_variant() {
        let messages = [
            Message::NewPeer { source: NodeId(3) },
            Message::NewMainBlock { source: NodeId(3), block: Block::genesis() },
            Message::NeedMainBlock { source: NodeId(3), number: 1 },
            Message::NewBeaconBlock { source: NodeId(3), block: Block::genesis() },
            Message::NewValidator { source: NodeId(3) },
        ];
        assert!(messages.iter().all(|m| m.source() == NodeId(3)));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Message::NewPeer { source: NodeId(1) }.kind(), "new_peer");
        assert_eq!(
            Message::NeedMainBlock { source: NodeId(1), number: 4 }.kind(),
            "need_main_block"
        );
    }
}
