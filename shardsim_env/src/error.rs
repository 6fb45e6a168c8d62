//! Error types for the ShardSim environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvError {
    /// Target inbox is at capacity
    #[error("Inbox of node {node} is full ({capacity} messages)")]
    BufferFull { node: String, capacity: usize },

    /// Target node was never registered with the transport
    #[error("Node unreachable: {0}")]
    NodeUnreachable(String),

    /// Nothing from the requested source is waiting
    #[error("No message from {from} pending for {node}")]
    NothingPending { node: String, from: String },

    /// Rendezvous operation failed
    #[error("Rendezvous error: {0}")]
    RendezvousError(String),
}

impl EnvError {
    /// Creates an unreachable error.
    pub fn unreachable(node: impl std::fmt::Display) -> Self {
        Self::NodeUnreachable(node.to_string())
    }

    /// Creates a buffer-full error.
    pub fn buffer_full(node: impl std::fmt::Display, capacity: usize) -> Self {
        Self::BufferFull {
            node: node.to_string(),
            capacity,
        }
    }

    /// Creates a nothing-pending error.
    pub fn nothing_pending(node: impl std::fmt::Display, from: impl std::fmt::Display) -> Self {
        Self::NothingPending {
            node: node.to_string(),
            from: from.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_nothing_pending_message() {
        let err = EnvError::nothing_pending("0003", "0007");
        assert_eq!(err.to_string(), "No message from 0007 pending for 0003");
        assert!(err.source().is_none());
        assert_eq!(
            err,
            EnvError::NothingPending {
                node: "0003".to_string(),
                from: "0007".to_string(),
            }
        );
    }
}
