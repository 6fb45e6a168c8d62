//! Protocol faults and the per-node diagnostic log.
//!
//! Faults never abort a tick. The node records them, mirrors them to
//! `tracing` and carries on.

use serde::{Deserialize, Serialize};
use shardsim_env::{EnvError, NodeId};
use thiserror::Error;

/// Recoverable protocol conditions observed by a node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Fault {
    #[error("out of sync: head {head}, received block {received}")]
    OutOfSync { head: u64, received: u64 },

    #[error("gap at block {number} cannot be repaired from uncles")]
    UnrepairableGap { number: u64 },

    #[error("outbound queue still holds {len} sends (limit {limit})")]
    QueueOverflow { len: usize, limit: usize },

    #[error("{validators} validators cannot fill {slots} committee slots")]
    InsufficientValidators { validators: usize, slots: u64 },

    #[error("send to {target} failed: {source}")]
    SendFailed { target: NodeId, source: EnvError },

    #[error("receive from {peer} failed: {source}")]
    ReceiveFailed { peer: NodeId, source: EnvError },
}

impl Fault {
    pub fn severity(&self) -> Severity {
        match self {
            Fault::OutOfSync { .. } => Severity::Info,
            Fault::UnrepairableGap { .. } | Fault::InsufficientValidators { .. } => {
                Severity::Warning
            }
            Fault::QueueOverflow { .. }
            | Fault::SendFailed { .. }
            | Fault::ReceiveFailed { .. } => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One line of a node's diagnostic log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub node: NodeId,
    pub time: u64,
    pub severity: Severity,
    pub message: String,
}

impl LogEntry {
    pub fn from_fault(node: NodeId, time: u64, fault: &Fault) -> Self {
        Self {
            node,
            time,
            severity: fault.severity(),
            message: fault.to_string(),
        }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] t={} {:?}: {}", self.node, self.time, self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_from_fault() {
        let fault = Fault::OutOfSync { head: 7_000_002, received: 7_000_005 };
        let entry = LogEntry::from_fault(NodeId(4), 19, &fault);

        assert_eq!(entry.severity, Severity::Info);
        assert!(entry.message.contains("7000005"));
        assert_eq!(entry.to_string(), format!("[0004] t=19 Info: {}", fault));
    }

    #[test]
    fn test_transport_faults_are_errors() {
        let fault = Fault::SendFailed {
            target: NodeId(2),
            source: EnvError::unreachable(NodeId(2)),
        };
        assert_eq!(fault.severity(), Severity::Error);
        assert!(fault.to_string().contains("unreachable"));
    }
}
