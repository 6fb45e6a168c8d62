//! Transport and rendezvous abstractions for ShardSim nodes.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{NodeId, SendHandle};

/// Point-to-point message channel between simulated nodes.
///
/// Every operation is non-blocking. The protocol engine calls these from
/// inside its tick, so an implementation must never park the caller.
///
/// # Message Flow
///
/// ```text
/// Node A                    Transport                   Node B
///   |                           |                          |
///   |-- send(A, B, msg) ------->|  (handle pending)        |
///   |                           |<------ probe(B) ---------|
///   |                           |------- Some(A) --------->|
///   |                           |<---- receive(B, A) ------|
///   |   (handle complete)       |------- msg ------------->|
/// ```
pub trait Transport<M>: Send + Sync + 'static {
    /// Posts a message without waiting for delivery.
    ///
    /// # Returns
    /// * `Ok(handle)` - Message buffered; `handle` completes once received
    /// * `Err(EnvError::BufferFull)` - Recipient buffer is exhausted
    /// * `Err(EnvError::NodeUnreachable)` - Unknown recipient
    fn send(&self, from: NodeId, to: NodeId, message: M) -> Result<SendHandle, EnvError>;

    /// Returns the source of the oldest message waiting for `node`, if any.
    fn probe(&self, node: NodeId) -> Option<NodeId>;

    /// Takes the oldest message from `source` waiting for `node`.
    ///
    /// Only guaranteed to succeed after `probe` reported `source`.
    fn receive(&self, node: NodeId, source: NodeId) -> Result<M, EnvError>;
}

/// Synchronization points between execution groups.
///
/// These are the only blocking operations of a run: a periodic barrier that
/// bounds drift between groups, and a final gather of per-group results.
#[async_trait]
pub trait Rendezvous<V: Send + 'static>: Send + Sync + 'static {
    /// Waits until every group has reached the barrier.
    async fn barrier(&self);

    /// Contributes `value` from `group`; the root group receives all values
    /// ordered by group index, every other group receives `None`.
    async fn gather(&self, group: u32, value: V) -> Result<Option<Vec<V>>, EnvError>;

    /// Returns the group index receiving gathered values.
    fn root(&self) -> u32 {
        0
    }
}
