//! In-memory implementations of `Transport` and `Rendezvous`.
//!
//! All execution groups of a process share one `MemoryTransport`; each group
//! runs on its own task and meets the others through a `MemoryRendezvous`.

use crate::error::EnvError;
use crate::transport::{Rendezvous, Transport};
use crate::types::{NodeId, SendHandle};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Barrier;

/// Default per-node inbox capacity.
pub const DEFAULT_INBOX_CAPACITY: usize = 4096;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A message sitting in a node's inbox.
#[derive(Debug)]
struct Envelope<M> {
    from: NodeId,
    message: M,
    handle: SendHandle,
}

/// Channel-free transport backed by per-node FIFO inboxes.
///
/// Delivery between a pair of nodes preserves send order. A send completes
/// when the recipient receives it, so handles left pending signal a slow
/// consumer rather than a lost message.
pub struct MemoryTransport<M> {
    /// Pending messages per registered node
    inboxes: Mutex<HashMap<NodeId, VecDeque<Envelope<M>>>>,

    /// Maximum number of undelivered messages per inbox
    capacity: usize,
}

impl<M> MemoryTransport<M> {
    /// Creates a transport whose inboxes hold at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            inboxes: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Creates a transport pre-registered with `nodes`.
    pub fn with_nodes(capacity: usize, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let transport = Self::new(capacity);
        for node in nodes {
            transport.register(node);
        }
        transport
    }

    /// Registers an inbox for `node`. Registering twice is a no-op.
    pub fn register(&self, node: NodeId) {
        lock(&self.inboxes).entry(node).or_default();
    }

    /// Returns the number of messages waiting for `node`.
    pub fn pending(&self, node: NodeId) -> usize {
        lock(&self.inboxes).get(&node).map_or(0, VecDeque::len)
    }

    /// Returns the number of messages waiting across all inboxes.
    pub fn total_pending(&self) -> usize {
        lock(&self.inboxes).values().map(VecDeque::len).sum()
    }

    /// Returns the configured inbox capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<M> Default for MemoryTransport<M> {
    fn default() -> Self {
        Self::new(DEFAULT_INBOX_CAPACITY)
    }
}

impl<M: Send + 'static> Transport<M> for MemoryTransport<M> {
    fn send(&self, from: NodeId, to: NodeId, message: M) -> Result<SendHandle, EnvError> {
        let mut inboxes = lock(&self.inboxes);
        let inbox = inboxes.get_mut(&to).ok_or_else(|| EnvError::unreachable(to))?;

        if inbox.len() >= self.capacity {
            return Err(EnvError::buffer_full(to, self.capacity));
        }

        let handle = SendHandle::new();
        inbox.push_back(Envelope {
            from,
            message,
            handle: handle.clone(),
        });
        Ok(handle)
    }

    fn probe(&self, node: NodeId) -> Option<NodeId> {
        lock(&self.inboxes)
            .get(&node)
            .and_then(|inbox| inbox.front())
            .map(|envelope| envelope.from)
    }

    fn receive(&self, node: NodeId, source: NodeId) -> Result<M, EnvError> {
        let mut inboxes = lock(&self.inboxes);
        let inbox = inboxes
            .get_mut(&node)
            .ok_or_else(|| EnvError::unreachable(node))?;

        let position = inbox
            .iter()
            .position(|envelope| envelope.from == source)
            .ok_or_else(|| EnvError::nothing_pending(node, source))?;

        match inbox.remove(position) {
            Some(envelope) => {
                envelope.handle.complete();
                Ok(envelope.message)
            }
            None => Err(EnvError::nothing_pending(node, source)),
        }
    }
}

/// Barrier and gather across a fixed number of execution groups.
pub struct MemoryRendezvous<V> {
    /// Number of participating groups
    groups: u32,

    /// Shared rendezvous point
    barrier: Barrier,

    /// Values contributed to the gather in progress
    slots: Mutex<Vec<Option<V>>>,
}

impl<V> MemoryRendezvous<V> {
    /// Creates a rendezvous for `groups` participants.
    pub fn new(groups: u32) -> Self {
        let groups = groups.max(1);
        Self {
            groups,
            barrier: Barrier::new(groups as usize),
            slots: Mutex::new((0..groups).map(|_| None).collect()),
        }
    }

    /// Returns the number of participating groups.
    pub fn groups(&self) -> u32 {
        self.groups
    }
}

#[async_trait]
impl<V: Send + 'static> Rendezvous<V> for MemoryRendezvous<V> {
    async fn barrier(&self) {
        self.barrier.wait().await;
    }

    async fn gather(&self, group: u32, value: V) -> Result<Option<Vec<V>>, EnvError> {
        if group >= self.groups {
            return Err(EnvError::RendezvousError(format!(
                "group {} outside 0..{}",
                group, self.groups
            )));
        }

        lock(&self.slots)[group as usize] = Some(value);
        self.barrier.wait().await;

        let gathered = if group == self.root() {
            let values: Option<Vec<V>> = lock(&self.slots).iter_mut().map(Option::take).collect();
            Some(values.ok_or_else(|| {
                EnvError::RendezvousError("a group skipped the gather".to_string())
            }))
        } else {
            None
        };

        // Keeps a fast group from refilling its slot before the root has read it.
        self.barrier.wait().await;

        gathered.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ids(raw: &[u64]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn test_send_probe_receive() {
        let transport = MemoryTransport::with_nodes(8, ids(&[1, 2]));

        let handle = transport.send(NodeId(1), NodeId(2), "hello").unwrap();
        assert!(!handle.is_complete());
        assert_eq!(transport.probe(NodeId(2)), Some(NodeId(1)));
        assert_eq!(transport.probe(NodeId(1)), None);

        let message = transport.receive(NodeId(2), NodeId(1)).unwrap();
        assert_eq!(message, "hello");
        assert!(handle.is_complete());
        assert_eq!(transport.pending(NodeId(2)), 0);
    }

    #[test]
    fn test_pairwise_order_preserved() {
        let transport = MemoryTransport::with_nodes(8, ids(&[1, 2, 3]));

        transport.send(NodeId(1), NodeId(3), 10).unwrap();
        transport.send(NodeId(2), NodeId(3), 20).unwrap();
        transport.send(NodeId(1), NodeId(3), 11).unwrap();

        assert_eq!(transport.receive(NodeId(3), NodeId(1)).unwrap(), 10);
        assert_eq!(transport.receive(NodeId(3), NodeId(1)).unwrap(), 11);
        assert_eq!(transport.probe(NodeId(3)), Some(NodeId(2)));
    }

    #[test]
    fn test_unknown_target_is_unreachable() {
        let transport = MemoryTransport::with_nodes(8, ids(&[1]));
        let err = transport.send(NodeId(1), NodeId(9), ()).unwrap_err();
        assert!(matches!(err, EnvError::NodeUnreachable(_)));
    }

    #[test]
    fn test_inbox_capacity_is_finite() {
        let transport = MemoryTransport::with_nodes(2, ids(&[1, 2]));
        transport.send(NodeId(1), NodeId(2), 1).unwrap();
        transport.send(NodeId(1), NodeId(2), 2).unwrap();

        let err = transport.send(NodeId(1), NodeId(2), 3).unwrap_err();
        assert!(matches!(err, EnvError::BufferFull { capacity: 2, .. }));
        assert_eq!(transport.total_pending(), 2);
    }

    #[test]
    fn test_receive_without_message_fails() {
        let transport: MemoryTransport<u8> = MemoryTransport::with_nodes(2, ids(&[1, 2]));
        let err = transport.receive(NodeId(2), NodeId(1)).unwrap_err();
        assert!(matches!(err, EnvError::NothingPending { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_gather_collects_at_root() {
        let rendezvous = Arc::new(MemoryRendezvous::new(3));

        let tasks: Vec<_> = (0..3u32)
            .map(|group| {
                let rendezvous = Arc::clone(&rendezvous);
                tokio::spawn(async move {
                    rendezvous.barrier().await;
                    rendezvous.gather(group, group * 10).await
                })
            })
            .collect();

        let mut root_values = None;
        for (group, task) in tasks.into_iter().enumerate() {
            let gathered = task.await.unwrap().unwrap();
            if group == 0 {
                root_values = gathered;
            } else {
                assert!(gathered.is_none());
            }
        }

        assert_eq!(root_values, Some(vec![0, 10, 20]));
    }

    #[tokio::test]
    async fn test_gather_rejects_unknown_group() {
        let rendezvous = MemoryRendezvous::new(1);
        assert!(rendezvous.gather(4, ()).await.is_err());
    }
}
