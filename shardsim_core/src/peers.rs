//! Peer Directory - the set of nodes a node gossips with.

use crate::config::{SimConfig, Topology};
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use shardsim_env::NodeId;
use std::collections::BTreeSet;

/// Ordered set of peers. The owner can never be its own peer.
#[derive(Debug, Clone)]
pub struct PeerDirectory {
    owner: NodeId,
    peers: BTreeSet<NodeId>,
}

impl PeerDirectory {
    pub fn new(owner: NodeId) -> Self {
        Self {
            owner,
            peers: BTreeSet::new(),
        }
    }

    /// Adds `peer`. Returns false if it was already known or is the owner.
    pub fn insert(&mut self, peer: NodeId) -> bool {
        peer != self.owner && self.peers.insert(peer)
    }

    pub fn contains(&self, peer: NodeId) -> bool {
        self.peers.contains(&peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.peers.iter().copied()
    }

    /// Up to `count` distinct peers, sampled without replacement.
    pub fn sample(&self, count: usize, rng: &mut impl Rng) -> Vec<NodeId> {
        self.iter().choose_multiple(rng, count.min(self.peers.len()))
    }

    /// One random peer.
    pub fn pick(&self, rng: &mut impl Rng) -> Option<NodeId> {
        self.iter().choose(rng)
    }
}

/// Distinct bootstrap targets for `owner`, drawn uniformly over every valid
/// node id of the run except the owner.
pub fn select_bootstrap_targets(
    owner: NodeId,
    peer_count: usize,
    topology: &Topology,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Vec<NodeId> {
    let mut candidates: Vec<NodeId> = topology
        .all_nodes(config)
        .into_iter()
        .filter(|&id| id != owner)
        .collect();
    candidates.shuffle(rng);
    candidates.truncate(peer_count);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_owner_is_refused() {
        let mut peers = PeerDirectory::new(NodeId(5));
        assert!(!peers.insert(NodeId(5)));
        assert!(peers.insert(NodeId(6)));
        assert!(!peers.insert(NodeId(6)));
        assert_eq!(peers.len(), 1);
        assert!(!peers.contains(NodeId(5)));
    }

    #[test]
    fn test_sample_is_distinct_and_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut peers = PeerDirectory::new(NodeId(0));
        for id in 1..=10 {
            peers.insert(NodeId(id));
        }

        let mut picked = peers.sample(4, &mut rng);
        assert_eq!(picked.len(), 4);
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 4);
        assert!(picked.iter().all(|id| peers.contains(*id)));

        assert_eq!(peers.sample(50, &mut rng).len(), 10);
        assert!(PeerDirectory::new(NodeId(0)).pick(&mut rng).is_none());
    }

    #[test]
    fn test_bootstrap_targets() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let config = SimConfig {
            nodes_per_group: 3,
            max_nodes_per_group: 10,
            ..SimConfig::default()
        };
        let topology = Topology::new(0, 2);

        let targets = select_bootstrap_targets(NodeId(1), 4, &topology, &config, &mut rng);
        assert_eq!(targets.len(), 4);
        assert!(!targets.contains(&NodeId(1)));
        let valid = topology.all_nodes(&config);
        assert!(targets.iter().all(|t| valid.contains(t)));

        let all = select_bootstrap_targets(NodeId(1), 100, &topology, &config, &mut rng);
        assert_eq!(all.len(), 5);
    }
}
