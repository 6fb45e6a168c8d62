//! Deterministic per-node random sources.
//!
//! Each node owns a `ChaCha8Rng` derived from the master seed and its
//! position in the run, so a node's draws do not depend on how many other
//! nodes exist or in which order they tick.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shardsim_env::NodeId;

/// Derives the seed of node `node` hosted by `group`.
pub fn node_seed(master_seed: u64, group: u32, node: NodeId) -> u64 {
    master_seed
        .wrapping_mul(0x9e3779b97f4a7c15)
        .wrapping_add(u64::from(group).wrapping_mul(0x3c6ef372fe94f82b))
        .wrapping_add(node.as_u64().wrapping_mul(0x517cc1b727220a95))
}

/// Random source for node `node` hosted by `group`.
pub fn node_rng(master_seed: u64, group: u32, node: NodeId) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(node_seed(master_seed, group, node))
}
