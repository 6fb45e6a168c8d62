//! Simulation parameters shared by every node of a run.

use serde::{Deserialize, Serialize};
use shardsim_env::{NodeId, DEFAULT_INBOX_CAPACITY};
use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: u64,
        value: u64,
    },

    #[error("{field} is a percentage, got {value}")]
    NotAPercentage { field: &'static str, value: u32 },

    #[error("nodes_per_group ({nodes}) exceeds max_nodes_per_group ({max})")]
    GroupTooLarge { nodes: u32, max: u32 },
}

/// Parameters of one simulation run.
///
/// Missing fields in a config file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Nodes simulated by each execution group
    pub nodes_per_group: u32,

    /// Id stride between groups; node ids are `group * stride + offset`
    pub max_nodes_per_group: u32,

    /// Number of ticks to simulate
    pub sim_ticks: u64,

    /// Ticks per beacon slot
    pub slot_duration: u64,

    /// Expected ticks between main-chain blocks across the whole network
    pub miner_slot_length: u64,

    /// Percentage of nodes that mine
    pub miner_ratio: u32,

    /// Peers reached by one broadcast
    pub max_broadcast: usize,

    /// Messages a node reads per tick
    pub max_receive: usize,

    /// Outbound sends a node keeps in flight before forcing them out
    pub max_out_queue: usize,

    /// Forced completion tests per drain
    pub drain_budget: usize,

    /// Percentage of nodes that validate
    pub validator_ratio: u32,

    /// Slots per epoch, and committees per epoch
    pub epoch_length: u64,

    /// Peers contacted at bootstrap
    pub peer_count: usize,

    /// Ticks between cross-group barriers
    pub sync_time: u64,

    /// Undelivered messages a node's inbox can hold
    pub inbox_capacity: usize,

    /// Master seed for every node's random source
    pub seed: u64,

    /// Run identifier; also seeds the beacon committees
    pub sim_id: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nodes_per_group: 16,
            max_nodes_per_group: 100,
            sim_ticks: 1000,
            slot_duration: 16,
            miner_slot_length: 16,
            miner_ratio: 50,
            max_broadcast: 4,
            max_receive: 8,
            max_out_queue: 50,
            drain_budget: 8,
            validator_ratio: 50,
            epoch_length: 4,
            peer_count: 4,
            sync_time: 10,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            seed: 42,
            sim_id: "shardsim".to_string(),
        }
    }
}

impl SimConfig {
    /// Checks the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let at_least_one = [
            ("nodes_per_group", u64::from(self.nodes_per_group)),
            ("slot_duration", self.slot_duration),
            ("miner_slot_length", self.miner_slot_length),
            ("max_receive", self.max_receive as u64),
            ("drain_budget", self.drain_budget as u64),
            ("epoch_length", self.epoch_length),
            ("sync_time", self.sync_time),
            ("inbox_capacity", self.inbox_capacity as u64),
        ];
        for (field, value) in at_least_one {
            if value < 1 {
                return Err(ConfigError::TooSmall { field, min: 1, value });
            }
        }

        for (field, value) in [
            ("miner_ratio", self.miner_ratio),
            ("validator_ratio", self.validator_ratio),
        ] {
            if value > 100 {
                return Err(ConfigError::NotAPercentage { field, value });
            }
        }

        if self.nodes_per_group > self.max_nodes_per_group {
            return Err(ConfigError::GroupTooLarge {
                nodes: self.nodes_per_group,
                max: self.max_nodes_per_group,
            });
        }
        Ok(())
    }

    /// Network-wide mining weight: the expected number of miners, at least 1.
    pub fn total_miner_weight(&self, group_count: u32) -> u64 {
        let nodes = u64::from(group_count) * u64::from(self.nodes_per_group);
        (nodes * u64::from(self.miner_ratio) / 100).max(1)
    }
}

/// Where a node sits among the execution groups of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub group: u32,
    pub group_count: u32,
}

impl Topology {
    pub fn new(group: u32, group_count: u32) -> Self {
        Self { group, group_count }
    }

    /// A single-group run.
    pub fn single() -> Self {
        Self::new(0, 1)
    }

    /// Total number of nodes across all groups.
    pub fn total_nodes(&self, config: &SimConfig) -> u64 {
        u64::from(self.group_count) * u64::from(config.nodes_per_group)
    }

    /// Every valid node id of the run, in ascending order.
    pub fn all_nodes(&self, config: &SimConfig) -> Vec<NodeId> {
        (0..self.group_count)
            .flat_map(|group| {
                (0..config.nodes_per_group)
                    .map(move |offset| NodeId::from_parts(group, offset, config.max_nodes_per_group))
            })
            .collect()
    }

    /// Ids of the nodes hosted by this group.
    pub fn local_nodes(&self, config: &SimConfig) -> Vec<NodeId> {
        (0..config.nodes_per_group)
            .map(|offset| NodeId::from_parts(self.group, offset, config.max_nodes_per_group))
            .collect()
    }
}
