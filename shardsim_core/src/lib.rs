//! ShardSim Core - per-node protocol engine of a sharded blockchain simulator
//!
//! Every simulated node runs the same engine:
//! 1. **Peer discovery**: optimistic handshakes, gossip to a random subset of peers
//! 2. **Main chain**: proof-of-work style mining with gap filling and reorganization
//! 3. **Beacon chain**: slot proposals by committees sampled from the validator set
//!
//! Nodes only reach each other through a [`shardsim_env::Transport`], so the
//! same engine runs over any substrate the harness provides.

pub mod block;
pub mod chain;
pub mod committee;
pub mod config;
pub mod diagnostics;
pub mod message;
pub mod metrics;
pub mod network;
pub mod node;
pub mod outbound;
pub mod peers;
pub mod rng;

// Re-export key types for convenience
pub use block::{Block, BlockId, GENESIS_NUMBER};
pub use chain::{Admission, ChainError, ChainStore, ForkRule, Gap};
pub use committee::{initial_seed, next_seed, shuffle, split_committees, EpochSchedule, ScheduleEvent};
pub use config::{ConfigError, SimConfig, Topology};
pub use diagnostics::{Fault, LogEntry, Severity};
pub use message::Message;
pub use metrics::MessageCounter;
pub use network::{Network, NodeSummary};
pub use node::NodeEngine;
pub use outbound::{DrainReport, OutboundQueue, SendStatus};
pub use peers::{select_bootstrap_targets, PeerDirectory};
pub use rng::node_rng;
