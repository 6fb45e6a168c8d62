//! ShardSim Simulation Harness
//!
//! Runs the protocol engine of `shardsim_core` at network scale. Nodes are
//! spread over execution groups, each group ticks on its own tokio task, and
//! the groups meet at a barrier every `sync_time` ticks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimRunner                           │
//! │  ┌───────────────┐  ┌───────────────┐  ┌───────────────┐    │
//! │  │ group 0 task  │  │ group 1 task  │  │ group N task  │    │
//! │  │   Network     │  │   Network     │  │   Network     │    │
//! │  └───────┬───────┘  └───────┬───────┘  └───────┬───────┘    │
//! │          └──────── MemoryTransport ────────────┘            │
//! │          └──────── MemoryRendezvous ───────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use shardsim_sim::SimRunner;
//! use shardsim_core::SimConfig;
//!
//! let outcome = SimRunner::new(SimConfig::default(), 4)
//!     .with_ticks(500)
//!     .run()
//!     .await?;
//! println!("head spread: {}", outcome.stats.head_spread);
//! ```

mod error;
mod exporter;
mod runner;
pub mod scenarios;
mod stats;

pub use error::SimError;
pub use exporter::SimExport;
pub use runner::{SimNetwork, SimOutcome, SimRunner};
pub use scenarios::ScenarioId;
pub use stats::ChainStats;
