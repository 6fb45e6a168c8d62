//! Preset parameter sets for common experiments.

use crate::error::SimError;
use shardsim_core::SimConfig;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Default parameters: mining and beacon proposals together
    Baseline,

    /// Main chain only, no validators
    MiningOnly,

    /// Beacon chain only, every node validates
    Beacon,

    /// Small outbound queues and wide gossip
    Congested,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Baseline,
            ScenarioId::MiningOnly,
            ScenarioId::Beacon,
            ScenarioId::Congested,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "baseline",
            ScenarioId::MiningOnly => "mining_only",
            ScenarioId::Beacon => "beacon",
            ScenarioId::Congested => "congested",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "Mining and beacon proposals with default ratios",
            ScenarioId::MiningOnly => "Proof-of-work main chain without validators",
            ScenarioId::Beacon => "Every node validates, nobody mines",
            ScenarioId::Congested => "Tiny outbound queues under wide gossip, sends get dropped",
        }
    }

    /// Applies the scenario's overrides on top of `config`.
    pub fn apply(&self, config: SimConfig) -> SimConfig {
        match self {
            ScenarioId::Baseline => config,
            ScenarioId::MiningOnly => SimConfig {
                validator_ratio: 0,
                ..config
            },
            ScenarioId::Beacon => SimConfig {
                miner_ratio: 0,
                validator_ratio: 100,
                slot_duration: 4,
                epoch_length: 4,
                ..config
            },
            ScenarioId::Congested => SimConfig {
                max_out_queue: 4,
                drain_budget: 2,
                max_receive: 1,
                max_broadcast: 8,
                peer_count: 8,
                miner_slot_length: 2,
                ..config
            },
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" | "default" => Ok(ScenarioId::Baseline),
            "mining_only" | "miningonly" | "mining" => Ok(ScenarioId::MiningOnly),
            "beacon" => Ok(ScenarioId::Beacon),
            "congested" => Ok(ScenarioId::Congested),
            _ => Err(SimError::UnknownScenario(s.to_string())),
        }
    }
}
