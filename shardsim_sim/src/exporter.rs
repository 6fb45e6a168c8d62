//! JSON exporter for finished runs.

use crate::stats::ChainStats;
use serde::{Deserialize, Serialize};
use shardsim_core::{NodeSummary, SimConfig};
use std::fs::File;
use std::io::Write;

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Run identifier
    pub sim_id: String,

    /// Seed used
    pub seed: u64,

    pub groups: u32,
    pub nodes_per_group: u32,
    pub ticks: u64,

    /// Wall-clock duration of the run
    pub elapsed_ms: u64,

    /// Parameters the run used
    pub config: SimConfig,

    pub stats: ChainStats,

    /// Final state of every node, ordered by id
    pub nodes: Vec<NodeSummary>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, config: &SimConfig, groups: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            sim_id: config.sim_id.clone(),
            seed: config.seed,
            groups,
            nodes_per_group: config.nodes_per_group,
            ticks: config.sim_ticks,
            elapsed_ms: 0,
            config: config.clone(),
            stats: ChainStats::default(),
            nodes: Vec::new(),
        }
    }

    /// Fills in the results of the run.
    pub fn finalize(&mut self, mut nodes: Vec<NodeSummary>, stats: ChainStats, elapsed_ms: u64) {
        nodes.sort_by_key(|n| n.id);
        self.nodes = nodes;
        self.stats = stats;
        self.elapsed_ms = elapsed_ms;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_writes_readable_json() {
        let config = SimConfig::default();
        let mut export = SimExport::new("baseline", &config, 2);
        export.finalize(Vec::new(), ChainStats::default(), 12);

        let path = std::env::temp_dir().join(format!("shardsim-export-{}.json", std::process::id()));
        let path = path.to_string_lossy().to_string();
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: SimExport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.scenario, "baseline");
        assert_eq!(parsed.groups, 2);
        assert_eq!(parsed.config, config);
        std::fs::remove_file(&path).unwrap();
    }
}
