//! Run-wide chain statistics computed from node summaries.

use serde::{Deserialize, Serialize};
use shardsim_core::NodeSummary;
use std::collections::BTreeMap;

/// Aggregate view of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainStats {
    pub nodes: usize,
    pub miners: usize,
    pub validators: usize,

    /// Mean ticks between consecutive main-chain blocks, averaged over nodes
    pub mean_block_interval: Option<f64>,

    /// Uncles per main-chain block, over all nodes
    pub uncle_rate: f64,

    pub min_head: u64,
    pub max_head: u64,
    pub head_spread: u64,

    pub blocks_mined: u64,
    pub beacon_proposed: u64,

    /// Beacon blocks per proposer, counted on the longest beacon chain
    pub beacon_proposers: BTreeMap<u64, u64>,

    pub messages_sent: u64,
    pub messages_received: u64,
    pub lost_sends: u64,
    pub faults: usize,
}

impl ChainStats {
    pub fn from_summaries(summaries: &[NodeSummary]) -> Self {
        let mut stats = ChainStats {
            nodes: summaries.len(),
            ..ChainStats::default()
        };
        if summaries.is_empty() {
            return stats;
        }

        let intervals: Vec<f64> = summaries
            .iter()
            .filter_map(|s| mean_interval(&s.main_block_times))
            .collect();
        if !intervals.is_empty() {
            stats.mean_block_interval = Some(intervals.iter().sum::<f64>() / intervals.len() as f64);
        }

        let blocks: usize = summaries.iter().map(|s| s.main_len).sum();
        let uncles: usize = summaries.iter().map(|s| s.main_uncles).sum();
        if blocks > 0 {
            stats.uncle_rate = uncles as f64 / blocks as f64;
        }

        stats.min_head = summaries.iter().map(|s| s.main_head).min().unwrap_or(0);
        stats.max_head = summaries.iter().map(|s| s.main_head).max().unwrap_or(0);
        stats.head_spread = stats.max_head - stats.min_head;

        if let Some(longest) = summaries.iter().max_by_key(|s| s.beacon_len) {
            for proposer in &longest.beacon_proposers {
                *stats.beacon_proposers.entry(proposer.as_u64()).or_default() += 1;
            }
        }

        for s in summaries {
            stats.miners += usize::from(s.miner);
            stats.validators += usize::from(s.validator);
            stats.blocks_mined += s.blocks_mined;
            stats.beacon_proposed += s.beacon_proposed;
            stats.messages_sent += s.messages_sent;
            stats.messages_received += s.messages_received;
            stats.lost_sends += s.lost_sends;
            stats.faults += s.faults;
        }
        stats
    }
}

fn mean_interval(times: &[u64]) -> Option<f64> {
    match (times.first(), times.last()) {
        (Some(first), Some(last)) if times.len() > 1 => {
            Some(last.saturating_sub(*first) as f64 / (times.len() - 1) as f64)
        }
        _ => None,
    }
}
