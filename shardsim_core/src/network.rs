//! Network - the nodes hosted by one execution group.

use crate::block::Block;
use crate::config::{SimConfig, Topology};
use crate::message::Message;
use crate::node::NodeEngine;
use crate::rng::node_rng;
use serde::{Deserialize, Serialize};
use shardsim_env::{NodeId, Transport};
use std::sync::Arc;
use tracing::info;

/// Final state of one node, small enough to ship across groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub group: u32,
    pub miner: bool,
    pub validator: bool,
    pub peers: usize,
    pub validators: usize,

    pub main_head: u64,
    pub main_len: usize,
    pub main_uncles: usize,
    pub placeholders: usize,
    /// Creation times of the real blocks on the main chain
    pub main_block_times: Vec<u64>,

    pub beacon_head: Option<u64>,
    pub beacon_len: usize,
    pub beacon_uncles: usize,
    /// Proposer of every beacon block on the chain
    pub beacon_proposers: Vec<NodeId>,

    pub blocks_mined: u64,
    pub beacon_proposed: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub lost_sends: u64,
    pub faults: usize,
}

impl NodeSummary {
    pub fn of<T: Transport<Message>>(node: &NodeEngine<T>) -> Self {
        let main = node.main_chain();
        let beacon = node.beacon_chain();
        Self {
            id: node.id(),
            group: node.topology().group,
            miner: node.is_miner(),
            validator: node.is_validator(),
            peers: node.peers().len(),
            validators: node.validators().len(),
            main_head: main.head().map_or(0, Block::number),
            main_len: main.len(),
            main_uncles: main.uncles().len(),
            placeholders: main.placeholders(),
            main_block_times: main
                .blocks()
                .iter()
                .filter(|block| !block.is_placeholder())
                .map(Block::created_at)
                .collect(),
            beacon_head: beacon.head().map(Block::number),
            beacon_len: beacon.len(),
            beacon_uncles: beacon.uncles().len(),
            beacon_proposers: beacon.blocks().iter().filter_map(Block::proposer).collect(),
            blocks_mined: node.blocks_mined(),
            beacon_proposed: node.beacon_proposed(),
            messages_sent: node.sent().total(),
            messages_received: node.received().total(),
            lost_sends: node.lost_sends(),
            faults: node.log().len(),
        }
    }
}

/// All nodes of one execution group, ticked in id order.
pub struct Network<T>
where
    T: Transport<Message>,
{
    config: Arc<SimConfig>,
    topology: Topology,
    nodes: Vec<NodeEngine<T>>,
    time: u64,
}

impl<T> Network<T>
where
    T: Transport<Message>,
{
    /// Builds the group's nodes, then bootstraps each of them.
    ///
    /// Every node of the run must already be reachable through `transport`.
    pub fn bootstrap(config: Arc<SimConfig>, topology: Topology, transport: Arc<T>) -> Self {
        let mut nodes: Vec<NodeEngine<T>> = topology
            .local_nodes(&config)
            .into_iter()
            .map(|id| {
                NodeEngine::new(
                    id,
                    topology,
                    Arc::clone(&config),
                    Arc::clone(&transport),
                    node_rng(config.seed, topology.group, id),
                )
            })
            .collect();

        for node in &mut nodes {
            node.bootstrap();
        }

        info!(
            group = topology.group,
            nodes = nodes.len(),
            miners = nodes.iter().filter(|n| n.is_miner()).count(),
            validators = nodes.iter().filter(|n| n.is_validator()).count(),
            "Network bootstrapped"
        );

        Self {
            config,
            topology,
            nodes,
            time: 0,
        }
    }

    /// Ticks every node once.
    pub fn tick(&mut self) {
        for node in &mut self.nodes {
            node.tick();
        }
        self.time += 1;
    }

    pub fn nodes(&self) -> &[NodeEngine<T>] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeEngine<T>> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    pub fn group(&self) -> u32 {
        self.topology.group
    }

    pub fn group_count(&self) -> u32 {
        self.topology.group_count
    }

    pub fn nodes_per_group(&self) -> u32 {
        self.config.nodes_per_group
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn summaries(&self) -> Vec<NodeSummary> {
        self.nodes.iter().map(NodeSummary::of).collect()
    }
}
