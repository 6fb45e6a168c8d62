//! Node Engine - one simulated peer of the network.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       NodeEngine                         │
//! │  tick():  listen ─▶ mine ─▶ validate ─▶ drain ─▶ time+1  │
//! │                                                          │
//! │  ┌──────────┐ ┌────────────┐ ┌──────────────┐ ┌────────┐ │
//! │  │  Peers   │ │ Main chain │ │ Beacon chain │ │Outbound│ │
//! │  │Directory │ │ + uncles   │ │ + schedule   │ │ Queue  │ │
//! │  └──────────┘ └────────────┘ └──────────────┘ └────────┘ │
//! └──────────────────────────────────────────────────────────┘
//!                             │
//!                     Transport<Message>
//! ```
//!
//! A node owns all of its state and only ever touches other nodes through
//! the transport. Nothing a peer sends can abort a tick: protocol faults are
//! recorded in the node's log and mirrored to `tracing`.

use crate::block::Block;
use crate::chain::{Admission, ChainStore, ForkRule};
use crate::committee::{initial_seed, EpochSchedule, ScheduleEvent};
use crate::config::{SimConfig, Topology};
use crate::diagnostics::{Fault, LogEntry, Severity};
use crate::message::Message;
use crate::metrics::MessageCounter;
use crate::outbound::OutboundQueue;
use crate::peers::{select_bootstrap_targets, PeerDirectory};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use shardsim_env::{NodeId, Transport};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A simulated node, generic over the transport it runs on.
pub struct NodeEngine<T>
where
    T: Transport<Message>,
{
    id: NodeId,
    topology: Topology,
    config: Arc<SimConfig>,
    transport: Arc<T>,
    rng: ChaCha8Rng,

    /// Local clock, one unit per tick
    time: u64,
    miner: bool,
    validator: bool,

    peers: PeerDirectory,
    main_chain: ChainStore,
    beacon_chain: ChainStore,

    /// Known validators, kept sorted
    validators: Vec<NodeId>,
    schedule: EpochSchedule,

    outbound: OutboundQueue,
    sent: MessageCounter,
    received: MessageCounter,
    log: Vec<LogEntry>,

    blocks_mined: u64,
    beacon_proposed: u64,
}

impl<T> NodeEngine<T>
where
    T: Transport<Message>,
{
    /// Creates a node. Its roles are drawn from `rng` against the
    /// configured ratios.
    pub fn new(
        id: NodeId,
        topology: Topology,
        config: Arc<SimConfig>,
        transport: Arc<T>,
        mut rng: ChaCha8Rng,
    ) -> Self {
        let miner = rng.gen_range(0..100) < config.miner_ratio;
        let validator = rng.gen_range(0..100) < config.validator_ratio;
        let schedule = EpochSchedule::new(
            config.slot_duration,
            config.epoch_length,
            initial_seed(&config.sim_id),
        );
        let outbound = OutboundQueue::new(config.max_out_queue, config.drain_budget);

        Self {
            id,
            topology,
            config,
            transport,
            rng,
            time: 0,
            miner,
            validator,
            peers: PeerDirectory::new(id),
            main_chain: ChainStore::with_genesis(),
            beacon_chain: ChainStore::new(),
            validators: Vec::new(),
            schedule,
            outbound,
            sent: MessageCounter::new(),
            received: MessageCounter::new(),
            log: Vec::new(),
            blocks_mined: 0,
            beacon_proposed: 0,
        }
    }

    /// Contacts the initial peers and, for validators, announces the role.
    ///
    /// Peers are recorded optimistically: the handshake reply is not awaited.
    pub fn bootstrap(&mut self) {
        let targets = select_bootstrap_targets(
            self.id,
            self.config.peer_count,
            &self.topology,
            &self.config,
            &mut self.rng,
        );
        for target in targets {
            self.send(target, Message::NewPeer { source: self.id });
            self.peers.insert(target);
        }

        if self.validator {
            self.insert_validator(self.id);
            self.broadcast(Message::NewValidator { source: self.id });
        }

        debug!(
            node = %self.id,
            peers = self.peers.len(),
            miner = self.miner,
            validator = self.validator,
            "Node bootstrapped"
        );
    }

    /// Runs one simulated time unit.
    pub fn tick(&mut self) {
        self.listen();
        if self.miner {
            self.mine();
        }
        if self.validator {
            self.validate();
        }
        self.drain();
        self.time += 1;
    }

    fn listen(&mut self) {
        for _ in 0..self.config.max_receive {
            let Some(source) = self.transport.probe(self.id) else {
                break;
            };
            match self.transport.receive(self.id, source) {
                Ok(message) => {
                    debug!(node = %self.id, from = %message.source(), kind = message.kind(), "Message received");
                    self.received.record(self.time);
                    self.classify(message);
                }
                Err(source_err) => {
                    self.report(Fault::ReceiveFailed {
                        peer: source,
                        source: source_err,
                    });
                    break;
                }
            }
        }
    }

    fn classify(&mut self, message: Message) {
        match message {
            Message::NewPeer { source } => {
                if self.peers.insert(source) {
                    debug!(node = %self.id, peer = %source, "Peer added");
                    self.send(source, Message::NewPeer { source: self.id });
                }
            }
            Message::NeedMainBlock { source, number } => {
                let reply = self
                    .main_chain
                    .get(number)
                    .filter(|block| !block.is_placeholder())
                    .cloned();
                if let Some(block) = reply {
                    self.send(source, Message::NewMainBlock { source: self.id, block });
                }
            }
            Message::NewMainBlock { block, .. } => self.on_main_block(block),
            Message::NewBeaconBlock { block, .. } => self.on_beacon_block(block),
            Message::NewValidator { source } => {
                if self.insert_validator(source) {
                    self.broadcast(Message::NewValidator { source });
                }
            }
        }
    }

    fn on_main_block(&mut self, block: Block) {
        let number = block.number();
        let admission = self.main_chain.admit(
            block.clone(),
            self.time,
            ForkRule::LowerProposerAtHead,
            &mut self.rng,
        );
        if !self.note_admission("main", number, admission) {
            return;
        }
        self.broadcast(Message::NewMainBlock { source: self.id, block });
        self.check_main_chain();
    }

    fn on_beacon_block(&mut self, block: Block) {
        let number = block.number();
        let admission = self.beacon_chain.admit(
            block.clone(),
            self.time,
            ForkRule::HigherProposerReplaces,
            &mut self.rng,
        );
        if self.note_admission("beacon", number, admission) {
            self.broadcast(Message::NewBeaconBlock { source: self.id, block });
            self.check_beacon_chain();
        }
    }

    /// Logs an admission. Returns true when the block was new.
    fn note_admission(&mut self, chain: &'static str, number: u64, admission: Admission) -> bool {
        match admission {
            Admission::Duplicate | Admission::Stale => {
                debug!(node = %self.id, chain, number, ?admission, "Block ignored");
                return false;
            }
            Admission::GapFilled { previous_head, .. } => self.report(Fault::OutOfSync {
                head: previous_head,
                received: number,
            }),
            Admission::Appended | Admission::Replaced { .. } | Admission::Uncle => {
                debug!(node = %self.id, chain, number, ?admission, "Block admitted");
            }
        }
        true
    }

    /// Repairs the main chain from uncles and asks a random peer for every
    /// block that is still missing.
    fn check_main_chain(&mut self) {
        for gap in self.main_chain.reorganize() {
            self.report(Fault::UnrepairableGap { number: gap.number });
            if let Some(peer) = self.peers.pick(&mut self.rng) {
                self.send(
                    peer,
                    Message::NeedMainBlock {
                        source: self.id,
                        number: gap.number,
                    },
                );
            }
        }
    }

    /// Repairs the beacon chain from uncles. Beacon blocks are never pulled,
    /// so leftover gaps are only reported.
    fn check_beacon_chain(&mut self) {
        for gap in self.beacon_chain.reorganize() {
            self.report(Fault::UnrepairableGap { number: gap.number });
        }
    }

    fn mine(&mut self) {
        let range = self
            .config
            .total_miner_weight(self.topology.group_count)
            .saturating_mul(self.config.miner_slot_length)
            .max(1);
        if self.rng.gen_range(0..range) != 0 {
            return;
        }

        let Some(head) = self.main_chain.head() else {
            return;
        };
        let block = Block::child_of(head, self.id, self.time, &mut self.rng);
        info!(node = %self.id, number = block.number(), id = %block.id().short(), "Block mined");

        self.main_chain
            .admit(block.clone(), self.time, ForkRule::LowerProposerAtHead, &mut self.rng);
        self.blocks_mined += 1;
        self.broadcast(Message::NewMainBlock { source: self.id, block });
    }

    fn validate(&mut self) {
        let event = self.schedule.advance(self.time, &self.validators);
        if let ScheduleEvent::NewEpoch { epoch, validators, .. } = event {
            debug!(node = %self.id, epoch, seed = self.schedule.seed(), "New epoch");
            if (validators as u64) < self.schedule.epoch_length() {
                self.report(Fault::InsufficientValidators {
                    validators,
                    slots: self.schedule.epoch_length(),
                });
            }
        }

        if event.starts_slot() && self.schedule.proposer() == Some(self.id) {
            self.propose_beacon_block();
        }
    }

    fn propose_beacon_block(&mut self) {
        let block = match self.beacon_chain.head() {
            Some(head) => Block::child_of(head, self.id, self.time, &mut self.rng),
            None => Block::root(self.id, self.time, &mut self.rng),
        };
        info!(
            node = %self.id,
            slot = self.schedule.slot(),
            number = block.number(),
            "Beacon block proposed"
        );

        self.beacon_chain
            .admit(block.clone(), self.time, ForkRule::HigherProposerReplaces, &mut self.rng);
        self.beacon_proposed += 1;
        self.broadcast(Message::NewBeaconBlock { source: self.id, block });
    }

    fn drain(&mut self) {
        let report = self.outbound.drain();
        if report.abandoned > 0 {
            debug!(node = %self.id, abandoned = report.abandoned, "Sends written off");
        }
        if report.overflowed {
            self.report(Fault::QueueOverflow {
                len: report.remaining,
                limit: self.outbound.max_len(),
            });
        }
    }

    /// Posts a non-blocking send. Transport errors become diagnostics.
    fn send(&mut self, target: NodeId, message: Message) {
        match self.transport.send(self.id, target, message) {
            Ok(handle) => {
                self.outbound.push(handle);
                self.sent.record(self.time);
            }
            Err(source) => self.report(Fault::SendFailed { target, source }),
        }
    }

    /// Sends `message` to `min(max_broadcast, peers)` random peers.
    fn broadcast(&mut self, message: Message) {
        let targets = self.peers.sample(self.config.max_broadcast, &mut self.rng);
        for target in targets {
            self.send(target, message.clone());
        }
    }

    fn insert_validator(&mut self, node: NodeId) -> bool {
        match self.validators.binary_search(&node) {
            Ok(_) => false,
            Err(position) => {
                self.validators.insert(position, node);
                true
            }
        }
    }

    fn report(&mut self, fault: Fault) {
        let entry = LogEntry::from_fault(self.id, self.time, &fault);
        match entry.severity {
            Severity::Info => debug!(node = %self.id, time = self.time, "{}", fault),
            Severity::Warning | Severity::Error => {
                warn!(node = %self.id, time = self.time, "{}", fault)
            }
        }
        self.log.push(entry);
    }

    // Reporting accessors

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn is_miner(&self) -> bool {
        self.miner
    }

    pub fn is_validator(&self) -> bool {
        self.validator
    }

    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    pub fn main_chain(&self) -> &ChainStore {
        &self.main_chain
    }

    pub fn beacon_chain(&self) -> &ChainStore {
        &self.beacon_chain
    }

    pub fn validators(&self) -> &[NodeId] {
        &self.validators
    }

    pub fn slot(&self) -> u64 {
        self.schedule.slot()
    }

    pub fn epoch(&self) -> u64 {
        self.schedule.epoch()
    }

    /// Messages sent, per tick.
    pub fn sent(&self) -> &MessageCounter {
        &self.sent
    }

    /// Messages received, per tick.
    pub fn received(&self) -> &MessageCounter {
        &self.received
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Sends abandoned by the outbound queue.
    pub fn lost_sends(&self) -> u64 {
        self.outbound.lost()
    }

    pub fn pending_sends(&self) -> usize {
        self.outbound.len()
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined
    }

    pub fn beacon_proposed(&self) -> u64 {
        self.beacon_proposed
    }
}
