//! Block - the immutable record both chains are made of.

use rand::Rng;
use serde::{Deserialize, Serialize};
use shardsim_env::NodeId;

/// Number carried by the genesis block.
pub const GENESIS_NUMBER: u64 = 7_000_000;

/// Opaque 32-byte block identity.
///
/// Identities are random, not content hashes; uniqueness holds with
/// overwhelming probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub [u8; 32]);

impl BlockId {
    /// Identity of the genesis block.
    pub const GENESIS: BlockId = BlockId([0x00; 32]);

    /// Parent sentinel carried by the genesis block.
    pub const GENESIS_PARENT: BlockId = BlockId([0x11; 32]);

    /// Draws a fresh identity from `rng`.
    pub fn random(rng: &mut impl Rng) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes);
        Self(bytes)
    }

    /// Last two bytes in hex, enough to tell blocks apart in logs.
    pub fn short(&self) -> String {
        format!("{:02x}{:02x}", self.0[30], self.0[31])
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A block of either chain.
///
/// Fields are private: once built a block never changes. Stamping the arrival
/// time yields a new value, and chain slots are replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    number: u64,
    id: BlockId,
    parent: BlockId,
    /// `None` marks a placeholder synthesized during gap filling
    proposer: Option<NodeId>,
    created_at: u64,
    arrived_at: u64,
}

impl Block {
    /// Builds a block from its parts.
    pub fn new(
        number: u64,
        id: BlockId,
        parent: BlockId,
        proposer: Option<NodeId>,
        created_at: u64,
    ) -> Self {
        Self {
            number,
            id,
            parent,
            proposer,
            created_at,
            arrived_at: created_at,
        }
    }

    /// The well-known genesis block.
    pub fn genesis() -> Self {
        Self::new(
            GENESIS_NUMBER,
            BlockId::GENESIS,
            BlockId::GENESIS_PARENT,
            Some(NodeId(0)),
            0,
        )
    }

    /// A genesis-like root used to start an empty chain.
    pub fn root(proposer: NodeId, now: u64, rng: &mut impl Rng) -> Self {
        Self::new(
            GENESIS_NUMBER,
            BlockId::random(rng),
            BlockId::GENESIS_PARENT,
            Some(proposer),
            now,
        )
    }

    /// A new block on top of `parent`.
    pub fn child_of(parent: &Block, proposer: NodeId, now: u64, rng: &mut impl Rng) -> Self {
        Self::new(
            parent.number + 1,
            BlockId::random(rng),
            parent.id,
            Some(proposer),
            now,
        )
    }

    /// Filler keeping chain positions contiguous until the real block shows up.
    pub fn placeholder(number: u64, parent: BlockId, now: u64, rng: &mut impl Rng) -> Self {
        Self::new(number, BlockId::random(rng), parent, None, now)
    }

    /// Returns a copy stamped with the local arrival time.
    pub fn arrived(&self, now: u64) -> Self {
        Self {
            arrived_at: now,
            ..self.clone()
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn parent(&self) -> BlockId {
        self.parent
    }

    pub fn proposer(&self) -> Option<NodeId> {
        self.proposer
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn arrived_at(&self) -> u64 {
        self.arrived_at
    }

    /// True for gap-filling placeholders.
    pub fn is_placeholder(&self) -> bool {
        self.proposer.is_none()
    }
}
