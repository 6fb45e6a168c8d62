//! Chain Store - best-chain view plus the uncles that lost a tie-break.
//!
//! Positions are relative: `blocks[0]` is the oldest retained block and
//! `blocks[i].number() == blocks[0].number() + i` holds after every public
//! operation returns. Gap filling keeps that true by padding with
//! placeholders, and reorganization only ever swaps a slot for an uncle of
//! the same number.

use crate::block::{Block, BlockId};
use rand::Rng;
use thiserror::Error;

/// Errors raised by direct chain manipulation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("block {got} does not extend head {head}")]
    NotContiguous { head: u64, got: u64 },
}

/// Same-height conflict resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkRule {
    /// Main chain: a block at the head's height takes the head when its
    /// proposer id is lower; anything else at or below the head is an uncle.
    LowerProposerAtHead,

    /// Beacon chain: a block at or below the head replaces the stored one
    /// when its proposer id is higher. Placeholders always lose.
    HigherProposerReplaces,
}

/// What `ChainStore::admit` did with a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Already in the chain or among the uncles
    Duplicate,
    /// Older than the oldest retained block
    Stale,
    /// Extended the head by one
    Appended,
    /// Extended the head after padding `placeholders` blocks
    GapFilled { previous_head: u64, placeholders: u64 },
    /// Took over the slot for `number`; the displaced block became an uncle
    Replaced { number: u64 },
    /// Kept aside as an uncle
    Uncle,
}

impl Admission {
    /// True when the block is new to this node and worth relaying.
    pub fn is_new(&self) -> bool {
        !matches!(self, Admission::Duplicate | Admission::Stale)
    }
}

/// A parent link that could not be repaired from the uncle list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// Number of the slot holding the wrong block
    pub number: u64,
    /// Id the next block expects at that slot
    pub wanted: BlockId,
}

/// Append-only best chain with a side list of uncles.
#[derive(Debug, Clone, Default)]
pub struct ChainStore {
    blocks: Vec<Block>,
    uncles: Vec<Block>,
}

impl ChainStore {
    /// Creates an empty store (the beacon chain starts this way).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding only the genesis block.
    pub fn with_genesis() -> Self {
        Self {
            blocks: vec![Block::genesis()],
            uncles: Vec::new(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn uncles(&self) -> &[Block] {
        &self.uncles
    }

    pub fn head(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn first(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the block stored for `number`, if that slot exists.
    pub fn get(&self, number: u64) -> Option<&Block> {
        let first = self.first()?.number();
        let index = number.checked_sub(first)?;
        self.blocks.get(usize::try_from(index).ok()?)
    }

    /// True if a block with `id` is in the chain or among the uncles.
    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.iter().any(|b| b.id() == id) || self.is_uncle(id)
    }

    pub fn is_uncle(&self, id: BlockId) -> bool {
        self.uncles.iter().any(|b| b.id() == id)
    }

    /// Number of placeholders still waiting for their real block.
    pub fn placeholders(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_placeholder()).count()
    }

    /// True when block numbers follow positions without holes.
    pub fn is_contiguous(&self) -> bool {
        match self.first() {
            Some(first) => {
                let base = first.number();
                self.blocks
                    .iter()
                    .enumerate()
                    .all(|(i, b)| b.number() == base + i as u64)
            }
            None => true,
        }
    }

    /// True when every block names its predecessor as parent.
    pub fn is_linked(&self) -> bool {
        self.blocks.windows(2).all(|pair| pair[1].parent() == pair[0].id())
    }

    /// Appends `block` on top of the head.
    pub fn push(&mut self, block: Block) -> Result<(), ChainError> {
        if let Some(head) = self.head() {
            if block.number() != head.number() + 1 {
                return Err(ChainError::NotContiguous {
                    head: head.number(),
                    got: block.number(),
                });
            }
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Pads the chain with placeholders up to (excluding) `number`.
    ///
    /// Returns how many placeholders were added.
    pub fn fill_gap(&mut self, number: u64, now: u64, rng: &mut impl Rng) -> u64 {
        let mut added = 0;
        while let Some(head) = self.head() {
            if head.number() + 1 >= number {
                break;
            }
            let filler = Block::placeholder(head.number() + 1, head.id(), now, rng);
            self.blocks.push(filler);
            added += 1;
        }
        added
    }

    /// Files an incoming block and reports where it went.
    ///
    /// The stored copy carries `now` as its arrival time.
    pub fn admit(&mut self, block: Block, now: u64, rule: ForkRule, rng: &mut impl Rng) -> Admission {
        if self.contains(block.id()) {
            return Admission::Duplicate;
        }
        let block = block.arrived(now);

        let (first, head) = match (self.first(), self.head()) {
            (Some(first), Some(head)) => (first.number(), head.number()),
            _ => {
                self.blocks.push(block);
                return Admission::Appended;
            }
        };

        let number = block.number();
        if number < first {
            return Admission::Stale;
        }
        if number == head + 1 {
            self.blocks.push(block);
            return Admission::Appended;
        }
        if number > head + 1 {
            let placeholders = self.fill_gap(number, now, rng);
            self.blocks.push(block);
            return Admission::GapFilled {
                previous_head: head,
                placeholders,
            };
        }

        let index = (number - first) as usize;
        let stored = &self.blocks[index];
        let wins = match rule {
            ForkRule::LowerProposerAtHead => {
                number == head && !stored.is_placeholder() && block.proposer() < stored.proposer()
            }
            ForkRule::HigherProposerReplaces => block.proposer() > stored.proposer(),
        };

        if wins {
            let displaced = std::mem::replace(&mut self.blocks[index], block);
            if !displaced.is_placeholder() {
                self.uncles.push(displaced);
            }
            Admission::Replaced { number }
        } else {
            self.uncles.push(block);
            Admission::Uncle
        }
    }

    /// Walks the whole chain from the tail and repairs broken parent links
    /// by swapping in the matching uncle.
    ///
    /// Returns the links no uncle could repair. Calling this on a linked
    /// chain changes nothing.
    pub fn reorganize(&mut self) -> Vec<Gap> {
        let mut gaps = Vec::new();

        for i in (1..self.blocks.len()).rev() {
            let wanted = self.blocks[i].parent();
            let slot_number = self.blocks[i - 1].number();
            if wanted == self.blocks[i - 1].id() {
                continue;
            }

            let found = self
                .uncles
                .iter()
                .position(|u| u.id() == wanted && u.number() == slot_number);

            match found {
                Some(k) if self.blocks[i - 1].is_placeholder() => {
                    self.blocks[i - 1] = self.uncles.remove(k);
                }
                Some(k) => std::mem::swap(&mut self.uncles[k], &mut self.blocks[i - 1]),
                None => gaps.push(Gap {
                    number: slot_number,
                    wanted,
                }),
            }
        }

        gaps
    }
}
