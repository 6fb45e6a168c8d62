//! Committee sampling and epoch/slot bookkeeping for the beacon chain.
//!
//! The sampler is deliberately simple and must stay bit-for-bit stable:
//! every node recomputes the same committees from the same validator set
//! and seed, so any change here splits the network.

use sha2::{Digest, Sha256};
use shardsim_env::NodeId;

/// Modulus keeping epoch seeds small.
pub const SEED_MODULUS: u64 = 100;

/// Deterministic permutation: repeatedly removes the element at
/// `seed % remaining` and appends it to the output.
///
/// The seed is not advanced between removals, so this is not a uniform
/// shuffle.
pub fn shuffle<T: Clone>(list: &[T], seed: u64) -> Vec<T> {
    let mut remaining = list.to_vec();
    let mut shuffled = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let index = (seed % remaining.len() as u64) as usize;
        shuffled.push(remaining.remove(index));
    }
    shuffled
}

/// Splits `list` into `epoch_length` contiguous committees of
/// `list.len() / epoch_length` members each.
///
/// Leftover elements are not assigned. With fewer elements than slots every
/// committee comes back empty.
pub fn split_committees<T: Clone>(list: &[T], epoch_length: usize) -> Vec<Vec<T>> {
    if epoch_length == 0 {
        return Vec::new();
    }
    let size = list.len() / epoch_length;
    list.chunks(size.max(1))
        .map(|chunk| chunk[..size.min(chunk.len())].to_vec())
        .chain(std::iter::repeat(Vec::new()))
        .take(epoch_length)
        .collect()
}

/// Initial epoch seed derived from the simulation identifier.
pub fn initial_seed(sim_id: &str) -> u64 {
    let digest = Sha256::digest(sim_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes) % SEED_MODULUS
}

/// Seed for `epoch`, given the seed of the previous one.
pub fn next_seed(seed: u64, epoch: u64) -> u64 {
    seed.wrapping_mul(epoch) % SEED_MODULUS
}

/// What a call to `EpochSchedule::advance` changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleEvent {
    /// Still inside the current slot
    Idle,
    /// A new slot started inside the current epoch
    NewSlot { slot: u64 },
    /// A new slot started and opened a new epoch
    NewEpoch { slot: u64, epoch: u64, validators: usize },
}

impl ScheduleEvent {
    pub fn starts_slot(&self) -> bool {
        !matches!(self, ScheduleEvent::Idle)
    }
}

/// Slot and epoch clock of one validator, with the committees of the
/// current epoch.
#[derive(Debug, Clone)]
pub struct EpochSchedule {
    slot_duration: u64,
    epoch_length: u64,
    slot: u64,
    epoch: u64,
    seed: u64,
    committees: Vec<Vec<NodeId>>,
}

impl EpochSchedule {
    pub fn new(slot_duration: u64, epoch_length: u64, seed: u64) -> Self {
        Self {
            slot_duration: slot_duration.max(1),
            epoch_length: epoch_length.max(1),
            slot: 0,
            epoch: 0,
            seed,
            committees: Vec::new(),
        }
    }

    /// Moves the clock to `time`.
    ///
    /// A slot starts on every positive multiple of the slot duration; every
    /// `epoch_length` slots the epoch advances, the seed evolves and the
    /// committees are resampled from `validators`.
    pub fn advance(&mut self, time: u64, validators: &[NodeId]) -> ScheduleEvent {
        if time == 0 || time % self.slot_duration != 0 {
            return ScheduleEvent::Idle;
        }
        self.slot += 1;

        if self.slot % self.epoch_length != 0 {
            return ScheduleEvent::NewSlot { slot: self.slot };
        }

        self.epoch += 1;
        self.seed = next_seed(self.seed, self.epoch);
        let shuffled = shuffle(validators, self.seed);
        self.committees = split_committees(&shuffled, self.epoch_length as usize);

        ScheduleEvent::NewEpoch {
            slot: self.slot,
            epoch: self.epoch,
            validators: validators.len(),
        }
    }

    /// True once the first epoch has been sampled.
    pub fn is_active(&self) -> bool {
        self.epoch > 0
    }

    /// Committee of the current slot.
    pub fn committee(&self) -> &[NodeId] {
        let index = (self.slot % self.epoch_length) as usize;
        self.committees.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Proposer of the current slot: first member of its committee.
    pub fn proposer(&self) -> Option<NodeId> {
        if !self.is_active() {
            return None;
        }
        self.committee().first().copied()
    }

    pub fn slot(&self) -> u64 {
        self.slot
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn epoch_length(&self) -> u64 {
        self.epoch_length
    }

    pub fn committees(&self) -> &[Vec<NodeId>] {
        &self.committees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(raw: impl IntoIterator<Item = u64>) -> Vec<NodeId> {
        raw.into_iter().map(NodeId).collect()
    }

    #[test]
    fn test_shuffle_literal_trace() {
        // pop 2 -> 3, pop 2 -> 4, pop 2 -> 5, pop 2 % 2 = 0 -> 1, pop 0 -> 2
        assert_eq!(shuffle(&[1, 2, 3, 4, 5], 2), vec![3, 4, 5, 1, 2]);
    }

    #[test]
    fn test_shuffle_seed_zero_is_identity() {
        assert_eq!(shuffle(&[4, 8, 15, 16], 0), vec![4, 8, 15, 16]);
        assert!(shuffle::<u8>(&[], 7).is_empty());
    }

    #[test]
    fn test_split_sixteen_into_four() {
        let list: Vec<u32> = (1..=16).collect();
        let committees = split_committees(&list, 4);

        assert_eq!(committees.len(), 4);
        assert_eq!(committees[0], vec![1, 2, 3, 4]);
        assert_eq!(committees[3], vec![13, 14, 15, 16]);
    }

    #[test]
    fn test_split_drops_remainder() {
        let list: Vec<u32> = (1..=10).collect();
        let committees = split_committees(&list, 3);

        assert_eq!(committees, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
    }

    #[test]
    fn test_split_with_too_few_members() {
        let committees = split_committees(&[1, 2], 4);
        assert_eq!(committees.len(), 4);
        assert!(committees.iter().all(Vec::is_empty));
        assert!(split_committees(&[1, 2], 0).is_empty());
    }

    #[test]
    fn test_seed_evolution() {
        assert_eq!(next_seed(37, 1), 37);
        assert_eq!(next_seed(37, 3), 11);
        assert!(initial_seed("shardsim") < SEED_MODULUS);
        assert_eq!(initial_seed("run-a"), initial_seed("run-a"));
    }

    #[test]
    fn test_schedule_slots_and_epochs() {
        let validators = ids(0..8);
        let mut schedule = EpochSchedule::new(4, 2, 5);

        assert_eq!(schedule.advance(0, &validators), ScheduleEvent::Idle);
        assert_eq!(schedule.advance(3, &validators), ScheduleEvent::Idle);
        assert_eq!(schedule.advance(4, &validators), ScheduleEvent::NewSlot { slot: 1 });
        assert!(!schedule.is_active());
        assert_eq!(schedule.proposer(), None);

        assert_eq!(
            schedule.advance(8, &validators),
            ScheduleEvent::NewEpoch { slot: 2, epoch: 1, validators: 8 }
        );
        assert!(schedule.is_active());
        assert_eq!(schedule.seed(), 5);
        assert_eq!(schedule.committees().len(), 2);

        let expected = split_committees(&shuffle(&validators, 5), 2);
        assert_eq!(schedule.committee(), expected[0].as_slice());
        assert_eq!(schedule.proposer(), expected[0].first().copied());
    }

    #[test]
    fn test_schedule_agrees_across_nodes() {
        let validators = ids([3, 11, 42, 57, 90, 101]);
        let mut a = EpochSchedule::new(1, 3, initial_seed("agree"));
        let mut b = EpochSchedule::new(1, 3, initial_seed("agree"));

        for time in 0..30 {
            a.advance(time, &validators);
            b.advance(time, &validators);
            assert_eq!(a.proposer(), b.proposer());
        }
    }

    proptest! {
        #[test]
        fn prop_shuffle_is_permutation(list in proptest::collection::vec(any::<u32>(), 0..64), seed in 0u64..1000) {
            let mut shuffled = shuffle(&list, seed);
            let mut original = list.clone();
            shuffled.sort_unstable();
            original.sort_unstable();
            prop_assert_eq!(shuffled, original);
        }

        #[test]
        fn prop_committees_are_equal_sized_prefix(len in 0usize..200, epoch_length in 1usize..32) {
            let list: Vec<usize> = (0..len).collect();
            let committees = split_committees(&list, epoch_length);
            let size = len / epoch_length;

            prop_assert_eq!(committees.len(), epoch_length);
            prop_assert!(committees.iter().all(|c| c.len() == size));
            let flattened: Vec<usize> = committees.concat();
            prop_assert_eq!(flattened, list[..size * epoch_length].to_vec());
        }
    }
}
