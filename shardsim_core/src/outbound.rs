//! Outbound Queue - bounded buffer of in-flight sends.
//!
//! The tick loop never waits on the network. When the queue grows past its
//! bound the oldest handles are tested once each, and the ones that have not
//! completed are written off as lost instead of stalling the node.

use shardsim_env::SendHandle;
use std::collections::VecDeque;

/// Result of testing the oldest queued send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Delivered; the handle left the queue
    Completed,
    /// Not delivered yet; the handle stays at the front of the queue
    Pending,
    /// Not delivered and dropped from the queue; counted as lost
    Abandoned,
}

/// Summary of one `OutboundQueue::drain` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub completed: usize,
    pub abandoned: usize,
    pub attempts: usize,
    pub remaining: usize,
    /// Still above capacity after the attempt budget ran out
    pub overflowed: bool,
}

/// FIFO of pending send handles with a lost-send counter.
#[derive(Debug)]
pub struct OutboundQueue {
    pending: VecDeque<SendHandle>,
    max_len: usize,
    budget: usize,
    lost: u64,
}

impl OutboundQueue {
    /// Creates a queue holding up to `max_len` handles that spends at most
    /// `budget` forced tests per drain.
    pub fn new(max_len: usize, budget: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            max_len,
            budget,
            lost: 0,
        }
    }

    pub fn push(&mut self, handle: SendHandle) {
        self.pending.push_back(handle);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Total sends written off so far.
    pub fn lost(&self) -> u64 {
        self.lost
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Tests the oldest handle.
    ///
    /// An incomplete handle is put back unless `force` is set, in which case
    /// it is abandoned.
    pub fn poll_oldest(&mut self, force: bool) -> Option<SendStatus> {
        let handle = self.pending.pop_front()?;
        if handle.is_complete() {
            return Some(SendStatus::Completed);
        }
        if force {
            self.lost += 1;
            return Some(SendStatus::Abandoned);
        }
        self.pending.push_front(handle);
        Some(SendStatus::Pending)
    }

    /// Services the queue once.
    ///
    /// Completed handles are reaped from the front for free. While the queue
    /// is above capacity, up to `budget` of the oldest handles are forced
    /// out. At most `budget` sends are lost per call.
    pub fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();

        while let Some(SendStatus::Completed) = self.poll_oldest(false) {
            report.completed += 1;
        }

        while self.pending.len() > self.max_len && report.attempts < self.budget {
            report.attempts += 1;
            match self.poll_oldest(true) {
                Some(SendStatus::Completed) => report.completed += 1,
                Some(SendStatus::Abandoned) => report.abandoned += 1,
                Some(SendStatus::Pending) | None => break,
            }
        }

        report.remaining = self.pending.len();
        report.overflowed = report.remaining > self.max_len;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(queue: &mut OutboundQueue, count: usize) -> Vec<SendHandle> {
        (0..count)
            .map(|_| {
                let handle = SendHandle::new();
                queue.push(handle.clone());
                handle
            })
            .collect()
    }

    #[test]
    fn test_completed_handles_are_reaped() {
        let mut queue = OutboundQueue::new(10, 3);
        let handles = fill(&mut queue, 4);
        handles[0].complete();
        handles[1].complete();
        handles[3].complete();

        let report = queue.drain();
        assert_eq!(report.completed, 2);
        assert_eq!(report.abandoned, 0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.lost(), 0);
    }

    #[test]
    fn test_pending_head_is_requeued() {
        let mut queue = OutboundQueue::new(10, 3);
        fill(&mut queue, 2);

        assert_eq!(queue.poll_oldest(false), Some(SendStatus::Pending));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.poll_oldest(true), Some(SendStatus::Abandoned));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.lost(), 1);
    }

    #[test]
    fn test_overflow_is_bounded_by_budget() {
        let mut queue = OutboundQueue::new(2, 3);
        fill(&mut queue, 10);

        let report = queue.drain();
        assert_eq!(report.attempts, 3);
        assert_eq!(report.abandoned, 3);
        assert_eq!(report.remaining, 7);
        assert!(report.overflowed);
        assert_eq!(queue.lost(), 3);
    }

    #[test]
    fn test_repeated_drains_shrink_queue_to_capacity() {
        let mut queue = OutboundQueue::new(4, 2);
        fill(&mut queue, 11);

        let mut previous = queue.len();
        let mut previous_lost = queue.lost();
        while queue.len() > queue.max_len() {
            let report = queue.drain();
            assert!(queue.len() < previous);
            assert!(queue.lost() - previous_lost <= queue.budget() as u64);
            previous = queue.len();
            previous_lost = queue.lost();
            if !report.overflowed {
                break;
            }
        }
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.lost(), 7);
    }

    #[test]
    fn test_completed_sends_under_pressure_are_not_lost() {
        let mut queue = OutboundQueue::new(1, 5);
        let handles = fill(&mut queue, 4);
        handles[1].complete();

        let report = queue.drain();
        assert_eq!(report.abandoned, 2);
        assert_eq!(report.completed, 1);
        assert_eq!(queue.len(), 1);
    }
}
