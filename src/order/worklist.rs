//! Priority worklist of blocks waiting to seed a trace.

use crate::cfg::{BlockGraph, BlockId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
struct WorkItem {
    block: BlockId,
    loop_depth: u32,
    probability: f64,
    /// Insertion sequence, earlier items win ties
    seq: u64,
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for WorkItem {}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkItem {
    /// Greater means popped first: deeper loops, then higher probability,
    /// then lower insertion sequence.
    fn cmp(&self, other: &Self) -> Ordering {
        self.loop_depth
            .cmp(&other.loop_depth)
            .then_with(|| self.probability.total_cmp(&other.probability))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Blocks that are reachable but not yet ordered, highest priority first
#[derive(Debug, Default)]
pub struct Worklist {
    heap: BinaryHeap<WorkItem>,
    next_seq: u64,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `block`. The caller marks it visited beforehand.
    pub fn push<G: BlockGraph>(&mut self, graph: &G, block: BlockId) {
        let item = WorkItem {
            block,
            loop_depth: graph.loop_depth(block),
            probability: graph.probability(block),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.heap.push(item);
    }

    /// Remove the highest priority block; `None` once drained
    pub fn pop(&mut self) -> Option<BlockId> {
        self.heap.pop().map(|item| item.block)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
