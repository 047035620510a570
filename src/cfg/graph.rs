//! Read-only view of a block graph
//!
//! The ordering code only needs block identity, edges, loop membership and
//! execution probability. Anything that can answer these queries can be
//! ordered, the concrete [`Cfg`](crate::cfg::Cfg) is one implementation.

use crate::cfg::block::{BlockId, LoopId};

/// Queries the block ordering needs from a control flow graph
pub trait BlockGraph {
    /// Total number of blocks; ids are `0..block_count()`
    fn block_count(&self) -> usize;

    /// Entry block of the method
    fn start_block(&self) -> BlockId;

    /// Successors of `block` in a stable order
    fn successors(&self, block: BlockId) -> &[BlockId];

    /// Predecessors of `block` in a stable order
    fn predecessors(&self, block: BlockId) -> &[BlockId];

    fn loop_depth(&self, block: BlockId) -> u32;

    /// Innermost loop containing `block`
    fn loop_of(&self, block: BlockId) -> Option<LoopId>;

    fn is_loop_header(&self, block: BlockId) -> bool;

    fn is_loop_end(&self, block: BlockId) -> bool;

    /// Execution probability, never negative
    fn probability(&self, block: BlockId) -> f64;

    fn loop_header(&self, loop_id: LoopId) -> BlockId;

    fn loop_blocks(&self, loop_id: LoopId) -> &[BlockId];

    /// Innermost loop enclosing `loop_id`
    fn loop_parent(&self, loop_id: LoopId) -> Option<LoopId>;

    /// Number of loop-end blocks jumping back to the header of `loop_id`
    fn num_backedges(&self, loop_id: LoopId) -> usize;

    fn is_inverted(&self, loop_id: LoopId) -> bool;

    /// Number of loops in the graph
    fn loop_count(&self) -> usize;
}
