//! Block ordering
//!
//! Computes the two linear block orders a backend needs from one CFG:
//! the code-emitting order used for machine code layout and the linear-scan
//! order handed to the register allocator. Both are built from greedy
//! traces seeded by a priority worklist (deeper loops first, then more
//! probable blocks).
//!
//! Alignment requests are returned next to the orders instead of being
//! written onto the graph, so the graph stays immutable and independent
//! graphs can be ordered on different threads.

pub mod trace;
pub mod verify;
pub mod worklist;

use crate::cfg::{BlockGraph, BlockId};
use crate::config::OrderOptions;
use rayon::prelude::*;
use serde::Serialize;

pub use trace::TraceBuilder;
pub use worklist::Worklist;

/// Result of ordering one CFG
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockOrder {
    /// Order for machine code emission
    pub code_emitting: Vec<BlockId>,
    /// Order for the linear-scan register allocator
    pub linear_scan: Vec<BlockId>,
    /// Alignment requests indexed by block id
    pub align: Vec<bool>,
}

impl BlockOrder {
    /// Whether the emitter should align `block`
    pub fn is_aligned(&self, block: BlockId) -> bool {
        self.align.get(block.index()).copied().unwrap_or(false)
    }

    /// All blocks with an alignment request, in id order
    pub fn aligned_blocks(&self) -> Vec<BlockId> {
        self.align
            .iter()
            .enumerate()
            .filter(|(_, aligned)| **aligned)
            .map(|(index, _)| BlockId(index))
            .collect()
    }

    /// Position of `block` in the code-emitting order
    pub fn emit_position(&self, block: BlockId) -> Option<usize> {
        self.code_emitting.iter().position(|&b| b == block)
    }

    /// Position of `block` in the linear-scan order
    pub fn linear_scan_position(&self, block: BlockId) -> Option<usize> {
        self.linear_scan.iter().position(|&b| b == block)
    }
}

/// Compute the code-emitting order and the alignment table.
///
/// Panics if the result does not contain every block exactly once with the
/// start block first; that means the graph handed in is malformed.
pub fn compute_code_emitting_order<G: BlockGraph>(graph: &G) -> (Vec<BlockId>, Vec<bool>) {
    let mut builder = TraceBuilder::new(graph);
    while let Some(seed) = builder.next_seed() {
        builder.add_code_emitting_trace(seed);
    }
    let (order, align) = builder.finish();

    if let Err(e) = verify::check_order(graph, &order) {
        panic!("code emitting order: {}", e);
    }
    (order, align)
}

/// Compute the linear-scan order.
///
/// Panics under the same conditions as [`compute_code_emitting_order`].
pub fn compute_linear_scan_order<G: BlockGraph>(graph: &G, options: &OrderOptions) -> Vec<BlockId> {
    assert!(
        options.merge_penalty.is_finite() && options.merge_penalty > 0.0,
        "merge penalty must be positive, got {}",
        options.merge_penalty
    );

    let mut builder = TraceBuilder::new(graph);
    while let Some(seed) = builder.next_seed() {
        builder.add_linear_scan_trace(seed, options.merge_penalty);
    }
    let (order, _) = builder.finish();

    if let Err(e) = verify::check_order(graph, &order) {
        panic!("linear scan order: {}", e);
    }
    order
}

/// Compute both orders for one CFG
pub fn compute_block_orders<G: BlockGraph>(graph: &G, options: &OrderOptions) -> BlockOrder {
    let (code_emitting, align) = compute_code_emitting_order(graph);
    let linear_scan = compute_linear_scan_order(graph, options);

    if let Err(e) = verify::check_same_blocks(&code_emitting, &linear_scan) {
        panic!("{}", e);
    }

    if options.verify {
        if let Err(e) = verify::check_alignment(graph, &align) {
            panic!("{}", e);
        }
        // Sibling loops at the same depth can interleave through the
        // worklist, so this is reported rather than enforced.
        if let Err(e) = verify::check_loop_contiguity(graph, &code_emitting) {
            log::warn!("{}", e);
        }
    }

    log::debug!(
        "ordered {} blocks, {} aligned",
        code_emitting.len(),
        align.iter().filter(|&&a| a).count()
    );
    log::trace!("code emitting order: {:?}", code_emitting);
    log::trace!("linear scan order: {:?}", linear_scan);

    BlockOrder {
        code_emitting,
        linear_scan,
        align,
    }
}

/// Order independent graphs in parallel; results keep the input order
pub fn compute_block_orders_parallel<G: BlockGraph + Sync>(
    graphs: &[G],
    options: &OrderOptions,
) -> Vec<BlockOrder> {
    graphs
        .par_iter()
        .map(|graph| compute_block_orders(graph, options))
        .collect()
}
