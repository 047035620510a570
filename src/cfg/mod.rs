//! Control Flow Graph (CFG) module
//!
//! This module holds the block graph the ordering runs on: blocks, their
//! edges and the natural loops found by dominator analysis.

pub mod analysis;
pub mod block;
pub mod builder;
pub mod description;
pub mod graph;
pub mod visualization;

use crate::cfg::analysis::{Loop, LoopAnalysis};
use crate::order::BlockOrder;
use petgraph::graph::{DiGraph, NodeIndex};

/// Main CFG struct that provides high-level interface
#[derive(Debug, Clone)]
pub struct Cfg {
    /// The underlying graph; node index `i` holds block `Bi`
    graph: DiGraph<Block, ()>,
    /// Loops found by the builder
    loops: LoopAnalysis,
    name: Option<String>,
}

impl Cfg {
    pub(crate) fn from_parts(
        graph: DiGraph<Block, ()>,
        loops: LoopAnalysis,
        name: Option<String>,
    ) -> Self {
        Self { graph, loops, name }
    }

    /// Get the underlying graph
    pub fn graph(&self) -> &DiGraph<Block, ()> {
        &self.graph
    }

    /// Name given to the graph, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Rename the graph
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Get a block by id
    pub fn block(&self, id: BlockId) -> &Block {
        &self.graph[NodeIndex::new(id.index())]
    }

    /// Iterate over all blocks in id order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.graph.node_weights()
    }

    /// All loops, indexed by `LoopId`
    pub fn loops(&self) -> &[Loop] {
        &self.loops.loops
    }

    /// Get a loop by id
    pub fn get_loop(&self, id: LoopId) -> &Loop {
        &self.loops.loops[id.index()]
    }

    /// Loop analysis results
    pub fn loop_analysis(&self) -> &LoopAnalysis {
        &self.loops
    }

    /// Check if the CFG has no cycles
    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Export CFG to DOT format for visualization
    pub fn to_dot(&self) -> String {
        visualization::generate_dot(self, None, &visualization::DotOptions::default())
    }

    /// Export CFG to DOT format annotated with a computed block order
    pub fn to_dot_with_order(&self, order: &BlockOrder) -> String {
        visualization::generate_dot(self, Some(order), &visualization::DotOptions::default())
    }
}

impl BlockGraph for Cfg {
    fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    fn start_block(&self) -> BlockId {
        BlockId(0)
    }

    fn successors(&self, block: BlockId) -> &[BlockId] {
        &self.block(block).successors
    }

    fn predecessors(&self, block: BlockId) -> &[BlockId] {
        &self.block(block).predecessors
    }

    fn loop_depth(&self, block: BlockId) -> u32 {
        self.block(block).loop_depth
    }

    fn loop_of(&self, block: BlockId) -> Option<LoopId> {
        self.block(block).loop_id
    }

    fn is_loop_header(&self, block: BlockId) -> bool {
        self.block(block).is_loop_header
    }

    fn is_loop_end(&self, block: BlockId) -> bool {
        self.block(block).is_loop_end
    }

    fn probability(&self, block: BlockId) -> f64 {
        self.block(block).probability
    }

    fn loop_header(&self, loop_id: LoopId) -> BlockId {
        self.get_loop(loop_id).header
    }

    fn loop_blocks(&self, loop_id: LoopId) -> &[BlockId] {
        &self.get_loop(loop_id).blocks
    }

    fn loop_parent(&self, loop_id: LoopId) -> Option<LoopId> {
        self.get_loop(loop_id).parent
    }

    fn num_backedges(&self, loop_id: LoopId) -> usize {
        self.get_loop(loop_id).num_backedges()
    }

    fn is_inverted(&self, loop_id: LoopId) -> bool {
        self.get_loop(loop_id).inverted
    }

    fn loop_count(&self) -> usize {
        self.loops.loops.len()
    }
}

// Re-export main types for convenience
pub use block::{Block, BlockId, LoopId};
pub use builder::CfgBuilder;
pub use description::{BlockDescription, GraphDescription};
pub use graph::BlockGraph;
