//! Basic block module
//!
//! This module contains the Block struct and the id types used to refer to
//! blocks and loops.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense block identifier, `0..block_count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Dense loop identifier, index into the loop table of a CFG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoopId(pub usize);

impl LoopId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Basic block with its edges and loop membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Id of this block
    pub id: BlockId,
    /// Successors in edge insertion order
    pub successors: Vec<BlockId>,
    /// Predecessors in edge insertion order
    pub predecessors: Vec<BlockId>,
    /// Relative execution frequency
    pub probability: f64,
    /// Number of loops containing this block (0 = not in a loop)
    pub loop_depth: u32,
    /// Innermost enclosing loop
    pub loop_id: Option<LoopId>,
    pub is_loop_header: bool,
    /// Source of a backward edge to a loop header
    pub is_loop_end: bool,
}

impl Block {
    /// Create a new block without edges or loop information
    pub fn new(id: BlockId, probability: f64) -> Self {
        Self {
            id,
            successors: Vec::new(),
            predecessors: Vec::new(),
            probability,
            loop_depth: 0,
            loop_id: None,
            is_loop_header: false,
            is_loop_end: false,
        }
    }

    /// Check if this block has more than one predecessor
    pub fn is_merge(&self) -> bool {
        self.predecessors.len() > 1
    }

    /// Check if this block ends the method
    pub fn is_terminating(&self) -> bool {
        self.successors.is_empty()
    }
}
