//! blockorder-rs: probability-guided basic block ordering
//!
//! Given a control flow graph with loop structure and block execution
//! probabilities, this library computes the block order used for machine
//! code emission, the order used by a linear-scan register allocator, and
//! the blocks whose start should be aligned.

pub mod cfg;
pub mod cli;
pub mod config;
pub mod error;
pub mod order;

pub use error::{Error as BlockOrderError, Result as BlockOrderResult};

// Re-export commonly used types
pub use cfg::{Block, BlockGraph, BlockId, Cfg, CfgBuilder, GraphDescription, LoopId};
pub use config::{OrderOptions, DEFAULT_MERGE_PENALTY};
pub use order::{
    compute_block_orders, compute_block_orders_parallel, compute_code_emitting_order,
    compute_linear_scan_order, BlockOrder,
};
