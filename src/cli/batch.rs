//! Order many graphs at once
//!
//! Each graph is loaded and ordered independently on the rayon pool; the
//! summary is printed in input order.

use crate::cli::utils;
use crate::order::compute_block_orders;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::PathBuf;

/// Summary of one ordered graph
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub blocks: usize,
    pub loops: usize,
    pub aligned: usize,
    pub code_emitting: Vec<usize>,
    pub linear_scan: Vec<usize>,
}

/// Load and order every input; the first failure aborts the batch
pub fn order_all(
    inputs: &[PathBuf],
    config: Option<&std::path::Path>,
    merge_penalty: Option<f64>,
) -> Result<Vec<BatchEntry>> {
    let options = utils::resolve_options(config, merge_penalty, false)
        .context("Failed to resolve ordering options")?;

    inputs
        .par_iter()
        .map(|path| -> Result<BatchEntry> {
            let cfg = utils::load_cfg(path)
                .with_context(|| format!("Failed to load graph {}", path.display()))?;
            let order = compute_block_orders(&cfg, &options);
            Ok(BatchEntry {
                path: path.clone(),
                blocks: cfg.graph().node_count(),
                loops: cfg.loops().len(),
                aligned: order.aligned_blocks().len(),
                code_emitting: order.code_emitting.iter().map(|b| b.index()).collect(),
                linear_scan: order.linear_scan.iter().map(|b| b.index()).collect(),
            })
        })
        .collect()
}

/// Run the batch subcommand
pub fn batch(
    inputs: &[PathBuf],
    config: Option<&std::path::Path>,
    merge_penalty: Option<f64>,
    json: bool,
) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input graphs given");
    }

    let entries = order_all(inputs, config, merge_penalty)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}: {} blocks, {} loops, {} aligned, emit {:?}, lsra {:?}",
            entry.path.display(),
            entry.blocks,
            entry.loops,
            entry.aligned,
            entry.code_emitting,
            entry.linear_scan
        );
    }
    Ok(())
}
