use crate::cfg::{BlockGraph, GraphDescription};
use crate::cli::utils;
use crate::error::Result;
use std::path::Path;

/// Print blocks and loop structure of a graph
pub fn inspect(input_path: &Path, normalized_json: bool) -> Result<()> {
    let cfg = utils::load_cfg(input_path)?;

    if normalized_json {
        let json = GraphDescription::from(&cfg).to_json()?;
        println!("{}", json);
        return Ok(());
    }

    println!("=== CFG {} ===", cfg.name().unwrap_or("<unnamed>"));
    println!("  Total blocks: {}", cfg.block_count());
    println!("  Total edges: {}", cfg.graph().edge_count());
    println!("  Loops: {}", cfg.loop_count());
    println!();

    for block in cfg.blocks() {
        let mut flags = Vec::new();
        if block.is_loop_header {
            flags.push("header");
        }
        if block.is_loop_end {
            flags.push("loop-end");
        }
        println!(
            "  {}: p={} depth={} loop={} succs=[{}]{}",
            block.id,
            block.probability,
            block.loop_depth,
            block
                .loop_id
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string()),
            block
                .successors
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            }
        );
    }

    for l in cfg.loops() {
        println!();
        println!(
            "  Loop {}: header {} depth {}{}{}",
            l.id,
            l.header,
            l.depth,
            l.parent
                .map(|p| format!(" parent {}", p))
                .unwrap_or_default(),
            if l.inverted { " (inverted)" } else { "" }
        );
        println!(
            "    Blocks: {}",
            l.blocks
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
        println!(
            "    Loop ends: {}",
            l.loop_ends
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    Ok(())
}
