//! CFG visualization module
//!
//! This module contains DOT export for CFGs, optionally annotated with a
//! computed block order.

use crate::cfg::{Block, BlockGraph, BlockId, Cfg};
use crate::order::BlockOrder;
use std::collections::HashMap;

/// Edge classification used for DOT styling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Edge staying at the same or a deeper loop depth
    Forward,
    /// Edge from a loop end to its header
    Back,
    /// Edge leaving a loop
    Exit,
}

/// Classify the edge `from -> to`
pub fn classify_edge<G: BlockGraph>(graph: &G, from: BlockId, to: BlockId) -> EdgeKind {
    let is_back = graph.is_loop_end(from)
        && graph.is_loop_header(to)
        && graph
            .loop_of(to)
            .map(|l| graph.loop_blocks(l).contains(&from))
            .unwrap_or(false);
    if is_back {
        EdgeKind::Back
    } else if graph.loop_depth(to) < graph.loop_depth(from) {
        EdgeKind::Exit
    } else {
        EdgeKind::Forward
    }
}

/// DOT generation options
#[derive(Debug, Clone)]
pub struct DotOptions {
    /// Include edge labels
    pub include_labels: bool,
    /// Include edge colors
    pub include_colors: bool,
    /// Include probability and loop depth in node labels
    pub include_node_details: bool,
    /// Draw each loop as a cluster
    pub cluster_loops: bool,
}

impl Default for DotOptions {
    fn default() -> Self {
        Self {
            include_labels: true,
            include_colors: true,
            include_node_details: true,
            cluster_loops: true,
        }
    }
}

/// Generate DOT representation of a CFG
pub fn generate_dot(cfg: &Cfg, order: Option<&BlockOrder>, options: &DotOptions) -> String {
    let mut dot = String::new();
    dot.push_str(&format!(
        "digraph \"{}\" {{\n",
        cfg.name().unwrap_or("CFG").replace('"', "'")
    ));
    dot.push_str("  rankdir=TB;\n");
    dot.push_str("  node [shape=box];\n\n");

    let positions: HashMap<BlockId, (usize, usize)> = order
        .map(|o| {
            let lsra: HashMap<BlockId, usize> = o
                .linear_scan
                .iter()
                .enumerate()
                .map(|(i, b)| (*b, i))
                .collect();
            o.code_emitting
                .iter()
                .enumerate()
                .map(|(i, b)| (*b, (i, lsra.get(b).copied().unwrap_or(usize::MAX))))
                .collect()
        })
        .unwrap_or_default();

    if options.cluster_loops {
        // Only outermost loops are emitted here, nested ones recurse.
        for l in cfg.loops().iter().filter(|l| l.parent.is_none()) {
            write_loop_cluster(&mut dot, cfg, l.id, 1);
        }
        dot.push('\n');
    }

    for block in cfg.blocks() {
        let label = format_block_label(block, positions.get(&block.id), options);
        let mut attributes = vec![format!("label=\"{}\"", label)];
        if order.map(|o| o.is_aligned(block.id)).unwrap_or(false) {
            attributes.push("style=bold".to_string());
            attributes.push("color=\"blue\"".to_string());
        }
        dot.push_str(&format!(
            "  {} [{}];\n",
            block.id.index(),
            attributes.join(", ")
        ));
    }

    dot.push('\n');

    for block in cfg.blocks() {
        for &succ in &block.successors {
            let kind = classify_edge(cfg, block.id, succ);
            let mut edge_str = format!("  {} -> {}", block.id.index(), succ.index());
            let mut attributes = Vec::new();

            if options.include_labels {
                if let Some(label) = get_edge_label(kind) {
                    attributes.push(format!("label=\"{}\"", label));
                }
            }
            if options.include_colors {
                attributes.push(format!("color=\"{}\"", get_edge_color(kind)));
            }
            if !attributes.is_empty() {
                edge_str.push_str(&format!(" [{}]", attributes.join(", ")));
            }

            edge_str.push_str(";\n");
            dot.push_str(&edge_str);
        }
    }

    dot.push_str("}\n");
    dot
}

fn write_loop_cluster(dot: &mut String, cfg: &Cfg, loop_id: crate::cfg::LoopId, indent: usize) {
    let pad = "  ".repeat(indent);
    let l = cfg.get_loop(loop_id);
    dot.push_str(&format!("{}subgraph cluster_loop{} {{\n", pad, loop_id.index()));
    dot.push_str(&format!(
        "{}  label=\"loop {} (depth {})\";\n",
        pad, l.header, l.depth
    ));
    dot.push_str(&format!("{}  style=dashed;\n", pad));
    for &block in &l.blocks {
        if cfg.loop_of(block) == Some(loop_id) {
            dot.push_str(&format!("{}  {};\n", pad, block.index()));
        }
    }
    for child in cfg.loops().iter().filter(|c| c.parent == Some(loop_id)) {
        write_loop_cluster(dot, cfg, child.id, indent + 1);
    }
    dot.push_str(&format!("{}}}\n", pad));
}

/// Format a block label for DOT
fn format_block_label(
    block: &Block,
    position: Option<&(usize, usize)>,
    options: &DotOptions,
) -> String {
    let mut label = format!("{}", block.id);
    if block.is_loop_header {
        label.push_str(" (header)");
    }
    if block.is_loop_end {
        label.push_str(" (loop end)");
    }
    if options.include_node_details {
        label.push_str(&format!(
            "\\np={} depth={}",
            block.probability, block.loop_depth
        ));
    }
    if let Some((emit, lsra)) = position {
        label.push_str(&format!("\\nemit #{} lsra #{}", emit, lsra));
    }
    label
}

/// Get edge label for DOT
fn get_edge_label(kind: EdgeKind) -> Option<&'static str> {
    match kind {
        EdgeKind::Back => Some("back"),
        EdgeKind::Exit => Some("exit"),
        EdgeKind::Forward => None,
    }
}

/// Get edge color for DOT
fn get_edge_color(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Forward => "black",
        EdgeKind::Back => "red",
        EdgeKind::Exit => "gray",
    }
}
