//! CFG builder module
//!
//! Collects blocks and edges, validates them and runs loop analysis to
//! produce a [`Cfg`].

use crate::cfg::analysis::{self, LoopAnalysis};
use crate::cfg::block::{Block, BlockId};
use crate::cfg::Cfg;
use crate::error::{Error, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use std::collections::{HashMap, HashSet};

/// Incremental CFG construction
#[derive(Debug, Clone, Default)]
pub struct CfgBuilder {
    probabilities: Vec<f64>,
    edges: Vec<(BlockId, BlockId)>,
    inverted: HashMap<BlockId, bool>,
    name: Option<String>,
}

impl CfgBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the graph, used in diagnostics and DOT output
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a block and return its id. The first block is the start block.
    pub fn add_block(&mut self, probability: f64) -> BlockId {
        let id = BlockId(self.probabilities.len());
        self.probabilities.push(probability);
        id
    }

    /// Add an edge; successor order follows insertion order
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) -> &mut Self {
        self.edges.push((from, to));
        self
    }

    /// Force the inverted flag of the loop headed by `header`
    pub fn set_inverted(&mut self, header: BlockId, inverted: bool) -> &mut Self {
        self.inverted.insert(header, inverted);
        self
    }

    /// Validate the collected blocks and edges and build the CFG
    pub fn build(&self) -> Result<Cfg> {
        if self.probabilities.is_empty() {
            return Err(Error::invalid_graph("graph has no blocks"));
        }

        let mut graph: DiGraph<Block, ()> = DiGraph::with_capacity(
            self.probabilities.len(),
            self.edges.len(),
        );
        for (index, &probability) in self.probabilities.iter().enumerate() {
            if !probability.is_finite() || probability < 0.0 {
                return Err(Error::invalid_graph(format!(
                    "block B{} has invalid probability {}",
                    index, probability
                )));
            }
            graph.add_node(Block::new(BlockId(index), probability));
        }

        let mut seen = HashSet::with_capacity(self.edges.len());
        for &(from, to) in &self.edges {
            for endpoint in [from, to] {
                if endpoint.index() >= self.probabilities.len() {
                    return Err(Error::invalid_graph(format!(
                        "edge {} -> {} references unknown block {}",
                        from, to, endpoint
                    )));
                }
            }
            if !seen.insert((from, to)) {
                return Err(Error::invalid_graph(format!(
                    "duplicate edge {} -> {}",
                    from, to
                )));
            }
            graph.add_edge(NodeIndex::new(from.index()), NodeIndex::new(to.index()), ());
            graph[NodeIndex::new(from.index())].successors.push(to);
            graph[NodeIndex::new(to.index())].predecessors.push(from);
        }

        let entry = NodeIndex::new(0);
        let mut reached = vec![false; graph.node_count()];
        let mut bfs = Bfs::new(&graph, entry);
        while let Some(node) = bfs.next(&graph) {
            reached[node.index()] = true;
        }
        if let Some(unreachable) = reached.iter().position(|&r| !r) {
            return Err(Error::invalid_graph(format!(
                "block B{} is unreachable from the start block",
                unreachable
            )));
        }

        let loops = analysis::find_natural_loops(&graph, entry, &self.inverted)?;
        for header in self.inverted.keys() {
            if !loops.loops.iter().any(|l| l.header == *header) {
                log::warn!("inverted flag on {} ignored: not a loop header", header);
            }
        }
        annotate_loops(&mut graph, &loops);

        log::debug!(
            "built CFG{}: {} blocks, {} edges, {} loops",
            self.name
                .as_deref()
                .map(|n| format!(" '{}'", n))
                .unwrap_or_default(),
            graph.node_count(),
            graph.edge_count(),
            loops.loops.len()
        );

        Ok(Cfg::from_parts(graph, loops, self.name.clone()))
    }
}

/// Copy loop membership onto the blocks
fn annotate_loops(graph: &mut DiGraph<Block, ()>, loops: &LoopAnalysis) {
    for node in graph.node_indices() {
        let id = BlockId(node.index());
        let block = &mut graph[node];
        block.loop_depth = loops.loop_depth(id);
        block.loop_id = loops.get_innermost_loop(id).map(|l| l.id);
    }
    for l in &loops.loops {
        graph[NodeIndex::new(l.header.index())].is_loop_header = true;
        for end in &l.loop_ends {
            graph[NodeIndex::new(end.index())].is_loop_end = true;
        }
    }
}
