//! CFG analysis module
//!
//! Natural loop detection on top of petgraph's dominator computation.

use crate::cfg::block::{Block, BlockId, LoopId};
use crate::error::{Error, Result};
use petgraph::algo::dominators::{self, Dominators};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Natural loop information
#[derive(Debug, Clone, Serialize)]
pub struct Loop {
    pub id: LoopId,
    pub header: BlockId,
    /// Member blocks sorted by id, header included
    pub blocks: Vec<BlockId>,
    /// Sources of the back edges into `header`, sorted by id
    pub loop_ends: Vec<BlockId>,
    /// Nesting depth of the loop, 1 for outermost loops
    pub depth: u32,
    pub parent: Option<LoopId>,
    pub inverted: bool,
}

impl Loop {
    /// Number of loop-end blocks of this loop
    pub fn num_backedges(&self) -> usize {
        self.loop_ends.len()
    }

    /// Check if a block belongs to this loop
    pub fn contains(&self, block: BlockId) -> bool {
        self.blocks.binary_search(&block).is_ok()
    }
}

/// Loop analysis results
#[derive(Debug, Clone, Default)]
pub struct LoopAnalysis {
    pub loops: Vec<Loop>,
    /// Loops containing a block, outermost first
    pub node_to_loops: HashMap<BlockId, Vec<LoopId>>,
}

impl LoopAnalysis {
    /// Get all loops containing a specific node, outermost first
    pub fn get_loops_containing_node(&self, node: BlockId) -> &[LoopId] {
        self.node_to_loops
            .get(&node)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Check if a node is part of any loop
    pub fn is_node_in_loop(&self, node: BlockId) -> bool {
        self.node_to_loops.contains_key(&node)
    }

    /// Get the innermost loop containing a node
    pub fn get_innermost_loop(&self, node: BlockId) -> Option<&Loop> {
        self.node_to_loops
            .get(&node)
            .and_then(|ids| ids.last())
            .map(|id| &self.loops[id.index()])
    }

    /// Number of loops containing a node
    pub fn loop_depth(&self, node: BlockId) -> u32 {
        self.get_loops_containing_node(node).len() as u32
    }
}

/// Dominator tree with pre/post numbering for constant time dominance queries
pub struct DominatorTree {
    pre: Vec<usize>,
    post: Vec<usize>,
}

impl DominatorTree {
    /// Number the tree given by `dominators`; unreachable nodes dominate nothing
    pub fn new(graph: &DiGraph<Block, ()>, dominators: &Dominators<NodeIndex>) -> Self {
        let count = graph.node_count();
        let mut children: Vec<Vec<NodeIndex>> = vec![Vec::new(); count];
        for node in graph.node_indices() {
            if let Some(idom) = dominators.immediate_dominator(node) {
                children[idom.index()].push(node);
            }
        }

        let mut pre = vec![usize::MAX; count];
        let mut post = vec![0; count];
        let mut clock = 0;
        let root = dominators.root();
        let mut stack = vec![(root, 0usize)];
        pre[root.index()] = clock;
        clock += 1;

        while let Some(top) = stack.len().checked_sub(1) {
            let (node, next_child) = stack[top];
            if let Some(&child) = children[node.index()].get(next_child) {
                stack[top].1 += 1;
                pre[child.index()] = clock;
                clock += 1;
                stack.push((child, 0));
            } else {
                post[node.index()] = clock;
                clock += 1;
                stack.pop();
            }
        }

        Self { pre, post }
    }

    /// Check if `dominator` dominates `node` (reflexive)
    pub fn dominates(&self, dominator: NodeIndex, node: NodeIndex) -> bool {
        let (d, n) = (dominator.index(), node.index());
        self.pre[d] != usize::MAX
            && self.pre[n] != usize::MAX
            && self.pre[d] <= self.pre[n]
            && self.post[n] <= self.post[d]
    }
}

/// Find all back edges as `(header, tail)` pairs, grouped by header
fn find_back_edges(
    graph: &DiGraph<Block, ()>,
    dominators: &DominatorTree,
) -> BTreeMap<NodeIndex, Vec<NodeIndex>> {
    let mut back_edges: BTreeMap<NodeIndex, Vec<NodeIndex>> = BTreeMap::new();

    for edge in graph.edge_references() {
        let (source, target) = (edge.source(), edge.target());
        if dominators.dominates(target, source) {
            back_edges.entry(target).or_default().push(source);
        }
    }

    for tails in back_edges.values_mut() {
        tails.sort();
        tails.dedup();
    }

    back_edges
}

/// Find a retreating edge of a depth-first walk from `entry` whose target
/// does not dominate its source. Such an edge enters a cycle through more
/// than one block, so the graph is irreducible.
fn find_irreducible_edge(
    graph: &DiGraph<Block, ()>,
    entry: NodeIndex,
    dominators: &DominatorTree,
) -> Option<(NodeIndex, NodeIndex)> {
    let count = graph.node_count();
    let mut discovered = vec![false; count];
    let mut on_stack = vec![false; count];
    let successors: Vec<Vec<NodeIndex>> = graph
        .node_indices()
        .map(|n| graph[n].successors.iter().map(|s| NodeIndex::new(s.index())).collect())
        .collect();

    let mut stack = vec![(entry, 0usize)];
    discovered[entry.index()] = true;
    on_stack[entry.index()] = true;

    while let Some(top) = stack.len().checked_sub(1) {
        let (node, next_succ) = stack[top];
        match successors[node.index()].get(next_succ) {
            Some(&succ) => {
                stack[top].1 += 1;
                if on_stack[succ.index()] {
                    if !dominators.dominates(succ, node) {
                        return Some((node, succ));
                    }
                } else if !discovered[succ.index()] {
                    discovered[succ.index()] = true;
                    on_stack[succ.index()] = true;
                    stack.push((succ, 0));
                }
            }
            None => {
                on_stack[node.index()] = false;
                stack.pop();
            }
        }
    }

    None
}

/// Compute the body of the natural loop formed by all back edges into `header`
fn compute_loop_body(
    graph: &DiGraph<Block, ()>,
    header: NodeIndex,
    tails: &[NodeIndex],
    dominators: &DominatorTree,
) -> HashSet<NodeIndex> {
    let mut loop_body = HashSet::new();
    loop_body.insert(header);

    let mut worklist: Vec<NodeIndex> = tails.to_vec();
    while let Some(node) = worklist.pop() {
        if !loop_body.insert(node) {
            continue;
        }
        for pred in graph.neighbors_directed(node, petgraph::Direction::Incoming) {
            if !loop_body.contains(&pred) && dominators.dominates(header, pred) {
                worklist.push(pred);
            }
        }
    }

    loop_body
}

/// Detect natural loops reachable from `entry`.
///
/// Loops are numbered by ascending header id. A loop is inverted when
/// `inverted_overrides` says so for its header, otherwise when its single
/// loop end also leaves the loop (a bottom-tested loop).
///
/// Fails on irreducible graphs: every cycle must be entered through a
/// single header.
pub fn find_natural_loops(
    graph: &DiGraph<Block, ()>,
    entry: NodeIndex,
    inverted_overrides: &HashMap<BlockId, bool>,
) -> Result<LoopAnalysis> {
    if graph.node_count() == 0 {
        return Ok(LoopAnalysis::default());
    }

    let dominators = DominatorTree::new(graph, &dominators::simple_fast(graph, entry));
    if let Some((from, to)) = find_irreducible_edge(graph, entry, &dominators) {
        return Err(Error::invalid_graph(format!(
            "graph is irreducible: cycle edge B{} -> B{} is not a back edge",
            from.index(),
            to.index()
        )));
    }

    let back_edges = find_back_edges(graph, &dominators);

    let mut bodies = Vec::with_capacity(back_edges.len());
    for (&header, tails) in &back_edges {
        let body = compute_loop_body(graph, header, tails, &dominators);
        log::trace!(
            "natural loop at B{}: {} blocks, {} back edges",
            header.index(),
            body.len(),
            tails.len()
        );
        bodies.push((header, tails, body));
    }

    let mut node_to_loops: HashMap<BlockId, Vec<LoopId>> = HashMap::new();
    for (idx, (_, _, body)) in bodies.iter().enumerate() {
        for node in body {
            node_to_loops
                .entry(BlockId(node.index()))
                .or_default()
                .push(LoopId(idx));
        }
    }

    // Loops nest properly, so a loop's depth is the number of loops
    // containing its header.
    let loop_depth = |header: NodeIndex| -> u32 {
        node_to_loops
            .get(&BlockId(header.index()))
            .map(|ids| ids.len() as u32)
            .unwrap_or(0)
    };
    let depths: Vec<u32> = bodies
        .iter()
        .map(|(header, _, _)| loop_depth(*header))
        .collect();

    for ids in node_to_loops.values_mut() {
        ids.sort_by_key(|id| depths[id.index()]);
    }

    let mut loops = Vec::with_capacity(bodies.len());
    for (idx, (header, tails, body)) in bodies.into_iter().enumerate() {
        let header_id = BlockId(header.index());

        let parent = node_to_loops.get(&header_id).and_then(|ids| {
            ids.iter()
                .rev()
                .copied()
                .find(|&other| other != LoopId(idx))
        });

        let mut blocks: Vec<BlockId> = body.iter().map(|n| BlockId(n.index())).collect();
        blocks.sort();
        let loop_ends: Vec<BlockId> = tails.iter().map(|n| BlockId(n.index())).collect();

        let inverted = match inverted_overrides.get(&header_id) {
            Some(&inverted) => inverted,
            None => {
                loop_ends.len() == 1
                    && graph
                        .neighbors_directed(tails[0], petgraph::Direction::Outgoing)
                        .any(|succ| !body.contains(&succ))
            }
        };

        loops.push(Loop {
            id: LoopId(idx),
            header: header_id,
            blocks,
            loop_ends,
            depth: depths[idx],
            parent,
            inverted,
        });
    }

    log::debug!("loop analysis found {} loops", loops.len());

    Ok(LoopAnalysis {
        loops,
        node_to_loops,
    })
}
