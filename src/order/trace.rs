//! Greedy trace construction.
//!
//! A trace starts at a seed block and keeps following the most likely
//! successor that does not leave the current loop depth. Every other
//! successor is queued on the worklist and seeds a trace of its own later.
//!
//! Two variants share this walk:
//!
//! * the code-emitting trace moves a loop header that has a single loop end
//!   behind that loop end, so the backward jump becomes the conditional
//!   branch at the bottom of the loop, and records alignment requests for
//!   backward branch targets;
//! * the linear-scan trace emits blocks where they are reached, but stops in
//!   front of a merge block while too much of the merge's incoming
//!   probability is still unscheduled.

use crate::cfg::{BlockGraph, BlockId, LoopId};
use crate::order::worklist::Worklist;

/// A loop header that is emitted behind its loop end instead of in front of
/// the loop body.
pub fn is_skippable_header<G: BlockGraph>(graph: &G, block: BlockId) -> bool {
    if !graph.is_loop_header(block) || graph.is_loop_end(block) {
        return false;
    }
    let loop_id = graph
        .loop_of(block)
        .unwrap_or_else(|| panic!("loop header {} has no loop", block));
    assert_eq!(
        graph.loop_header(loop_id),
        block,
        "innermost loop of header {} is headed by another block",
        block
    );
    graph.num_backedges(loop_id) == 1
}

/// Whether `block` lies in `loop_id` or in a loop nested inside it
fn loop_contains<G: BlockGraph>(graph: &G, loop_id: LoopId, block: BlockId) -> bool {
    let mut current = graph.loop_of(block);
    while let Some(l) = current {
        if l == loop_id {
            return true;
        }
        current = graph.loop_parent(l);
    }
    false
}

/// Per-invocation ordering state: output, visited/ordered bitsets, alignment
/// requests and the worklist.
pub struct TraceBuilder<'g, G: BlockGraph> {
    graph: &'g G,
    order: Vec<BlockId>,
    /// Set once a block is queued or chosen as a trace successor
    visited: Vec<bool>,
    /// Set once a block is in `order`
    ordered: Vec<bool>,
    align: Vec<bool>,
    worklist: Worklist,
}

impl<'g, G: BlockGraph> TraceBuilder<'g, G> {
    /// Start with only the start block visited and queued
    pub fn new(graph: &'g G) -> Self {
        let count = graph.block_count();
        let mut builder = Self {
            graph,
            order: Vec::with_capacity(count),
            visited: vec![false; count],
            ordered: vec![false; count],
            align: vec![false; count],
            worklist: Worklist::new(),
        };
        let start = graph.start_block();
        builder.visited[start.index()] = true;
        builder.worklist.push(graph, start);
        builder
    }

    /// Next trace seed, `None` when every reachable block has been handled
    pub fn next_seed(&mut self) -> Option<BlockId> {
        self.worklist.pop()
    }

    /// Order produced so far
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    /// Consume the builder, returning the order and the alignment table
    pub fn finish(self) -> (Vec<BlockId>, Vec<bool>) {
        (self.order, self.align)
    }

    /// Grow a code-emitting trace from `seed`
    pub fn add_code_emitting_trace(&mut self, seed: BlockId) {
        let graph = self.graph;
        let mut current = Some(seed);

        while let Some(block) = current {
            if self.ordered[block.index()] {
                break;
            }

            if !is_skippable_header(graph, block) {
                // Unskipped headers are the target of the backward jump.
                if graph.is_loop_header(block) {
                    self.align[block.index()] = true;
                }
                self.emit(block);
            } else {
                log::trace!("deferring loop header {} behind its loop end", block);
            }

            if graph.is_loop_end(block) {
                self.place_skipped_header(block);
            }

            let next = self.most_likely_successor(block);
            self.enqueue_successors(block, next);
            if let Some(next) = next {
                self.visited[next.index()] = true;
            }
            current = next;
        }
    }

    /// Grow a linear-scan trace from `seed`
    pub fn add_linear_scan_trace(&mut self, seed: BlockId, merge_penalty: f64) {
        let mut current = Some(seed);

        while let Some(block) = current {
            if self.ordered[block.index()] {
                break;
            }
            self.emit(block);

            let next = self.most_likely_successor(block);
            self.enqueue_successors(block, next);
            current = match next {
                Some(next) if self.defer_merge(next, merge_penalty) => {
                    log::trace!("deferring merge {} reached from {}", next, block);
                    None
                }
                Some(next) => {
                    self.visited[next.index()] = true;
                    Some(next)
                }
                None => None,
            };
        }
    }

    fn emit(&mut self, block: BlockId) {
        assert!(
            !self.ordered[block.index()],
            "Cannot insert block {} twice",
            block
        );
        self.order.push(block);
        self.ordered[block.index()] = true;
        self.visited[block.index()] = true;
    }

    /// Emit every skipped header whose loop `loop_end` closes right after it.
    /// A latch can close several loops at once: the innermost one and any
    /// enclosing loop it jumps back to.
    fn place_skipped_header(&mut self, loop_end: BlockId) {
        let graph = self.graph;
        let depth = graph.loop_depth(loop_end);
        assert!(depth >= 1, "loop end {} is not inside a loop", loop_end);

        for &succ in graph.successors(loop_end) {
            if self.ordered[succ.index()] || !is_skippable_header(graph, succ) {
                continue;
            }
            let loop_id = graph
                .loop_of(succ)
                .unwrap_or_else(|| panic!("loop header {} has no loop", succ));
            if !loop_contains(graph, loop_id, loop_end) {
                // Entry edge into another loop, not a back edge.
                continue;
            }
            assert!(
                self.visited[succ.index()],
                "loop end {} reached before its header {}",
                loop_end,
                succ
            );

            self.emit(succ);
            self.align[succ.index()] = true;

            // Never taken for a `Cfg`: there a one-block loop is a self-loop,
            // whose header is not skippable.
            if !(graph.is_inverted(loop_id) && graph.loop_blocks(loop_id).len() < 2) {
                // The header's successors are what the backward jump
                // actually lands on.
                for &target in graph.successors(succ) {
                    if graph.loop_depth(target) == depth {
                        self.align[target.index()] = true;
                    }
                }
            }
        }
    }

    /// Most probable unvisited successor at the same or a deeper loop depth.
    /// Later successors win ties.
    fn most_likely_successor(&self, block: BlockId) -> Option<BlockId> {
        let graph = self.graph;
        let depth = graph.loop_depth(block);
        let mut result: Option<BlockId> = None;

        for &succ in graph.successors(block) {
            let probability = graph.probability(succ);
            debug_assert!(
                probability >= 0.0,
                "Probabilities must be positive: {} has {}",
                succ,
                probability
            );
            if self.visited[succ.index()] || graph.loop_depth(succ) < depth {
                continue;
            }
            if result.map_or(true, |best| probability >= graph.probability(best)) {
                result = Some(succ);
            }
        }

        result
    }

    fn enqueue_successors(&mut self, block: BlockId, except: Option<BlockId>) {
        let graph = self.graph;
        for &succ in graph.successors(block) {
            if Some(succ) == except || self.visited[succ.index()] {
                continue;
            }
            self.visited[succ.index()] = true;
            self.worklist.push(graph, succ);
        }
    }

    /// Whether a merge block should wait for more of its predecessors
    fn defer_merge(&self, block: BlockId, merge_penalty: f64) -> bool {
        let graph = self.graph;
        if graph.is_loop_header(block) || graph.predecessors(block).len() <= 1 {
            return false;
        }

        let mut scheduled = 0.0;
        let mut unscheduled = 0.0;
        for &pred in graph.predecessors(block) {
            if self.ordered[pred.index()] {
                scheduled += graph.probability(pred);
            } else {
                unscheduled += graph.probability(pred);
            }
        }

        unscheduled > scheduled / merge_penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{Cfg, CfgBuilder};

    fn ids(raw: &[usize]) -> Vec<BlockId> {
        raw.iter().map(|&i| BlockId(i)).collect()
    }

    /// B0 -> B1 (header) -> B2 (loop end) -> B1, B1 -> B3 exit
    fn simple_loop() -> Cfg {
        let mut builder = CfgBuilder::new();
        let b: Vec<BlockId> = [1.0, 10.0, 9.0, 1.0]
            .iter()
            .map(|&p| builder.add_block(p))
            .collect();
        builder
            .add_edge(b[0], b[1])
            .add_edge(b[1], b[2])
            .add_edge(b[1], b[3])
            .add_edge(b[2], b[1]);
        builder.build().unwrap()
    }

    #[test]
    fn test_skippable_header() {
        let cfg = simple_loop();
        assert!(is_skippable_header(&cfg, BlockId(1)));
        assert!(!is_skippable_header(&cfg, BlockId(0)));
        assert!(!is_skippable_header(&cfg, BlockId(2)));
    }

    #[test]
    fn test_self_loop_header_is_not_skippable() {
        let mut builder = CfgBuilder::new();
        let b0 = builder.add_block(1.0);
        let b1 = builder.add_block(5.0);
        let b2 = builder.add_block(1.0);
        builder.add_edge(b0, b1).add_edge(b1, b1).add_edge(b1, b2);
        let cfg = builder.build().unwrap();
        assert!(cfg.block(b1).is_loop_header);
        assert!(cfg.block(b1).is_loop_end);
        assert!(!is_skippable_header(&cfg, b1));
    }

    #[test]
    fn test_code_emitting_trace_moves_header_behind_loop_end() {
        let cfg = simple_loop();
        let mut builder = TraceBuilder::new(&cfg);
        let seed = builder.next_seed().unwrap();
        assert_eq!(seed, BlockId(0));
        builder.add_code_emitting_trace(seed);
        // The exit was queued, not followed: it is shallower than the header.
        assert_eq!(builder.order(), ids(&[0, 2, 1]).as_slice());
        assert_eq!(builder.next_seed(), Some(BlockId(3)));
        assert_eq!(builder.next_seed(), None);
    }

    #[test]
    fn test_linear_scan_trace_keeps_header_in_front() {
        let cfg = simple_loop();
        let mut builder = TraceBuilder::new(&cfg);
        let seed = builder.next_seed().unwrap();
        builder.add_linear_scan_trace(seed, 10.0);
        assert_eq!(builder.order(), ids(&[0, 1, 2]).as_slice());
        let (_, align) = builder.finish();
        assert!(align.iter().all(|&a| !a));
    }

    #[test]
    fn test_later_successor_wins_probability_tie() {
        let mut builder = CfgBuilder::new();
        let a = builder.add_block(1.0);
        let b = builder.add_block(0.5);
        let c = builder.add_block(0.5);
        builder.add_edge(a, b).add_edge(a, c);
        let cfg = builder.build().unwrap();

        let trace = TraceBuilder::new(&cfg);
        assert_eq!(trace.most_likely_successor(a), Some(c));
    }

    #[test]
    fn test_merge_deferred_until_predecessors_scheduled() {
        // Diamond: A -> B, A -> C, B -> D, C -> D
        let mut builder = CfgBuilder::new();
        let a = builder.add_block(1.0);
        let b = builder.add_block(0.5);
        let c = builder.add_block(0.5);
        let d = builder.add_block(1.0);
        builder
            .add_edge(a, b)
            .add_edge(a, c)
            .add_edge(b, d)
            .add_edge(c, d);
        let cfg = builder.build().unwrap();

        let mut trace = TraceBuilder::new(&cfg);
        let seed = trace.next_seed().unwrap();
        trace.add_linear_scan_trace(seed, 10.0);
        assert_eq!(trace.order(), &[a, c]);
        assert!(trace.defer_merge(d, 10.0));
        // A tiny penalty makes any scheduled mass dominate.
        assert!(!trace.defer_merge(d, 0.01));
    }

    /// Delegates to a `Cfg`, with some answers replaced
    struct PatchedGraph {
        cfg: Cfg,
        negative: Option<BlockId>,
        single_block_inverted: Option<LoopId>,
    }

    impl PatchedGraph {
        fn new(cfg: Cfg) -> Self {
            Self {
                cfg,
                negative: None,
                single_block_inverted: None,
            }
        }
    }

    impl BlockGraph for PatchedGraph {
        fn block_count(&self) -> usize {
            self.cfg.block_count()
        }
        fn start_block(&self) -> BlockId {
            self.cfg.start_block()
        }
        fn successors(&self, block: BlockId) -> &[BlockId] {
            self.cfg.successors(block)
        }
        fn predecessors(&self, block: BlockId) -> &[BlockId] {
            self.cfg.predecessors(block)
        }
        fn loop_depth(&self, block: BlockId) -> u32 {
            self.cfg.loop_depth(block)
        }
        fn loop_of(&self, block: BlockId) -> Option<LoopId> {
            self.cfg.loop_of(block)
        }
        fn is_loop_header(&self, block: BlockId) -> bool {
            self.cfg.is_loop_header(block)
        }
        fn is_loop_end(&self, block: BlockId) -> bool {
            self.cfg.is_loop_end(block)
        }
        fn probability(&self, block: BlockId) -> f64 {
            if self.negative == Some(block) {
                -1.0
            } else {
                self.cfg.probability(block)
            }
        }
        fn loop_header(&self, loop_id: LoopId) -> BlockId {
            self.cfg.loop_header(loop_id)
        }
        fn loop_blocks(&self, loop_id: LoopId) -> &[BlockId] {
            if self.single_block_inverted == Some(loop_id) {
                std::slice::from_ref(&self.cfg.get_loop(loop_id).header)
            } else {
                self.cfg.loop_blocks(loop_id)
            }
        }
        fn loop_parent(&self, loop_id: LoopId) -> Option<LoopId> {
            self.cfg.loop_parent(loop_id)
        }
        fn num_backedges(&self, loop_id: LoopId) -> usize {
            self.cfg.num_backedges(loop_id)
        }
        fn is_inverted(&self, loop_id: LoopId) -> bool {
            self.single_block_inverted == Some(loop_id) || self.cfg.is_inverted(loop_id)
        }
        fn loop_count(&self) -> usize {
            self.cfg.loop_count()
        }
    }

    fn code_emitting<G: BlockGraph>(graph: &G) -> (Vec<BlockId>, Vec<bool>) {
        let mut builder = TraceBuilder::new(graph);
        while let Some(seed) = builder.next_seed() {
            builder.add_code_emitting_trace(seed);
        }
        builder.finish()
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "Probabilities must be positive")]
    fn test_negative_probability_asserts() {
        let mut graph = PatchedGraph::new(simple_loop());
        graph.negative = Some(BlockId(1));
        code_emitting(&graph);
    }

    #[test]
    fn test_skipped_header_aligns_its_successors() {
        let (order, align) = code_emitting(&simple_loop());
        assert_eq!(order, ids(&[0, 2, 1, 3]));
        assert_eq!(align, vec![false, true, true, false]);
    }

    #[test]
    fn test_inverted_single_block_loop_aligns_only_header() {
        let mut graph = PatchedGraph::new(simple_loop());
        graph.single_block_inverted = Some(LoopId(0));
        let (order, align) = code_emitting(&graph);
        assert_eq!(order, ids(&[0, 2, 1, 3]));
        assert_eq!(align, vec![false, true, false, false]);
    }

    #[test]
    #[should_panic(expected = "twice")]
    fn test_double_emit_panics() {
        let cfg = simple_loop();
        let mut trace = TraceBuilder::new(&cfg);
        trace.emit(BlockId(0));
        trace.emit(BlockId(0));
    }
}
