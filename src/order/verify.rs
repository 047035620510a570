//! Post-condition checks for computed block orders.

use crate::cfg::{BlockGraph, BlockId, LoopId};
use crate::error::{Error, Result};
use crate::order::trace::is_skippable_header;

/// Every block exactly once, start block first
pub fn check_order<G: BlockGraph>(graph: &G, order: &[BlockId]) -> Result<()> {
    let expected = graph.block_count();
    if order.len() != expected {
        return Err(Error::verification(format!(
            "Number of blocks in ordering ({}) does not match expected block count ({})",
            order.len(),
            expected
        )));
    }

    let start = graph.start_block();
    if order.first() != Some(&start) {
        return Err(Error::verification(format!(
            "ordering starts with {:?} instead of start block {}",
            order.first(),
            start
        )));
    }

    let mut seen = vec![false; expected];
    for &block in order {
        match seen.get_mut(block.index()) {
            None => {
                return Err(Error::verification(format!(
                    "ordering contains unknown block {}",
                    block
                )))
            }
            Some(true) => {
                return Err(Error::verification(format!(
                    "block {} appears more than once",
                    block
                )))
            }
            Some(slot) => *slot = true,
        }
    }

    Ok(())
}

/// Both orders contain the same blocks
pub fn check_same_blocks(code_emitting: &[BlockId], linear_scan: &[BlockId]) -> Result<()> {
    if code_emitting.len() != linear_scan.len() {
        return Err(Error::verification(format!(
            "code emitting order has {} blocks, linear scan order has {}",
            code_emitting.len(),
            linear_scan.len()
        )));
    }

    let mut a = code_emitting.to_vec();
    let mut b = linear_scan.to_vec();
    a.sort();
    b.sort();
    if let Some((x, y)) = a.iter().zip(&b).find(|(x, y)| x != y) {
        return Err(Error::verification(format!(
            "orders differ in membership: {} vs {}",
            x, y
        )));
    }

    Ok(())
}

/// Each loop occupies one contiguous range of `order`
pub fn check_loop_contiguity<G: BlockGraph>(graph: &G, order: &[BlockId]) -> Result<()> {
    let mut position = vec![usize::MAX; graph.block_count()];
    for (i, block) in order.iter().enumerate() {
        if let Some(slot) = position.get_mut(block.index()) {
            *slot = i;
        }
    }

    for l in (0..graph.loop_count()).map(LoopId) {
        let members = graph.loop_blocks(l);
        if let Some(missing) = members.iter().find(|b| position[b.index()] == usize::MAX) {
            return Err(Error::verification(format!(
                "loop {} member {} is missing from the ordering",
                l, missing
            )));
        }
        let (first, last) = members
            .iter()
            .map(|b| position[b.index()])
            .fold((usize::MAX, 0), |(lo, hi), p| (lo.min(p), hi.max(p)));
        if first == usize::MAX {
            continue;
        }
        if last - first + 1 != members.len() {
            let intruder = order[first..=last]
                .iter()
                .find(|b| !members.contains(*b));
            return Err(Error::verification(format!(
                "loop {} headed by {} is not contiguous{}",
                l,
                graph.loop_header(l),
                intruder
                    .map(|b| format!(": {} is placed inside it", b))
                    .unwrap_or_default()
            )));
        }
    }

    Ok(())
}

/// Every aligned block is a loop header or a successor of a loop header
/// that is placed behind its single loop end
pub fn check_alignment<G: BlockGraph>(graph: &G, align: &[bool]) -> Result<()> {
    for (index, &aligned) in align.iter().enumerate() {
        let block = BlockId(index);
        if !aligned || graph.is_loop_header(block) {
            continue;
        }
        let behind_skipped_header = graph
            .predecessors(block)
            .iter()
            .any(|&pred| is_skippable_header(graph, pred));
        if !behind_skipped_header {
            return Err(Error::verification(format!(
                "block {} is aligned but is never the target of a backward branch",
                block
            )));
        }
    }

    Ok(())
}
