use blockorder_rs::cfg::{BlockGraph, BlockId, Cfg, CfgBuilder, GraphDescription, LoopId};
use blockorder_rs::BlockOrderError;

fn build(probabilities: &[f64], edges: &[(usize, usize)]) -> Result<Cfg, BlockOrderError> {
    let mut builder = CfgBuilder::new();
    for &p in probabilities {
        builder.add_block(p);
    }
    for &(from, to) in edges {
        builder.add_edge(BlockId(from), BlockId(to));
    }
    builder.build()
}

/// B0 -> H1 -> H2 -> X -> H2, X -> E1 -> H1, H1 -> EXIT
fn nested_loops() -> Cfg {
    build(
        &[1.0, 10.0, 100.0, 100.0, 10.0, 1.0],
        &[(0, 1), (1, 2), (1, 5), (2, 3), (3, 2), (3, 4), (4, 1)],
    )
    .unwrap()
}

#[test]
fn test_single_block_cfg() {
    let cfg = build(&[1.0], &[]).unwrap();
    assert_eq!(cfg.block_count(), 1);
    assert_eq!(cfg.start_block(), BlockId(0));
    assert_eq!(cfg.loop_count(), 0);
    assert!(cfg.is_acyclic());
    assert!(cfg.block(BlockId(0)).is_terminating());
}

#[test]
fn test_edges_keep_insertion_order() {
    let cfg = build(&[1.0, 1.0, 1.0, 1.0], &[(0, 3), (0, 1), (0, 2), (1, 3), (2, 3)]).unwrap();
    assert_eq!(
        cfg.successors(BlockId(0)),
        &[BlockId(3), BlockId(1), BlockId(2)]
    );
    assert_eq!(
        cfg.predecessors(BlockId(3)),
        &[BlockId(0), BlockId(1), BlockId(2)]
    );
    assert!(cfg.block(BlockId(3)).is_merge());
}

#[test]
fn test_simple_loop_analysis() {
    let cfg = build(&[1.0, 1.0, 1.0], &[(0, 1), (1, 2), (2, 1)]).unwrap();
    assert_eq!(cfg.loop_count(), 1);
    assert!(!cfg.is_acyclic());

    let l = LoopId(0);
    assert_eq!(cfg.loop_header(l), BlockId(1));
    assert_eq!(cfg.loop_blocks(l), &[BlockId(1), BlockId(2)]);
    assert_eq!(cfg.num_backedges(l), 1);

    assert!(cfg.is_loop_header(BlockId(1)));
    assert!(!cfg.is_loop_end(BlockId(1)));
    assert!(cfg.is_loop_end(BlockId(2)));
    assert_eq!(cfg.loop_depth(BlockId(0)), 0);
    assert_eq!(cfg.loop_depth(BlockId(1)), 1);
    assert_eq!(cfg.loop_depth(BlockId(2)), 1);
    assert_eq!(cfg.loop_of(BlockId(0)), None);
    assert_eq!(cfg.loop_of(BlockId(2)), Some(l));
}

#[test]
fn test_nested_loop_analysis() {
    let cfg = nested_loops();
    assert_eq!(cfg.loop_count(), 2);

    let outer = cfg.get_loop(LoopId(0));
    let inner = cfg.get_loop(LoopId(1));
    assert_eq!(outer.header, BlockId(1));
    assert_eq!(inner.header, BlockId(2));
    assert_eq!(
        outer.blocks,
        vec![BlockId(1), BlockId(2), BlockId(3), BlockId(4)]
    );
    assert_eq!(inner.blocks, vec![BlockId(2), BlockId(3)]);
    assert!(inner.contains(BlockId(3)));
    assert!(!inner.contains(BlockId(4)));
    assert_eq!(outer.loop_ends, vec![BlockId(4)]);
    assert_eq!(inner.loop_ends, vec![BlockId(3)]);
    assert_eq!(outer.depth, 1);
    assert_eq!(inner.depth, 2);
    assert_eq!(outer.parent, None);
    assert_eq!(inner.parent, Some(LoopId(0)));

    let depths: Vec<u32> = (0..6).map(|i| cfg.loop_depth(BlockId(i))).collect();
    assert_eq!(depths, vec![0, 1, 2, 2, 1, 0]);
    assert_eq!(cfg.loop_of(BlockId(3)), Some(LoopId(1)));
    assert_eq!(cfg.loop_of(BlockId(4)), Some(LoopId(0)));

    let analysis = cfg.loop_analysis();
    assert_eq!(
        analysis.get_loops_containing_node(BlockId(3)),
        &[LoopId(0), LoopId(1)]
    );
    assert!(!analysis.is_node_in_loop(BlockId(5)));
}

#[test]
fn test_multiple_back_edges_form_one_loop() {
    // H1 is reached back from both B2 and B3.
    let cfg = build(
        &[1.0, 1.0, 1.0, 1.0, 1.0],
        &[(0, 1), (1, 2), (1, 3), (2, 1), (3, 1), (2, 4)],
    )
    .unwrap();
    assert_eq!(cfg.loop_count(), 1);
    assert_eq!(cfg.num_backedges(LoopId(0)), 2);
    assert!(cfg.is_loop_end(BlockId(2)));
    assert!(cfg.is_loop_end(BlockId(3)));
}

#[test]
fn test_inverted_loop_detection_and_override() {
    // Bottom-tested: the loop end B2 also exits to B3.
    let bottom_tested = build(&[1.0, 1.0, 1.0, 1.0], &[(0, 1), (1, 2), (2, 1), (2, 3)]).unwrap();
    assert!(bottom_tested.is_inverted(LoopId(0)));

    // Top-tested: the header exits, the loop end only jumps back.
    let top_tested = build(&[1.0, 1.0, 1.0, 1.0], &[(0, 1), (1, 2), (1, 3), (2, 1)]).unwrap();
    assert!(!top_tested.is_inverted(LoopId(0)));

    let mut builder = CfgBuilder::new();
    let b: Vec<BlockId> = (0..4).map(|_| builder.add_block(1.0)).collect();
    builder
        .add_edge(b[0], b[1])
        .add_edge(b[1], b[2])
        .add_edge(b[1], b[3])
        .add_edge(b[2], b[1])
        .set_inverted(b[1], true);
    assert!(builder.build().unwrap().is_inverted(LoopId(0)));
}

#[test]
fn test_irreducible_cycle_is_rejected() {
    let err = build(&[1.0, 1.0, 1.0], &[(0, 1), (0, 2), (1, 2), (2, 1)]).unwrap_err();
    assert!(matches!(err, BlockOrderError::InvalidGraph { .. }));
    assert!(err.to_string().contains("is not a back edge"));

    // A natural loop entered only through its header is fine.
    let cfg = build(&[1.0, 1.0, 1.0], &[(0, 1), (1, 2), (2, 1)]).unwrap();
    assert_eq!(cfg.loop_count(), 1);
    assert!(!cfg.is_acyclic());
}

#[test]
fn test_builder_rejects_invalid_graphs() {
    assert!(matches!(
        build(&[], &[]),
        Err(BlockOrderError::InvalidGraph { .. })
    ));
    assert!(matches!(
        build(&[1.0, -0.5], &[(0, 1)]),
        Err(BlockOrderError::InvalidGraph { .. })
    ));
    assert!(matches!(
        build(&[1.0, f64::NAN], &[(0, 1)]),
        Err(BlockOrderError::InvalidGraph { .. })
    ));
    assert!(matches!(
        build(&[1.0, 1.0], &[(0, 2)]),
        Err(BlockOrderError::InvalidGraph { .. })
    ));
    assert!(matches!(
        build(&[1.0, 1.0], &[(0, 1), (0, 1)]),
        Err(BlockOrderError::InvalidGraph { .. })
    ));
    let err = build(&[1.0, 1.0, 1.0], &[(0, 1)]).unwrap_err();
    assert!(err.to_string().contains("B2 is unreachable"));
}

#[test]
fn test_description_parsing() {
    let json = r#"{
        "name": "shuffled",
        "blocks": [
            { "id": 2, "probability": 0.25 },
            { "id": 0, "successors": [1, 2] },
            { "id": 1, "probability": 0.75, "successors": [2] }
        ]
    }"#;
    let cfg = GraphDescription::from_json(json).unwrap().to_cfg().unwrap();
    assert_eq!(cfg.name(), Some("shuffled"));
    assert_eq!(cfg.block_count(), 3);
    assert_eq!(cfg.probability(BlockId(0)), 1.0);
    assert_eq!(cfg.probability(BlockId(2)), 0.25);
    assert_eq!(cfg.successors(BlockId(0)), &[BlockId(1), BlockId(2)]);
}

#[test]
fn test_description_errors() {
    assert!(matches!(
        GraphDescription::from_json("{ not json"),
        Err(BlockOrderError::Parse { .. })
    ));

    let duplicate = r#"{ "blocks": [ { "id": 0 }, { "id": 0 } ] }"#;
    assert!(matches!(
        GraphDescription::from_json(duplicate).unwrap().to_cfg(),
        Err(BlockOrderError::InvalidGraph { .. })
    ));

    let gap = r#"{ "blocks": [ { "id": 0 }, { "id": 2 } ] }"#;
    assert!(matches!(
        GraphDescription::from_json(gap).unwrap().to_cfg(),
        Err(BlockOrderError::InvalidGraph { .. })
    ));
}

#[test]
fn test_description_from_cfg_rebuilds_same_graph() {
    let cfg = nested_loops();
    let description = GraphDescription::from(&cfg);
    let json = description.to_json().unwrap();
    let rebuilt = GraphDescription::from_json(&json).unwrap().to_cfg().unwrap();

    assert_eq!(rebuilt.block_count(), cfg.block_count());
    for i in 0..cfg.block_count() {
        let id = BlockId(i);
        assert_eq!(rebuilt.successors(id), cfg.successors(id));
        assert_eq!(rebuilt.loop_depth(id), cfg.loop_depth(id));
    }
    assert_eq!(rebuilt.is_inverted(LoopId(1)), cfg.is_inverted(LoopId(1)));
}

#[test]
fn test_dot_export_shows_loops_and_back_edges() {
    let cfg = nested_loops().with_name("nested");
    let dot = cfg.to_dot();
    assert!(dot.starts_with("digraph \"nested\""));
    assert!(dot.contains("subgraph cluster_loop0"));
    assert!(dot.contains("subgraph cluster_loop1"));
    assert!(dot.contains("3 -> 2 [label=\"back\", color=\"red\"]"));
    assert!(dot.contains("1 -> 5 [label=\"exit\", color=\"gray\"]"));
}
