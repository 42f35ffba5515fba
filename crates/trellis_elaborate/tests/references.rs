//! Reference maps over elaborated hierarchies: every element gets its own
//! path, and mixins resolve to their host.

use std::collections::{BTreeSet, HashSet};
use trellis_elaborate::refmap::{Ref, RefMap};
use trellis_elaborate::reference::*;
use trellis_elaborate::{BlockType, Session};

/// Paths of the members and the blocks of a root, after checking that no two
/// members share a path and that no member shadows a block.
fn member_and_block_paths<B: BlockType>(root: B) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut s = Session::new();
    let root = s.instantiate(root).unwrap();
    let refs = RefMap::for_block(&s, root.id()).unwrap();

    let mut members = BTreeSet::new();
    let mut blocks = BTreeSet::new();
    let mut seen = HashSet::new();
    for (r, path) in refs.iter() {
        let text = path.to_string();
        match r {
            Ref::Block(_) => {
                blocks.insert(text);
            }
            Ref::Param(_) | Ref::Port(_) => {
                assert!(seen.insert(text.clone()), "`{text}` mapped twice");
                members.insert(text);
            }
        }
    }
    assert!(members.is_disjoint(&blocks), "{members:?} / {blocks:?}");
    (members, blocks)
}

fn set(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

#[test]
fn fan_out_children_get_distinct_paths() {
    let (members, blocks) = member_and_block_paths(TestBlockTop);
    assert_eq!(blocks, set(&["", "source", "sink1", "sink2"]));
    for sink in ["sink1", "sink2"] {
        assert!(members.contains(&format!("{sink}.sink")), "{members:?}");
        assert!(members.contains(&format!("{sink}.sink.float_param")), "{members:?}");
        assert!(members.contains(&format!("{sink}.sink.range_limit")), "{members:?}");
    }
    assert!(members.contains("source.source"), "{members:?}");
}

#[test]
fn bridged_boundary_port_and_inner_ports_are_separate() {
    let (members, blocks) = member_and_block_paths(TestBlockBridged);
    assert_eq!(blocks, set(&["", "inner1", "inner2"]));
    for port in ["sink", "inner1.sink", "inner2.sink"] {
        assert!(members.contains(port), "{port} missing from {members:?}");
        assert!(members.contains(&format!("{port}.float_param")), "{members:?}");
    }
}

#[test]
fn mixin_members_resolve_under_their_host() {
    let (members, blocks) = member_and_block_paths(TestMixinUser);
    assert_eq!(blocks, set(&["", "base", "source"]));
    assert!(members.contains("base.base_port"), "{members:?}");
    assert!(members.contains("base.mixin_float"), "{members:?}");
    assert!(members.contains("base.mixin_port"), "{members:?}");
    assert!(members.contains("base.mixin_port.float_param"), "{members:?}");
}

#[test]
fn array_elements_get_indexed_paths() {
    let (members, blocks) = member_and_block_paths(TestBlockSinkArray { elements: Some(2) });
    assert_eq!(blocks, set(&[""]));
    assert_eq!(
        members,
        set(&[
            "sinks",
            "sinks.0",
            "sinks.0.float_param",
            "sinks.0.range_limit",
            "sinks.1",
            "sinks.1.float_param",
            "sinks.1.range_limit",
        ])
    );
}
