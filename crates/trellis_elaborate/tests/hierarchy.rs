//! Hierarchy emission against the reference library: links, bridges,
//! exports, chains and mixins.

use trellis_elaborate::reference::*;
use trellis_elaborate::{elaborate_block, elaborate_link, elaborate_toplevel};
use trellis_ir::{
    BlockLibElem, BlockLike, IndexMap, LibraryPath, LinkLike, LocalPath, PortLike, ValueExpr,
    ValueLit,
};

fn keys<V>(map: &IndexMap<String, V>) -> Vec<&str> {
    map.keys().map(String::as_str).collect()
}

fn path(dotted: &str) -> LocalPath {
    LocalPath::parse_dotted(dotted)
}

fn lib(name: &str) -> LibraryPath {
    LibraryPath::new(name)
}

#[test]
fn source_to_two_sinks_makes_one_link() {
    let top = elaborate_block(TestBlockTop).unwrap();
    assert_eq!(keys(&top.blocks), ["source", "sink1", "sink2"]);
    assert_eq!(keys(&top.links), ["_source_source_link"]);
    assert_eq!(
        top.links["_source_source_link"],
        LinkLike::LibElem(lib("TestLink"))
    );
    assert_eq!(
        keys(&top.constraints),
        [
            "(conn)_source_source_link_d0",
            "(conn)_source_source_link_d1",
            "(conn)_source_source_link_d2",
            "(init)source.float_value",
        ]
    );

    let link = path("_source_source_link");
    assert_eq!(
        top.constraints["(conn)_source_source_link_d0"],
        ValueExpr::connected(path("source.source"), link.with_name("source"))
    );
    for (key, port) in [
        ("(conn)_source_source_link_d1", "sink1.sink"),
        ("(conn)_source_source_link_d2", "sink2.sink"),
    ] {
        assert_eq!(
            top.constraints[key],
            ValueExpr::connected(path(port), link.with_name("sinks").with_allocate(None))
        );
    }
}

#[test]
fn child_arguments_are_assigned_from_literals() {
    let top = elaborate_block(TestBlockTop).unwrap();
    assert_eq!(
        top.constraints["(init)source.float_value"],
        ValueExpr::Assign {
            dst: path("source.float_value"),
            src: Box::new(ValueExpr::Literal(ValueLit::Floating(2.5))),
        }
    );
}

#[test]
fn leaf_blocks_declare_identity_ports_and_requirements() {
    let source = elaborate_block(TestBlockSource::default()).unwrap();
    assert_eq!(source.self_class, Some(lib("TestBlockSource")));
    assert_eq!(source.prerefine_class, Some(lib("TestBlockSource")));
    assert_eq!(keys(&source.params), ["float_value"]);
    assert!(source.param_defaults.is_empty());
    assert_eq!(
        source.ports["source"],
        PortLike::LibElem(lib("TestPortSource"))
    );
    assert_eq!(
        keys(&source.constraints),
        ["(reqd)source", "(init)source.float_param"]
    );
    assert_eq!(
        source.constraints["(init)source.float_param"],
        ValueExpr::Assign {
            dst: path("source.float_param"),
            src: Box::new(ValueExpr::Ref(path("float_value"))),
        }
    );
    assert!(source.generator.is_none());
}

#[test]
fn literal_arguments_become_parameter_defaults() {
    let source = elaborate_block(TestBlockSource {
        float_value: Some(4.0.into()),
    })
    .unwrap();
    assert_eq!(
        source.param_defaults["float_value"],
        ValueExpr::Literal(ValueLit::Floating(4.0))
    );
}

#[test]
fn boundary_sink_is_bridged_into_the_inner_link() {
    let bridged = elaborate_block(TestBlockBridged).unwrap();
    assert_eq!(keys(&bridged.blocks), ["inner1", "inner2", "(bridge)sink"]);
    assert_eq!(
        bridged.blocks["(bridge)sink"],
        BlockLike::LibElem(BlockLibElem {
            base: lib("TestPortBridge"),
            mixins: Vec::new(),
        })
    );
    assert_eq!(keys(&bridged.links), ["_sink_link"]);
    assert_eq!(
        keys(&bridged.constraints),
        [
            "(reqd)sink",
            "(bridge)_sink_link_b0",
            "(conn)_sink_link_b0",
            "(conn)_sink_link_d0",
            "(conn)_sink_link_d1",
        ]
    );
    assert_eq!(
        bridged.constraints["(bridge)_sink_link_b0"],
        ValueExpr::exported(path("sink"), path("(bridge)sink.outer_port"))
    );
    assert_eq!(
        bridged.constraints["(conn)_sink_link_b0"],
        ValueExpr::connected(path("(bridge)sink.inner_link"), path("_sink_link.source"))
    );
    assert_eq!(
        bridged.constraints["(conn)_sink_link_d1"],
        ValueExpr::connected(
            path("inner2.sink"),
            path("_sink_link.sinks").with_allocate(None)
        )
    );
}

#[test]
fn export_of_a_child_port_emits_no_link() {
    let export = elaborate_block(TestBlockExport).unwrap();
    assert_eq!(keys(&export.ports), ["sink"]);
    assert_eq!(export.ports["sink"], PortLike::LibElem(lib("TestPortSink")));
    assert!(export.links.is_empty());
    assert_eq!(keys(&export.constraints), ["(reqd)sink", "(conn)_sink_link"]);
    assert_eq!(
        export.constraints["(conn)_sink_link"],
        ValueExpr::exported(path("sink"), path("inner.sink"))
    );
}

#[test]
fn chain_names_its_connections() {
    let chain = elaborate_block(TestBlockChain).unwrap();
    assert_eq!(keys(&chain.blocks), ["source", "pass", "sink"]);
    assert_eq!(keys(&chain.links), ["chain_0", "chain_1"]);
    assert_eq!(
        chain.constraints["(conn)chain_0_d0"],
        ValueExpr::connected(path("source.source"), path("chain_0.source"))
    );
    assert_eq!(
        chain.constraints["(conn)chain_0_d1"],
        ValueExpr::connected(path("pass.sink"), path("chain_0.sinks").with_allocate(None))
    );
    assert_eq!(
        chain.constraints["(conn)chain_1_d0"],
        ValueExpr::connected(path("pass.source"), path("chain_1.source"))
    );
}

#[test]
fn mixin_overlays_its_host() {
    let user = elaborate_block(TestMixinUser).unwrap();
    assert_eq!(
        user.blocks["base"],
        BlockLike::LibElem(BlockLibElem {
            base: lib("TestMixinBase"),
            mixins: vec![lib("TestMixin")],
        })
    );
    assert_eq!(
        user.constraints["(init)base.mixin_float"],
        ValueExpr::Assign {
            dst: path("base.mixin_float"),
            src: Box::new(ValueExpr::Literal(ValueLit::Floating(1.5))),
        }
    );
    let link = path("_source_source_link.sinks").with_allocate(None);
    assert_eq!(
        user.constraints["(conn)_source_source_link_d1"],
        ValueExpr::connected(path("base.base_port"), link.clone())
    );
    assert_eq!(
        user.constraints["(conn)_source_source_link_d2"],
        ValueExpr::connected(path("base.mixin_port"), link)
    );
}

#[test]
fn standalone_mixin_is_abstract_over_its_base() {
    let mixin = elaborate_block(TestMixin::default()).unwrap();
    assert!(mixin.is_abstract);
    assert_eq!(mixin.superclasses, vec![lib("TestMixinBase")]);
    assert_eq!(keys(&mixin.ports), ["mixin_port"]);
    assert!(!mixin.constraints.contains_key("(reqd)mixin_port"));
}

#[test]
fn abstract_base_is_marked_abstract() {
    let base = elaborate_block(TestMixinBase).unwrap();
    assert!(base.is_abstract);
    assert!(base.generator.is_none());
}

#[test]
fn link_aggregates_its_sinks() {
    let link = elaborate_link(TestLink).unwrap();
    assert_eq!(link.self_class, Some(lib("TestLink")));
    assert_eq!(link.superclasses, vec![lib("TestLinkBase")]);
    assert_eq!(keys(&link.ports), ["source", "sinks"]);
    assert!(matches!(
        &link.ports["sinks"],
        PortLike::Array(array) if array.self_class == lib("TestPortSink") && array.ports.is_none()
    ));
    assert_eq!(
        keys(&link.params),
        [
            "float_param_sink_sum",
            "float_param_sink_range",
            "range_param_sink_common",
        ]
    );
    assert_eq!(link.constraints.len(), 5);
    assert!(!link.constraints.keys().any(|k| k.starts_with("(reqd)")));

    let ValueExpr::Assign { dst, src } = &link.constraints[0] else {
        panic!("expected an assignment, got {:?}", link.constraints[0]);
    };
    assert_eq!(*dst, path("float_param_sink_sum"));
    let ValueExpr::UnarySet { vals, .. } = src.as_ref() else {
        panic!("expected a reduction, got {src:?}");
    };
    assert_eq!(
        **vals,
        ValueExpr::MapExtract {
            container: Box::new(ValueExpr::Ref(path("sinks"))),
            path: path("float_param"),
        }
    );
}

#[test]
fn toplevel_wraps_the_root_block() {
    let design = elaborate_toplevel(TestBlockTop).unwrap();
    assert_eq!(design.contents.self_class, Some(lib("TestBlockTop")));
    assert_eq!(design.contents.blocks.len(), 3);
}
