//! Expression operators and the less common connection forms.

use trellis_elaborate::errors::{D302, D311, N305};
use trellis_elaborate::reference::*;
use trellis_elaborate::{
    elaborate_block, ArrayExpr, BlockType, BoolExpr, ClassInfo, ConnectTarget, Connectable,
    ElabError, ElabResult, Endpoint, FloatExpr, ImplicitConnect, PortTag, Session, StringExpr,
    Vector,
};
use trellis_ir::{BinaryOp, BinarySetOp, LocalPath, Metadata, UnarySetOp, ValueExpr, ValueLit};

fn param(name: &str) -> Box<ValueExpr> {
    Box::new(ValueExpr::Ref(LocalPath::from_names(&[name])))
}

/// Array reductions, element-wise maps and boolean connectives over its own
/// parameters and port array.
#[derive(Clone, Debug, Default)]
struct TestAlgebra;

impl BlockType for TestAlgebra {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestAlgebra")
    }

    fn init(&self, s: &mut Session) -> ElabResult<()> {
        let gain = s.parameter::<FloatExpr>("gain")?;
        let values = s.parameter::<ArrayExpr<FloatExpr>>("values")?;
        let labels = s.parameter::<ArrayExpr<StringExpr>>("labels")?;
        let enabled = s.parameter::<BoolExpr>("enabled")?;
        let label = s.parameter::<StringExpr>("label")?;
        let shifted = s.parameter::<ArrayExpr<FloatExpr>>("shifted")?;
        let sinks = s.port("sinks", Vector(TestPortSink::default()))?;

        s.require_named("distinct", &values.all_unique())?;
        s.require_named("uniform", &labels.all_equal())?;
        s.assign_named("common_label", &label, labels.equal_any())?;
        s.assign_named(
            "scaled",
            &shifted,
            values.map_mul(gain.clone()).map_add(1.0).negate(),
        )?;
        s.require_named("gated", &enabled.implies(sinks.any_connected()))?;
        s.require_named("nonzero", &gain.not_equals(0.0))?;
        Ok(())
    }
}

#[test]
fn named_constraints_keep_declaration_order() {
    let block = elaborate_block(TestAlgebra).unwrap();
    let keys: Vec<&str> = block.constraints.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [
            "(reqd)sinks",
            "distinct",
            "uniform",
            "common_label",
            "scaled",
            "gated",
            "nonzero",
        ]
    );
}

#[test]
fn array_operators_lower_to_set_expressions() {
    let block = elaborate_block(TestAlgebra).unwrap();
    assert_eq!(
        block.constraints["distinct"],
        ValueExpr::UnarySet {
            op: UnarySetOp::AllUnique,
            vals: param("values"),
        }
    );
    assert_eq!(
        block.constraints["uniform"],
        ValueExpr::UnarySet {
            op: UnarySetOp::AllEq,
            vals: param("labels"),
        }
    );
    assert_eq!(
        block.constraints["common_label"],
        ValueExpr::Assign {
            dst: LocalPath::from_names(&["label"]),
            src: Box::new(ValueExpr::UnarySet {
                op: UnarySetOp::SetExtract,
                vals: param("labels"),
            }),
        }
    );
    assert_eq!(
        block.constraints["scaled"],
        ValueExpr::Assign {
            dst: LocalPath::from_names(&["shifted"]),
            src: Box::new(ValueExpr::UnarySet {
                op: UnarySetOp::Negate,
                vals: Box::new(ValueExpr::BinarySet {
                    op: BinarySetOp::Add,
                    lhset: Box::new(ValueExpr::BinarySet {
                        op: BinarySetOp::Mult,
                        lhset: param("values"),
                        rhs: param("gain"),
                    }),
                    rhs: Box::new(ValueExpr::Literal(ValueLit::Floating(1.0))),
                }),
            }),
        }
    );
}

#[test]
fn boolean_connectives_lower_to_binary_expressions() {
    let block = elaborate_block(TestAlgebra).unwrap();
    assert_eq!(
        block.constraints["nonzero"],
        ValueExpr::Binary {
            op: BinaryOp::Neq,
            lhs: param("gain"),
            rhs: Box::new(ValueExpr::Literal(ValueLit::Floating(0.0))),
        }
    );

    let ValueExpr::Binary { op, lhs, rhs } = &block.constraints["gated"] else {
        panic!("expected an implication, got {:?}", block.constraints["gated"]);
    };
    assert_eq!(*op, BinaryOp::Implies);
    assert_eq!(*lhs, param("enabled"));
    let ValueExpr::UnarySet { op, vals } = rhs.as_ref() else {
        panic!("expected a reduction, got {rhs:?}");
    };
    assert_eq!(*op, UnarySetOp::AnyTrue);
    assert!(
        matches!(vals.as_ref(), ValueExpr::MapExtract { container, .. } if *container == param("sinks")),
        "{vals:?}"
    );
}

/// Joins a source and a sink under a chosen link name.
#[derive(Clone, Debug, Default)]
struct TestNamedNet;

impl BlockType for TestNamedNet {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestNamedNet")
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), s: &mut Session) -> ElabResult<()> {
        let source = s.block("source", TestBlockSource::default())?;
        let sink = s.block("sink", TestBlockSink)?;
        s.connect_named("power", &[&source.io().source, &sink.io().sink])?;
        Ok(())
    }
}

#[test]
fn named_nets_name_their_link() {
    let block = elaborate_block(TestNamedNet).unwrap();
    assert_eq!(block.links.keys().collect::<Vec<_>>(), ["power"]);
    let link = LocalPath::from_names(&["power"]);
    assert_eq!(
        block.constraints["(conn)power_d0"],
        ValueExpr::connected(
            LocalPath::from_names(&["source", "source"]),
            link.with_name("source")
        )
    );
    assert_eq!(
        block.constraints["(conn)power_d1"],
        ValueExpr::connected(
            LocalPath::from_names(&["sink", "sink"]),
            link.with_name("sinks").with_allocate(None)
        )
    );
}

/// Tries to flatten a connection in an ordinary block.
#[derive(Clone, Debug, Default)]
struct TestFlattenedInBlock;

impl BlockType for TestFlattenedInBlock {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestFlattenedInBlock")
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), s: &mut Session) -> ElabResult<()> {
        let source = s.block("source", TestBlockSource::default())?;
        let sink = s.block("sink", TestBlockSink)?;
        s.connect_flattened(&[&source.io().source, &sink.io().sink])?;
        Ok(())
    }
}

#[test]
fn flattened_connections_are_link_only() {
    let err = elaborate_block(TestFlattenedInBlock).unwrap_err();
    assert!(matches!(err, ElabError::Connectivity(ref d) if d.code == N305), "{err:?}");
}

/// Exports a child's port without requiring it to be connected.
#[derive(Clone, Debug, Default)]
struct TestOptionalExport;

impl BlockType for TestOptionalExport {
    type Io = TestPortSinkHandle;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestOptionalExport")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestPortSinkHandle> {
        let inner = s.block("inner", TestBlockSink)?;
        s.optional_export("sink", &inner.io().sink)
    }
}

#[test]
fn optional_exports_are_not_required() {
    let block = elaborate_block(TestOptionalExport).unwrap();
    assert!(!block.constraints.contains_key("(reqd)sink"));
    assert_eq!(
        block.constraints["(conn)_sink_link"],
        ValueExpr::exported(
            LocalPath::from_names(&["sink"]),
            LocalPath::from_names(&["inner", "sink"])
        )
    );
}

#[test]
fn sub_array_requests_leave_boundary_elements_alone() {
    let mut s = Session::new();
    let array = s.instantiate(TestBlockSinkArray { elements: Some(1) }).unwrap();
    s.request_vector(array.io(), Some("bus")).unwrap();
    assert_eq!(s.elements(array.io()).unwrap().len(), 1);
}

#[test]
fn port_projections_connect_as_derived_endpoints() {
    let mut s = Session::new();
    let array = s.instantiate(TestBlockSinkArray { elements: Some(2) }).unwrap();
    let derived = array.io().map_extract_port(|sink| sink.clone());
    assert!(matches!(
        derived.connect_target(),
        ConnectTarget::Endpoint(Endpoint::Derived { .. })
    ));
}

/// Carries free-form annotations for downstream tools.
#[derive(Clone, Debug, Default)]
struct TestAnnotated {
    repeat_key: bool,
}

impl BlockType for TestAnnotated {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestAnnotated")
    }

    fn init(&self, s: &mut Session) -> ElabResult<()> {
        s.metadata("refdes", "U1")?;
        s.metadata("part", Metadata::default().with_member("mfr", "Acme"))?;
        if self.repeat_key {
            s.metadata("refdes", "U2")?;
        }
        Ok(())
    }
}

#[test]
fn metadata_is_emitted_in_insertion_order() {
    let block = elaborate_block(TestAnnotated::default()).unwrap();
    let meta = block.meta.expect("annotated block carries metadata");
    assert_eq!(meta.members.keys().collect::<Vec<_>>(), ["refdes", "part"]);
    assert_eq!(meta.members["refdes"], Metadata::text("U1"));
    assert_eq!(meta.members["part"].members["mfr"], Metadata::text("Acme"));
}

#[test]
fn blocks_without_metadata_emit_none() {
    let block = elaborate_block(TestNamedNet).unwrap();
    assert!(block.meta.is_none());
}

#[test]
fn repeated_metadata_keys_are_rejected() {
    let err = elaborate_block(TestAnnotated { repeat_key: true }).unwrap_err();
    assert!(matches!(err, ElabError::Definition(ref d) if d.code == D302), "{err:?}");
}

/// A sink whose port is tagged as a supply rail only.
#[derive(Clone, Debug, Default)]
struct TestRailSink;

impl BlockType for TestRailSink {
    type Io = TestPortSinkHandle;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestRailSink")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestPortSinkHandle> {
        let rail = s.port("rail", TestPortSink::default())?;
        s.tag(&rail, &[PortTag::Custom("rail")])?;
        Ok(rail)
    }
}

/// Children created inside an implicit scope pick up the source by tag.
#[derive(Clone, Debug, Default)]
struct TestImplicitScope;

impl BlockType for TestImplicitScope {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestImplicitScope")
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), s: &mut Session) -> ElabResult<()> {
        let source = s.block("source", TestBlockSource::default())?;
        let implicits = [ImplicitConnect::new(
            &source.source,
            &[PortTag::Input, PortTag::Custom("rail")],
        )];
        s.implicit_connect(&implicits, |s| {
            s.block("sink1", TestBlockSink)?;
            s.block("rail", TestRailSink)?;
            // untagged boundary port, left alone
            s.block("export", TestBlockExport)?;
            Ok(())
        })?;
        s.block("outside", TestBlockSink)?;
        Ok(())
    }
}

#[test]
fn implicit_scopes_connect_tagged_child_ports() {
    let block = elaborate_block(TestImplicitScope).unwrap();
    assert_eq!(
        block.blocks.keys().collect::<Vec<_>>(),
        ["source", "sink1", "rail", "export", "outside"]
    );
    assert_eq!(block.links.keys().collect::<Vec<_>>(), ["_source_source_link"]);
    let link = LocalPath::from_names(&["_source_source_link"]);
    assert_eq!(
        block.constraints["(conn)_source_source_link_d0"],
        ValueExpr::connected(
            LocalPath::from_names(&["source", "source"]),
            link.with_name("source")
        )
    );
    for (key, port) in [
        ("(conn)_source_source_link_d1", ["sink1", "sink"]),
        ("(conn)_source_source_link_d2", ["rail", "rail"]),
    ] {
        assert_eq!(
            block.constraints[key],
            ValueExpr::connected(
                LocalPath::from_names(&port),
                link.with_name("sinks").with_allocate(None)
            )
        );
    }
    assert!(!block.constraints.contains_key("(conn)_source_source_link_d3"));
}

#[test]
fn implicit_connect_needs_an_enclosing_block() {
    let mut s = Session::new();
    let err = s.implicit_connect(&[], |_| Ok(())).unwrap_err();
    assert!(matches!(err, ElabError::Definition(ref d) if d.code == D311), "{err:?}");
}
