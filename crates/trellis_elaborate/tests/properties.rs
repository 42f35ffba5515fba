//! Ordering, error and library properties of elaboration.

use trellis_elaborate::errors::{D301, D302, D309, N301};
use trellis_elaborate::reference::*;
use trellis_elaborate::{
    elaborate_block, elaborate_toplevel, BlockType, ClassInfo, ElabError, ElabResult, Range,
    Session,
};
use trellis_ir::rpc::ExprValue;
use trellis_ir::{Design, LibraryElement, LocalPath, ValueLit};

/// Two required ports and one user constraint.
#[derive(Clone, Debug, Default)]
struct TestRequiredPorts;

impl BlockType for TestRequiredPorts {
    type Io = (TestPortSinkHandle, TestPortSourceHandle);

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestRequiredPorts")
    }

    fn init(&self, s: &mut Session) -> ElabResult<Self::Io> {
        let sink = s.port("sink", TestPortSink::default())?;
        let optional = s.optional_port("optional", TestPortSink::default())?;
        let source = s.port("source", TestPortSource::default())?;
        s.require_named("user", &optional.float_param.within((0.0, 1.0)))?;
        Ok((sink, source))
    }
}

#[test]
fn required_constraints_come_first_in_port_order() {
    let block = elaborate_block(TestRequiredPorts).unwrap();
    let keys: Vec<&str> = block.constraints.keys().map(String::as_str).collect();
    assert_eq!(keys, ["(reqd)sink", "(reqd)source", "user"]);
}

/// Declares a port after init.
#[derive(Clone, Debug, Default)]
struct TestLatePort;

impl BlockType for TestLatePort {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestLatePort")
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), s: &mut Session) -> ElabResult<()> {
        s.port("late", TestPortSink::default())?;
        Ok(())
    }
}

#[test]
fn ports_outside_init_are_rejected() {
    let err = elaborate_block(TestLatePort).unwrap_err();
    assert!(matches!(err, ElabError::Definition(ref d) if d.code == D301), "{err:?}");
}

/// Declares two children with one name.
#[derive(Clone, Debug, Default)]
struct TestDuplicateChild;

impl BlockType for TestDuplicateChild {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestDuplicateChild")
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), s: &mut Session) -> ElabResult<()> {
        s.block("sink", TestBlockSink)?;
        s.block("sink", TestBlockSink)?;
        Ok(())
    }
}

#[test]
fn duplicate_child_names_are_rejected() {
    let err = elaborate_block(TestDuplicateChild).unwrap_err();
    assert!(matches!(err, ElabError::Definition(ref d) if d.code == D302), "{err:?}");
}

/// Exposes its child's interface as its own.
#[derive(Clone, Debug, Default)]
struct TestWrapper;

impl BlockType for TestWrapper {
    type Io = TestBlockSourceIo;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestWrapper")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestBlockSourceIo> {
        let inner = s.block("inner", TestBlockSource::default())?;
        Ok(inner.io().clone())
    }
}

/// Reaches through a child into a grandchild.
#[derive(Clone, Debug, Default)]
struct TestGrandchildAccess {
    connect: bool,
}

impl BlockType for TestGrandchildAccess {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestGrandchildAccess")
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), s: &mut Session) -> ElabResult<()> {
        let wrapper = s.block("wrapper", TestWrapper)?;
        if self.connect {
            let sink = s.block("sink", TestBlockSink)?;
            s.connect(&[&wrapper.io().source, &sink.sink])?;
        } else {
            s.require(&wrapper.io().float_value.within((0.0, 2.0)))?;
        }
        Ok(())
    }
}

#[test]
fn grandchild_parameters_are_unreachable() {
    let err = elaborate_block(TestGrandchildAccess { connect: false }).unwrap_err();
    assert!(matches!(err, ElabError::Unreachable(_)), "{err:?}");
}

#[test]
fn connecting_grandchild_ports_is_rejected() {
    let err = elaborate_block(TestGrandchildAccess { connect: true }).unwrap_err();
    assert!(matches!(err, ElabError::Connectivity(ref d) if d.code == N301), "{err:?}");
}

#[test]
fn range_properties_hold() {
    let target = Range::new(9.0, 11.0).unwrap();
    let shrunk = target
        .shrink_multiply(&Range::new(0.95, 1.05).unwrap())
        .unwrap();
    assert!((shrunk.lower - 9.45).abs() < 1e-9);
    assert!((shrunk.upper - 10.45).abs() < 1e-9);
    assert!(Range::new(0.5, 2.0)
        .unwrap()
        .shrink_multiply(&Range::new(1.0, 1.5).unwrap())
        .is_err());

    let outer = Range::new(1.0, 4.0).unwrap();
    assert!(outer.contains(&Range::new(2.0, 3.0).unwrap()));
    assert!(!outer.contains(&Range::new(0.0, 5.0).unwrap()));
    let point = Range::new(10.0000001, 10.0000001).unwrap();
    assert!(point.fuzzy_in(&Range::new(9.0, 10.0).unwrap()));
}

#[test]
fn library_elaborates_every_registered_class() {
    let mut library = reference_library();
    let names: Vec<String> = library.classes().map(|(name, _)| name.to_string()).collect();
    for name in &names {
        library
            .elaborate_class(name)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
    }
    assert_eq!(library.memoized(), names.len());
}

#[test]
fn library_memoizes_elaboration() {
    let mut library = reference_library();
    let first = library.elaborate_class("TestBlockTop").unwrap();
    let second = library.elaborate_class("TestBlockTop").unwrap();
    assert_eq!(first, second);
    assert_eq!(library.memoized(), 1);
    assert!(matches!(
        library.elaborate_class("TestPortSink").unwrap(),
        LibraryElement::Port(_)
    ));
    assert!(matches!(
        library.elaborate_class("TestLink").unwrap(),
        LibraryElement::Link(_)
    ));
}

#[test]
fn library_generates_with_values() {
    let mut library = reference_library();
    let values = vec![ExprValue {
        path: LocalPath::from_names(&["count"]),
        value: ValueLit::Integer(2),
    }];
    let generated = library.elaborate_generator("TestGenerator", &values).unwrap();
    assert_eq!(generated.blocks.len(), 3);
    library.elaborate_generator("TestGenerator", &values).unwrap();
    assert_eq!(library.memoized(), 1);
}

#[test]
fn library_rejects_unknown_classes() {
    let mut library = reference_library();
    let err = library.elaborate_class("Nope").unwrap_err();
    assert!(matches!(err, ElabError::Definition(ref d) if d.code == D309), "{err:?}");
    assert!(library.elaborate_generator("TestLink", &[]).is_err());
    assert!(library.elaborate_toplevel("TestPortSink").is_err());
}

#[test]
fn design_survives_json() {
    let design = elaborate_toplevel(TestBlockBridged).unwrap();
    let json = serde_json::to_string(&design).unwrap();
    let back: Design = serde_json::from_str(&json).unwrap();
    assert_eq!(back, design);
    assert_eq!(
        back.contents.constraints.keys().next().map(String::as_str),
        Some("(reqd)sink")
    );
}
