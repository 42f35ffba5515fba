//! Port arrays: boundary-defined elements and parent-side requests.

use trellis_elaborate::reference::*;
use trellis_elaborate::{elaborate_block, BlockType, ClassInfo, ElabResult, Session};
use trellis_ir::{BinaryOp, LocalPath, PortLike, Reserved, ValueExpr, ValueLit};

fn array_ports(port: &PortLike) -> Option<Vec<String>> {
    match port {
        PortLike::Array(array) => array.ports.as_ref().map(|p| p.keys().cloned().collect()),
        other => panic!("expected a port array, got {other:?}"),
    }
}

#[test]
fn unnamed_elements_are_numbered_in_order() {
    let block = elaborate_block(TestBlockSinkArray { elements: Some(3) }).unwrap();
    assert_eq!(
        array_ports(&block.ports["sinks"]),
        Some(vec!["0".to_string(), "1".to_string(), "2".to_string()])
    );
}

#[test]
fn defined_empty_array_differs_from_untouched() {
    let empty = elaborate_block(TestBlockSinkArray { elements: Some(0) }).unwrap();
    assert_eq!(array_ports(&empty.ports["sinks"]), Some(Vec::new()));

    let open = elaborate_block(TestBlockSinkArray { elements: None }).unwrap();
    assert_eq!(array_ports(&open.ports["sinks"]), None);
}

#[test]
fn required_array_must_be_non_empty() {
    let block = elaborate_block(TestBlockSinkArray::default()).unwrap();
    assert_eq!(
        block.constraints["(reqd)sinks"],
        ValueExpr::Binary {
            op: BinaryOp::Gt,
            lhs: Box::new(ValueExpr::Ref(
                LocalPath::from_names(&["sinks"]).with_reserved(Reserved::Length)
            )),
            rhs: Box::new(ValueExpr::Literal(ValueLit::Integer(0))),
        }
    );
}

#[test]
fn session_lists_boundary_elements() {
    let mut s = Session::new();
    let array = s.instantiate(TestBlockSinkArray { elements: Some(2) }).unwrap();
    let names: Vec<String> = s
        .elements(array.io())
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, ["0", "1"]);
}

#[test]
fn requests_leave_boundary_elements_alone() {
    let mut s = Session::new();
    let array = s.instantiate(TestBlockSinkArray { elements: Some(1) }).unwrap();
    s.request(array.io(), None).unwrap();
    s.request(array.io(), Some("named")).unwrap();
    assert_eq!(s.elements(array.io()).unwrap().len(), 1);
}

/// Requests two anonymous elements of a child's open array and joins them
/// to one source.
#[derive(Clone, Debug, Default)]
struct TestArrayUser;

impl BlockType for TestArrayUser {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestArrayUser")
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), s: &mut Session) -> ElabResult<()> {
        let array = s.block("array", TestBlockSinkArray::default())?;
        let source = s.block("source", TestBlockSource::default())?;
        let first = s.request(array.io(), None)?;
        let second = s.request(array.io(), None)?;
        s.connect(&[&first, &source.source, &second])?;
        Ok(())
    }
}

#[test]
fn anonymous_requests_resolve_by_request_order() {
    let user = elaborate_block(TestArrayUser).unwrap();
    let link = "_array_sinks__allocate_0_link";
    assert_eq!(user.links.keys().collect::<Vec<_>>(), [link]);

    let requested = LocalPath::from_names(&["array", "sinks"]).with_allocate(None);
    let sinks = LocalPath::from_names(&[link, "sinks"]).with_allocate(None);
    assert_eq!(
        user.constraints[format!("(conn){link}_d0").as_str()],
        ValueExpr::connected(requested.clone(), sinks.clone())
    );
    assert_eq!(
        user.constraints[format!("(conn){link}_d1").as_str()],
        ValueExpr::connected(
            LocalPath::from_names(&["source", "source"]),
            LocalPath::from_names(&[link, "source"])
        )
    );
    assert_eq!(
        user.constraints[format!("(conn){link}_d2").as_str()],
        ValueExpr::connected(requested, sinks)
    );
}

/// Connects a sink array element-wise to a link through a projection.
#[derive(Clone, Debug, Default)]
struct TestProjection;

impl BlockType for TestProjection {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestProjection")
    }

    fn init(&self, s: &mut Session) -> ElabResult<()> {
        let sinks = s.port("sinks", trellis_elaborate::Vector(TestPortSink::default()))?;
        let total = s.parameter::<trellis_elaborate::FloatExpr>("total")?;
        s.assign(&total, sinks.map_extract(|sink| sink.float_param.clone()).sum())?;
        Ok(())
    }
}

#[test]
fn map_extract_projects_element_parameters() {
    let block = elaborate_block(TestProjection).unwrap();
    let constraint = block
        .constraints
        .values()
        .find(|c| matches!(c, ValueExpr::Assign { .. }))
        .unwrap();
    let ValueExpr::Assign { dst, src } = constraint else {
        unreachable!()
    };
    assert_eq!(*dst, LocalPath::from_names(&["total"]));
    let ValueExpr::UnarySet { vals, .. } = src.as_ref() else {
        panic!("expected a reduction, got {src:?}");
    };
    assert_eq!(
        **vals,
        ValueExpr::MapExtract {
            container: Box::new(ValueExpr::Ref(LocalPath::from_names(&["sinks"]))),
            path: LocalPath::from_names(&["float_param"]),
        }
    );
}
