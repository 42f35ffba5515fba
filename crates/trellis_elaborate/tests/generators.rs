//! The generator protocol: stubs, generation from solved values and the
//! equivalence of generated and directly written blocks.

use trellis_elaborate::errors::{G301, G302, G307};
use trellis_elaborate::reference::*;
use trellis_elaborate::{
    elaborate_block, generate_block, BlockType, ClassInfo, ElabError, ElabResult,
    GeneratorInputs, IntExpr, Session,
};
use trellis_ir::rpc::ExprValue;
use trellis_ir::{HierarchyBlock, LocalPath, Reserved, ValueExpr, ValueLit};

fn count(value: i64) -> Vec<ExprValue> {
    vec![ExprValue {
        path: LocalPath::from_names(&["count"]),
        value: ValueLit::Integer(value),
    }]
}

fn assert_same_structure(generated: &HierarchyBlock, direct: &HierarchyBlock) {
    assert_eq!(generated.params, direct.params);
    assert_eq!(generated.ports, direct.ports);
    assert_eq!(generated.blocks, direct.blocks);
    assert_eq!(generated.links, direct.links);
    assert_eq!(generated.constraints, direct.constraints);
}

#[test]
fn stub_declares_interface_and_required_params() {
    let stub = elaborate_block(TestGenerator {
        count: Some(IntExpr::from(2)),
    })
    .unwrap();
    assert_eq!(
        stub.generator.as_ref().map(|g| g.required_params.clone()),
        Some(vec![LocalPath::from_names(&["count"])])
    );
    assert_eq!(
        stub.param_defaults["count"],
        ValueExpr::Literal(ValueLit::Integer(2))
    );
    assert!(stub.blocks.is_empty());
    assert!(stub.links.is_empty());
}

#[test]
fn generated_block_matches_the_direct_definition() {
    let generated = generate_block(
        TestGenerator {
            count: Some(IntExpr::from(2)),
        },
        &count(2),
    )
    .unwrap();
    let direct = elaborate_block(TestGeneratorFixed { count: 2 }).unwrap();
    assert!(generated.generator.is_none());
    assert_eq!(
        generated.blocks.keys().collect::<Vec<_>>(),
        ["source", "sink0", "sink1"]
    );
    assert_same_structure(&generated, &direct);
}

#[test]
fn solved_values_drive_generation() {
    let generated = generate_block(TestGenerator::default(), &count(4)).unwrap();
    assert_eq!(generated.blocks.len(), 5);
    assert_eq!(generated.constraints.len(), 5);
}

#[test]
fn legacy_generator_matches_the_direct_definition() {
    let stub = elaborate_block(TestLegacyGenerator::default()).unwrap();
    assert_eq!(
        stub.generator.map(|g| g.required_params),
        Some(vec![LocalPath::from_names(&["count"])])
    );
    let generated = generate_block(TestLegacyGenerator::default(), &count(3)).unwrap();
    let direct = elaborate_block(TestGeneratorFixed { count: 3 }).unwrap();
    assert_same_structure(&generated, &direct);
}

#[test]
fn missing_solved_value_is_a_generator_error() {
    let err = generate_block(TestGenerator::default(), &[]).unwrap_err();
    assert!(matches!(err, ElabError::Generator(_)), "{err:?}");
}

#[test]
fn mistyped_solved_value_is_a_generator_error() {
    let values = vec![ExprValue {
        path: LocalPath::from_names(&["count"]),
        value: ValueLit::Text("two".into()),
    }];
    let err = generate_block(TestGenerator::default(), &values).unwrap_err();
    assert!(matches!(err, ElabError::Generator(_)), "{err:?}");
}

#[test]
fn plain_block_cannot_be_generated() {
    let err = generate_block(TestBlockSink, &[]).unwrap_err();
    assert!(matches!(err, ElabError::Generator(_)), "{err:?}");
}

fn is_connected(value: bool) -> Vec<ExprValue> {
    vec![ExprValue {
        path: LocalPath::from_names(&["sink"]).with_reserved(Reserved::IsConnected),
        value: ValueLit::Boolean(value),
    }]
}

#[test]
fn default_export_stub_depends_on_connectedness() {
    let stub = elaborate_block(TestDefaultExport).unwrap();
    assert_eq!(
        stub.generator.map(|g| g.required_params),
        Some(vec![
            LocalPath::from_names(&["sink"]).with_reserved(Reserved::IsConnected)
        ])
    );
    assert!(!stub.constraints.contains_key("(reqd)sink"));
}

#[test]
fn connected_default_export_exports_the_inner_port() {
    let generated = generate_block(TestDefaultExport, &is_connected(true)).unwrap();
    assert!(generated.links.is_empty());
    assert_eq!(
        generated.constraints["(conn)_sink_link"],
        ValueExpr::exported(
            LocalPath::from_names(&["sink"]),
            LocalPath::from_names(&["inner", "sink"])
        )
    );
}

#[test]
fn unconnected_default_export_uses_the_fallback() {
    let generated = generate_block(TestDefaultExport, &is_connected(false)).unwrap();
    let link = "_inner_sink_link";
    assert_eq!(generated.links.keys().collect::<Vec<_>>(), [link]);
    assert_eq!(
        generated.constraints[format!("(conn){link}_d1").as_str()],
        ValueExpr::connected(
            LocalPath::from_names(&["fallback", "source"]),
            LocalPath::from_names(&[link, "source"])
        )
    );
}

/// Registers a legacy callback and also overrides `generate`.
#[derive(Clone, Debug, Default)]
struct TestMixedGenerator;

impl BlockType for TestMixedGenerator {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestMixedGenerator").generator()
    }

    fn init(&self, s: &mut Session) -> ElabResult<()> {
        s.generator(std::iter::empty(), |s, _inputs| {
            s.block("legacy_child", TestBlockSink)?;
            Ok(())
        })
    }

    fn generate(&self, _io: &(), s: &mut Session, _inputs: &GeneratorInputs) -> ElabResult<()> {
        s.block("modern_child", TestBlockSink)?;
        Ok(())
    }
}

fn generator_code(err: &ElabError) -> Option<trellis_diagnostics::DiagnosticCode> {
    match err {
        ElabError::Generator(d) => Some(d.code),
        _ => None,
    }
}

#[test]
fn mixed_generator_styles_fail_at_stub_and_generate() {
    let err = elaborate_block(TestMixedGenerator).unwrap_err();
    assert_eq!(generator_code(&err), Some(G302), "{err:?}");
    let err = generate_block(TestMixedGenerator, &[]).unwrap_err();
    assert_eq!(generator_code(&err), Some(G302), "{err:?}");
}

/// An abstract class marked as a generator.
#[derive(Clone, Debug, Default)]
struct TestAbstractGenerator;

impl BlockType for TestAbstractGenerator {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestAbstractGenerator")
            .abstract_class()
            .generator()
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn generate(&self, _io: &(), s: &mut Session, _inputs: &GeneratorInputs) -> ElabResult<()> {
        s.block("child", TestBlockSink)?;
        Ok(())
    }
}

#[test]
fn abstract_generators_cannot_generate() {
    let err = generate_block(TestAbstractGenerator, &[]).unwrap_err();
    assert_eq!(generator_code(&err), Some(G307), "{err:?}");
}

/// Marked as a generator without overriding `generate`.
#[derive(Clone, Debug, Default)]
struct TestMissingGenerate;

impl BlockType for TestMissingGenerate {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestMissingGenerate").generator()
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }
}

#[test]
fn generator_without_generate_fails_when_generated() {
    let stub = elaborate_block(TestMissingGenerate).unwrap();
    assert!(stub.generator.is_some());
    let err = generate_block(TestMissingGenerate, &[]).unwrap_err();
    assert_eq!(generator_code(&err), Some(G301), "{err:?}");
}
