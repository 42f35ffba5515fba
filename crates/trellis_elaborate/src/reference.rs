//! A small reference library: source and sink ports joined by a link with
//! aggregate constraints, a bridge for boundary sinks, an adapter, and a
//! handful of blocks exercising hierarchy, export, chains, mixins and
//! generators.

use crate::connect::Connectable;
use crate::block::{AdapterIo, BlockType, ClassInfo, ElementSpec, LinkType, PortTag};
use crate::errors::ElabResult;
use crate::expr::{FloatExpr, IntExpr, RangeExpr, TypedExpr};
use crate::generator::GeneratorInputs;
use crate::ids::PortId;
use crate::library::Library;
use crate::port::{PortClass, PortHandle, PortType};
use crate::session::Session;
use crate::vector::{Vector, VectorHandle};

/// A source port.
#[derive(Clone, Debug, Default)]
pub struct TestPortSource {
    /// Initializer of the emitted value.
    pub float_param: Option<FloatExpr>,
    /// Initializer of the allowed value range.
    pub float_param_limit: Option<RangeExpr>,
    /// Initializer of the supplied range.
    pub range_param: Option<RangeExpr>,
}

/// A declared [`TestPortSource`].
#[derive(Clone, Debug)]
pub struct TestPortSourceHandle {
    id: PortId,
    /// The emitted value.
    pub float_param: FloatExpr,
    /// The allowed value range.
    pub float_param_limit: RangeExpr,
    /// The supplied range.
    pub range_param: RangeExpr,
}

impl PortHandle for TestPortSourceHandle {
    fn port_id(&self) -> PortId {
        self.id
    }
}

impl PortType for TestPortSource {
    type Handle = TestPortSourceHandle;

    fn class(&self) -> PortClass {
        PortClass::port("TestPortSource")
            .extends("TestPortBase")
            .with_link(ElementSpec::link::<TestLink>())
    }

    fn define(&self, s: &mut Session, id: PortId) -> ElabResult<TestPortSourceHandle> {
        Ok(TestPortSourceHandle {
            id,
            float_param: s.parameter_opt("float_param", self.float_param.clone())?,
            float_param_limit: s.parameter_opt("float_param_limit", self.float_param_limit.clone())?,
            range_param: s.parameter_opt("range_param", self.range_param.clone())?,
        })
    }
}

/// A sink port.
#[derive(Clone, Debug, Default)]
pub struct TestPortSink {
    /// Initializer of the consumed value.
    pub float_param: Option<FloatExpr>,
    /// Initializer of the accepted range.
    pub range_limit: Option<RangeExpr>,
}

/// A declared [`TestPortSink`].
#[derive(Clone, Debug)]
pub struct TestPortSinkHandle {
    id: PortId,
    /// The consumed value.
    pub float_param: FloatExpr,
    /// The accepted range.
    pub range_limit: RangeExpr,
}

impl PortHandle for TestPortSinkHandle {
    fn port_id(&self) -> PortId {
        self.id
    }
}

impl PortType for TestPortSink {
    type Handle = TestPortSinkHandle;

    fn class(&self) -> PortClass {
        PortClass::port("TestPortSink")
            .extends("TestPortBase")
            .with_link(ElementSpec::link::<TestLink>())
            .with_bridge(ElementSpec::block::<TestPortBridge>())
    }

    fn define(&self, s: &mut Session, id: PortId) -> ElabResult<TestPortSinkHandle> {
        Ok(TestPortSinkHandle {
            id,
            float_param: s.parameter_opt("float_param", self.float_param.clone())?,
            range_limit: s.parameter_opt("range_limit", self.range_limit.clone())?,
        })
    }
}

/// The link joining one source to any number of sinks.
#[derive(Clone, Debug, Default)]
pub struct TestLink;

/// Interface of [`TestLink`].
#[derive(Clone, Debug)]
pub struct TestLinkIo {
    /// The source role.
    pub source: TestPortSourceHandle,
    /// The sink roles.
    pub sinks: VectorHandle<TestPortSink>,
    /// Sum of the sinks' values.
    pub float_param_sink_sum: FloatExpr,
    /// Span of the sinks' values.
    pub float_param_sink_range: RangeExpr,
    /// Range every sink accepts.
    pub range_param_sink_common: RangeExpr,
}

impl LinkType for TestLink {
    type Io = TestLinkIo;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestLink").extends("TestLinkBase")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestLinkIo> {
        let source = s.port("source", TestPortSource::default())?;
        let sinks = s.port("sinks", Vector(TestPortSink::default()))?;
        let float_param_sink_sum = s.parameter::<FloatExpr>("float_param_sink_sum")?;
        let float_param_sink_range = s.parameter::<RangeExpr>("float_param_sink_range")?;
        let range_param_sink_common = s.parameter::<RangeExpr>("range_param_sink_common")?;

        let sink_values = sinks.map_extract(|sink| sink.float_param.clone());
        s.assign(&float_param_sink_sum, sink_values.sum())?;
        s.assign(
            &float_param_sink_range,
            RangeExpr::from_bounds(sink_values.min(), sink_values.max()),
        )?;
        s.require(&source.float_param.within(source.float_param_limit.clone()))?;
        s.assign(
            &range_param_sink_common,
            sinks.map_extract(|sink| sink.range_limit.clone()).intersection(),
        )?;
        s.require(&source.range_param.within(range_param_sink_common.clone()))?;

        Ok(TestLinkIo {
            source,
            sinks,
            float_param_sink_sum,
            float_param_sink_range,
            range_param_sink_common,
        })
    }
}

/// Bridges a boundary sink into an inner link as that link's source.
#[derive(Clone, Debug, Default)]
pub struct TestPortBridge;

/// Interface of [`TestPortBridge`].
#[derive(Clone, Debug)]
pub struct TestPortBridgeIo {
    /// Faces the enclosing block's boundary.
    pub outer_port: TestPortSinkHandle,
    /// Faces the inner link.
    pub inner_link: TestPortSourceHandle,
}

impl BlockType for TestPortBridge {
    type Io = TestPortBridgeIo;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestPortBridge").extends("PortBridge")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestPortBridgeIo> {
        let outer_port = s.port("outer_port", TestPortSink::default())?;
        let inner_link = s.port("inner_link", TestPortSource::default())?;
        Ok(TestPortBridgeIo {
            outer_port,
            inner_link,
        })
    }

    fn contents(&self, io: &TestPortBridgeIo, s: &mut Session) -> ElabResult<()> {
        s.assign(&io.outer_port.float_param, io.inner_link.float_param.clone())?;
        Ok(())
    }
}

/// Adapts a sink into a source.
#[derive(Clone, Debug, Default)]
pub struct TestAdapter;

/// Interface of [`TestAdapter`].
#[derive(Clone, Debug)]
pub struct TestAdapterIo {
    /// Joined to the adapted port.
    pub src: TestPortSinkHandle,
    /// The adapted port.
    pub dst: TestPortSourceHandle,
}

impl AdapterIo for TestAdapterIo {
    type Dst = TestPortSourceHandle;

    fn src(&self) -> PortId {
        self.src.port_id()
    }

    fn dst(&self) -> TestPortSourceHandle {
        self.dst.clone()
    }
}

impl BlockType for TestAdapter {
    type Io = TestAdapterIo;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestAdapter").extends("PortAdapter")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestAdapterIo> {
        let src = s.port("src", TestPortSink::default())?;
        let dst = s.port("dst", TestPortSource::default())?;
        s.assign(&dst.float_param, src.float_param.clone())?;
        Ok(TestAdapterIo { src, dst })
    }
}

/// A block driving one source port from its `float_value` argument.
#[derive(Clone, Debug, Default)]
pub struct TestBlockSource {
    /// The value to drive.
    pub float_value: Option<FloatExpr>,
}

/// Interface of [`TestBlockSource`].
#[derive(Clone, Debug)]
pub struct TestBlockSourceIo {
    /// The driven port.
    pub source: TestPortSourceHandle,
    /// The value argument.
    pub float_value: FloatExpr,
}

impl BlockType for TestBlockSource {
    type Io = TestBlockSourceIo;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestBlockSource")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestBlockSourceIo> {
        let float_value = s.arg::<FloatExpr>("float_value", self.float_value.clone())?;
        let source = s.port(
            "source",
            TestPortSource {
                float_param: Some(float_value.clone()),
                ..TestPortSource::default()
            },
        )?;
        s.tag(&source, &[PortTag::Output])?;
        Ok(TestBlockSourceIo {
            source,
            float_value,
        })
    }
}

/// A block consuming one sink port.
#[derive(Clone, Debug, Default)]
pub struct TestBlockSink;

/// Interface of [`TestBlockSink`].
#[derive(Clone, Debug)]
pub struct TestBlockSinkIo {
    /// The consumed port.
    pub sink: TestPortSinkHandle,
}

impl BlockType for TestBlockSink {
    type Io = TestBlockSinkIo;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestBlockSink")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestBlockSinkIo> {
        let sink = s.port("sink", TestPortSink::default())?;
        s.tag(&sink, &[PortTag::Input])?;
        Ok(TestBlockSinkIo { sink })
    }
}

/// A block passing a sink through to a source, for chains.
#[derive(Clone, Debug, Default)]
pub struct TestBlockPassthrough;

/// Interface of [`TestBlockPassthrough`].
#[derive(Clone, Debug)]
pub struct TestBlockPassthroughIo {
    /// The input.
    pub sink: TestPortSinkHandle,
    /// The output.
    pub source: TestPortSourceHandle,
}

impl BlockType for TestBlockPassthrough {
    type Io = TestBlockPassthroughIo;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestBlockPassthrough")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestBlockPassthroughIo> {
        let sink = s.port("sink", TestPortSink::default())?;
        let source = s.port(
            "source",
            TestPortSource {
                float_param: Some(sink.float_param.clone()),
                ..TestPortSource::default()
            },
        )?;
        s.tag(&sink, &[PortTag::Input])?;
        s.tag(&source, &[PortTag::Output])?;
        Ok(TestBlockPassthroughIo { sink, source })
    }
}

/// One source driving two sinks.
#[derive(Clone, Debug, Default)]
pub struct TestBlockTop;

impl BlockType for TestBlockTop {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestBlockTop")
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), s: &mut Session) -> ElabResult<()> {
        let source = s.block(
            "source",
            TestBlockSource {
                float_value: Some(FloatExpr::from(2.5)),
            },
        )?;
        let sink1 = s.block("sink1", TestBlockSink)?;
        let sink2 = s.block("sink2", TestBlockSink)?;
        s.connect(&[&source.source, &sink1.sink, &sink2.sink])?;
        Ok(())
    }
}

/// A boundary sink fanned out to two inner sinks through a bridge.
#[derive(Clone, Debug, Default)]
pub struct TestBlockBridged;

impl BlockType for TestBlockBridged {
    type Io = TestPortSinkHandle;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestBlockBridged")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestPortSinkHandle> {
        s.port("sink", TestPortSink::default())
    }

    fn contents(&self, sink: &TestPortSinkHandle, s: &mut Session) -> ElabResult<()> {
        let inner1 = s.block("inner1", TestBlockSink)?;
        let inner2 = s.block("inner2", TestBlockSink)?;
        s.connect(&[sink, &inner1.sink, &inner2.sink])?;
        Ok(())
    }
}

/// A sink exported from an inner block.
#[derive(Clone, Debug, Default)]
pub struct TestBlockExport;

impl BlockType for TestBlockExport {
    type Io = TestPortSinkHandle;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestBlockExport")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestPortSinkHandle> {
        let inner = s.block("inner", TestBlockSink)?;
        s.export("sink", &inner.sink)
    }
}

/// A source, a passthrough and a sink chained together.
#[derive(Clone, Debug, Default)]
pub struct TestBlockChain;

impl BlockType for TestBlockChain {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestBlockChain")
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), s: &mut Session) -> ElabResult<()> {
        let source = s.block("source", TestBlockSource::default())?;
        let pass = s.block("pass", TestBlockPassthrough)?;
        let sink = s.block("sink", TestBlockSink)?;
        s.chain_named("chain", &[&source, &pass, &sink])?;
        Ok(())
    }
}

/// A block exposing a port array of sinks.
#[derive(Clone, Debug, Default)]
pub struct TestBlockSinkArray {
    /// Number of elements to define; `None` leaves the array open.
    pub elements: Option<usize>,
}

impl BlockType for TestBlockSinkArray {
    type Io = VectorHandle<TestPortSink>;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestBlockSinkArray")
    }

    fn init(&self, s: &mut Session) -> ElabResult<VectorHandle<TestPortSink>> {
        let sinks = s.port("sinks", Vector(TestPortSink::default()))?;
        if let Some(count) = self.elements {
            for _ in 0..count {
                s.append_elt(&sinks, TestPortSink::default(), None)?;
            }
            s.defined(&sinks)?;
        }
        Ok(sinks)
    }
}

/// An abstract block a mixin can extend.
#[derive(Clone, Debug, Default)]
pub struct TestMixinBase;

impl BlockType for TestMixinBase {
    type Io = TestPortSinkHandle;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestMixinBase").abstract_class()
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestPortSinkHandle> {
        s.port("base_port", TestPortSink::default())
    }
}

/// An interface mixin over [`TestMixinBase`].
#[derive(Clone, Debug, Default)]
pub struct TestMixin {
    /// Value of the mixin's argument.
    pub mixin_float: Option<FloatExpr>,
}

/// Interface of [`TestMixin`].
#[derive(Clone, Debug)]
pub struct TestMixinIo {
    /// The argument.
    pub mixin_float: FloatExpr,
    /// The mixin's port.
    pub mixin_port: TestPortSinkHandle,
}

impl BlockType for TestMixin {
    type Io = TestMixinIo;

    fn class(&self) -> ClassInfo {
        ClassInfo::mixin("TestMixin", "TestMixinBase")
    }

    fn init(&self, s: &mut Session) -> ElabResult<TestMixinIo> {
        let mixin_float = s.arg::<FloatExpr>("mixin_float", self.mixin_float.clone())?;
        let mixin_port = s.optional_port(
            "mixin_port",
            TestPortSink {
                float_param: Some(mixin_float.clone()),
                ..TestPortSink::default()
            },
        )?;
        Ok(TestMixinIo {
            mixin_float,
            mixin_port,
        })
    }
}

/// A parent attaching [`TestMixin`] to an abstract child.
#[derive(Clone, Debug, Default)]
pub struct TestMixinUser;

impl BlockType for TestMixinUser {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestMixinUser")
    }

    fn init(&self, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), s: &mut Session) -> ElabResult<()> {
        let base = s.block("base", TestMixinBase)?;
        let mixin = s.with_mixin(
            &base,
            TestMixin {
                mixin_float: Some(FloatExpr::from(1.5)),
            },
        )?;
        let source = s.block("source", TestBlockSource::default())?;
        s.connect(&[&source.source, base.io(), &mixin.mixin_port])?;
        Ok(())
    }
}

fn fan_out(s: &mut Session, count: i64) -> ElabResult<()> {
    let source = s.block("source", TestBlockSource::default())?;
    let mut sinks = Vec::new();
    for i in 0..count {
        sinks.push(s.block(&format!("sink{i}"), TestBlockSink)?);
    }
    let mut ports: Vec<&dyn Connectable> = Vec::new();
    ports.push(&source.source);
    for sink in &sinks {
        ports.push(&sink.sink);
    }
    s.connect(&ports)?;
    Ok(())
}

/// A generator instantiating `count` sinks on one source.
#[derive(Clone, Debug, Default)]
pub struct TestGenerator {
    /// Number of sinks.
    pub count: Option<IntExpr>,
}

impl BlockType for TestGenerator {
    type Io = IntExpr;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestGenerator").generator()
    }

    fn init(&self, s: &mut Session) -> ElabResult<IntExpr> {
        let count = s.arg::<IntExpr>("count", self.count.clone())?;
        s.generator_param(&count)?;
        Ok(count)
    }

    fn generate(&self, count: &IntExpr, s: &mut Session, inputs: &GeneratorInputs) -> ElabResult<()> {
        let count = inputs.get(count)?;
        fan_out(s, count)
    }
}

/// The block [`TestGenerator`] generates, with the count fixed up front.
#[derive(Clone, Debug, Default)]
pub struct TestGeneratorFixed {
    /// Number of sinks.
    pub count: i64,
}

impl BlockType for TestGeneratorFixed {
    type Io = IntExpr;

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestGeneratorFixed")
    }

    fn init(&self, s: &mut Session) -> ElabResult<IntExpr> {
        s.arg::<IntExpr>("count", None)
    }

    fn contents(&self, _count: &IntExpr, s: &mut Session) -> ElabResult<()> {
        fan_out(s, self.count)
    }
}

/// The same generator written with a callback instead of `generate`.
#[derive(Clone, Debug, Default)]
pub struct TestLegacyGenerator {
    /// Number of sinks.
    pub count: Option<IntExpr>,
}

impl BlockType for TestLegacyGenerator {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestLegacyGenerator")
    }

    fn init(&self, s: &mut Session) -> ElabResult<()> {
        let count = s.arg::<IntExpr>("count", self.count.clone())?;
        let read = count.clone();
        s.generator([count.expr().clone()], move |s, inputs| {
            let count = inputs.get(&read)?;
            fan_out(s, count)
        })
    }
}

/// A block whose boundary sink is used when connected and otherwise left to
/// a local source.
#[derive(Clone, Debug, Default)]
pub struct TestDefaultExport;

impl BlockType for TestDefaultExport {
    type Io = ();

    fn class(&self) -> ClassInfo {
        ClassInfo::new("TestDefaultExport")
    }

    fn init(&self, s: &mut Session) -> ElabResult<()> {
        let inner = s.block("inner", TestBlockSink)?;
        let fallback = s.block("fallback", TestBlockSource::default())?;
        s.default_export("sink", &inner.sink, &fallback.source)?;
        Ok(())
    }
}

/// The reference library with every fixture registered.
pub fn reference_library() -> Library {
    let mut library = Library::new("trellis.reference");
    library
        .register_port::<TestPortSource>()
        .register_port::<TestPortSink>()
        .register_link::<TestLink>()
        .register_block::<TestPortBridge>()
        .register_block::<TestAdapter>()
        .register_block::<TestBlockSource>()
        .register_block::<TestBlockSink>()
        .register_block::<TestBlockPassthrough>()
        .register_block::<TestBlockTop>()
        .register_block::<TestBlockBridged>()
        .register_block::<TestBlockExport>()
        .register_block::<TestBlockChain>()
        .register_block::<TestBlockSinkArray>()
        .register_block::<TestMixinBase>()
        .register_block::<TestMixin>()
        .register_block::<TestMixinUser>()
        .register_block::<TestGenerator>()
        .register_block::<TestLegacyGenerator>()
        .register_block::<TestDefaultExport>();
    library
}
