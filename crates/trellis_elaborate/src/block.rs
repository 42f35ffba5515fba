//! Block, link and mixin definitions.
//!
//! User element types implement [`BlockType`] or [`LinkType`]: `class` names
//! the library element, `init` declares the interface (parameters and ports)
//! and returns an `Io` struct of typed handles, `contents` builds the internal
//! hierarchy and `generate` builds it from solved parameter values. The
//! session stores definitions type-erased behind [`ErasedBlock`] and hands
//! the typed `Io` back through [`Child`].

use crate::connect::{ConnectTarget, Endpoint};
use crate::context::Frame;
use crate::errors::{
    error_element_kind, error_generator, error_mixin, ElabError, ElabResult, G301,
};
use crate::generator::GeneratorInputs;
use crate::ids::{BlockId, Owner, PortId};
use crate::port::PortHandle;
use crate::session::{BlockState, Session};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use trellis_common::InternalError;

/// Library identity of an element class.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ClassInfo {
    /// Library name.
    pub name: String,
    /// Superclass names, nearest first.
    pub superclasses: Vec<String>,
    /// Abstract classes must be refined before solving.
    pub is_abstract: bool,
    /// Class an abstract block refines to when nothing else is chosen.
    pub default_refinement: Option<String>,
    /// For interface mixins, the abstract class the mixin applies to.
    pub mixin_base: Option<String>,
    /// Contents are built by `generate` from solved values.
    pub is_generator: bool,
}

impl ClassInfo {
    /// A concrete class with no superclasses.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// An interface mixin applying to `base`.
    pub fn mixin(name: impl Into<String>, base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            name: name.into(),
            superclasses: vec![base.clone()],
            is_abstract: true,
            mixin_base: Some(base),
            ..Self::default()
        }
    }

    /// Adds a superclass.
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclasses.push(superclass.into());
        self
    }

    /// Marks the class abstract.
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Sets the default refinement.
    pub fn default_refinement(mut self, class: impl Into<String>) -> Self {
        self.default_refinement = Some(class.into());
        self
    }

    /// Marks the class a generator whose contents come from
    /// [`BlockType::generate`].
    pub fn generator(mut self) -> Self {
        self.is_generator = true;
        self
    }

    /// Whether this class is `other` or derives from it.
    pub fn is_a(&self, other: &str) -> bool {
        self.name == other || self.superclasses.iter().any(|s| s == other)
    }
}

/// What kind of element a block node holds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockKind {
    /// A hierarchy block.
    Block,
    /// A link.
    Link,
    /// An interface mixin.
    Mixin,
}

/// Port tags. Chains follow the direction tags; implicit connection scopes
/// match on any tag.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PortTag {
    /// Input port.
    Input,
    /// Output port.
    Output,
    /// Bidirectional port.
    InOut,
    /// A library-defined role, such as a supply or ground rail.
    Custom(&'static str),
}

/// A hierarchy block definition.
pub trait BlockType: 'static {
    /// Typed handles to the block's interface.
    type Io: Clone + 'static;

    /// Library identity.
    fn class(&self) -> ClassInfo;

    /// Declares parameters and ports.
    fn init(&self, s: &mut Session) -> ElabResult<Self::Io>;

    /// Declares internal blocks, connections and constraints.
    fn contents(&self, _io: &Self::Io, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }

    /// Builds the implementation from solved parameter values. Runs only
    /// for classes marked with [`ClassInfo::generator`].
    fn generate(
        &self,
        _io: &Self::Io,
        _s: &mut Session,
        _inputs: &GeneratorInputs,
    ) -> ElabResult<()> {
        Err(ElabError::Generator(
            error_generator(
                G301,
                &self.class().name,
                "Generator missing generate implementation",
            )
            .with_help("define generate"),
        ))
    }
}

/// A link definition: the shared medium joining ports of one family.
pub trait LinkType: 'static {
    /// Typed handles to the link's ports and parameters.
    type Io: Clone + 'static;

    /// Library identity.
    fn class(&self) -> ClassInfo;

    /// Declares parameters, ports, nested links and constraints.
    fn init(&self, s: &mut Session) -> ElabResult<Self::Io>;

    /// Further constraints, after the interface is complete.
    fn contents(&self, _io: &Self::Io, _s: &mut Session) -> ElabResult<()> {
        Ok(())
    }
}

/// Block or link definition with the `Io` type erased.
pub(crate) trait ErasedBlock {
    fn class(&self) -> ClassInfo;
    fn kind(&self) -> BlockKind;
    fn init_erased(&self, s: &mut Session) -> ElabResult<Rc<dyn Any>>;
    fn contents_erased(&self, io: &dyn Any, s: &mut Session) -> ElabResult<()>;
    fn generate_erased(
        &self,
        io: &dyn Any,
        s: &mut Session,
        inputs: &GeneratorInputs,
    ) -> ElabResult<()>;
}

pub(crate) struct AsBlock<B>(pub B);
pub(crate) struct AsLink<L>(pub L);

fn downcast_io<'a, T: 'static>(io: &'a dyn Any, class: &str) -> ElabResult<&'a T> {
    io.downcast_ref::<T>().ok_or_else(|| {
        InternalError::new(format!("interface of `{class}` has an unexpected type")).into()
    })
}

impl<B: BlockType> ErasedBlock for AsBlock<B> {
    fn class(&self) -> ClassInfo {
        self.0.class()
    }

    fn kind(&self) -> BlockKind {
        if self.0.class().mixin_base.is_some() {
            BlockKind::Mixin
        } else {
            BlockKind::Block
        }
    }

    fn init_erased(&self, s: &mut Session) -> ElabResult<Rc<dyn Any>> {
        Ok(Rc::new(self.0.init(s)?))
    }

    fn contents_erased(&self, io: &dyn Any, s: &mut Session) -> ElabResult<()> {
        let io = downcast_io::<B::Io>(io, &self.0.class().name)?;
        self.0.contents(io, s)
    }

    fn generate_erased(
        &self,
        io: &dyn Any,
        s: &mut Session,
        inputs: &GeneratorInputs,
    ) -> ElabResult<()> {
        let io = downcast_io::<B::Io>(io, &self.0.class().name)?;
        self.0.generate(io, s, inputs)
    }
}

impl<L: LinkType> ErasedBlock for AsLink<L> {
    fn class(&self) -> ClassInfo {
        self.0.class()
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Link
    }

    fn init_erased(&self, s: &mut Session) -> ElabResult<Rc<dyn Any>> {
        Ok(Rc::new(self.0.init(s)?))
    }

    fn contents_erased(&self, io: &dyn Any, s: &mut Session) -> ElabResult<()> {
        let io = downcast_io::<L::Io>(io, &self.0.class().name)?;
        self.0.contents(io, s)
    }

    fn generate_erased(
        &self,
        _io: &dyn Any,
        _s: &mut Session,
        _inputs: &GeneratorInputs,
    ) -> ElabResult<()> {
        Ok(())
    }
}

/// A factory for a block or link class, used where a port names its link or
/// bridge type and by the library.
#[derive(Clone, Copy)]
pub struct ElementSpec {
    make: fn() -> Rc<dyn ErasedBlock>,
}

fn make_block<B: BlockType + Default>() -> Rc<dyn ErasedBlock> {
    Rc::new(AsBlock(B::default()))
}

fn make_link<L: LinkType + Default>() -> Rc<dyn ErasedBlock> {
    Rc::new(AsLink(L::default()))
}

impl ElementSpec {
    /// A block class.
    pub fn block<B: BlockType + Default>() -> Self {
        Self {
            make: make_block::<B>,
        }
    }

    /// A link class.
    pub fn link<L: LinkType + Default>() -> Self {
        Self {
            make: make_link::<L>,
        }
    }

    /// The class name.
    pub fn name(&self) -> String {
        (self.make)().class().name
    }

    pub(crate) fn make(&self) -> Rc<dyn ErasedBlock> {
        (self.make)()
    }
}

impl fmt::Debug for ElementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementSpec").field(&self.name()).finish()
    }
}

impl PartialEq for ElementSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

/// A child block or link: its handle plus its typed interface.
#[derive(Clone, Debug)]
pub struct Child<Io> {
    id: BlockId,
    io: Io,
}

impl<Io> Child<Io> {
    /// The block handle.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// The interface.
    pub fn io(&self) -> &Io {
        &self.io
    }
}

impl<Io> Deref for Child<Io> {
    type Target = Io;

    fn deref(&self) -> &Io {
        &self.io
    }
}

/// Interface of an adapter block: a source port joined to the adapted port
/// and a destination port handed back.
pub trait AdapterIo {
    /// The destination port handle.
    type Dst: PortHandle;

    /// The port joined to the port being adapted.
    fn src(&self) -> PortId;

    /// The adapted port.
    fn dst(&self) -> Self::Dst;
}

fn typed_io<Io: Clone + 'static>(io: Rc<dyn Any>, class: &str) -> ElabResult<Io> {
    Ok(downcast_io::<Io>(&*io, class)?.clone())
}

impl Session {
    /// Instantiates a child block of the enclosing block.
    pub fn block<B: BlockType>(&mut self, name: &str, block: B) -> ElabResult<Child<B::Io>> {
        let parent = self.enclosing_block("Block(...)")?;
        if self.blocks[parent].kind == BlockKind::Link {
            return Err(ElabError::Definition(error_element_kind(
                self.class_name(parent),
                "links can't contain blocks",
            )));
        }
        self.check_phase(
            parent,
            &[BlockState::Init, BlockState::Contents, BlockState::Generate],
            "Block(...)",
            "init, contents or generate",
        )?;
        let class = block.class().name;
        let (id, io) = self.alloc_block(Rc::new(AsBlock(block)), Some(Owner::Block(parent)))?;
        self.blocks[parent]
            .blocks
            .insert(name, id)
            .map_err(|e| self.naming_error(parent, e))?;
        tracing::trace!(parent = %self.class_name(parent), child = name, class = %class, "instantiated");
        self.connect_implicit(parent, id)?;
        Ok(Child {
            id,
            io: typed_io(io, &class)?,
        })
    }

    /// Applies an interface mixin to an abstract child block.
    pub fn with_mixin<Io, M: BlockType>(
        &mut self,
        host: &Child<Io>,
        mixin: M,
    ) -> ElabResult<Child<M::Io>> {
        let info = mixin.class();
        let Some(base) = info.mixin_base.clone() else {
            return Err(ElabError::Definition(error_mixin(
                &info.name,
                "with_mixin(...) requires an interface mixin",
            )));
        };
        let host_id = host.id;
        let host_node = &self.blocks[host_id];
        if host_node.kind == BlockKind::Mixin {
            return Err(ElabError::Definition(error_mixin(
                &host_node.class.name,
                "mixins cannot be applied to a mixin",
            )));
        }
        if !host_node.class.is_abstract {
            return Err(ElabError::Definition(error_mixin(
                &host_node.class.name,
                "mixins can only be applied to abstract blocks",
            )));
        }
        if !host_node.class.is_a(&base) {
            return Err(ElabError::Definition(error_mixin(
                &info.name,
                &format!("mixin base `{base}` is not a superclass of `{}`", host_node.class.name),
            )));
        }
        let parent = host_node.parent;
        let enclosing = self.enclosing_block("with_mixin(...)")?;
        if parent != Some(Owner::Block(enclosing)) {
            return Err(ElabError::Definition(error_mixin(
                &info.name,
                "mixins can only be applied by the host block's parent",
            )));
        }
        let (id, io) = self.alloc_block(Rc::new(AsBlock(mixin)), parent)?;
        self.blocks[id].mixin_host = Some(host_id);
        self.blocks[host_id].mixins.push(id);
        Ok(Child {
            id,
            io: typed_io(io, &info.name)?,
        })
    }

    /// Inserts an adapter block between `port` and the rest of the net and
    /// returns the adapted port.
    pub fn convert<A>(&mut self, port: &impl PortHandle, adapter: A) -> ElabResult<<A::Io as AdapterIo>::Dst>
    where
        A: BlockType,
        A::Io: AdapterIo,
    {
        let enclosing = self.enclosing_block("convert(...)")?;
        let port_id = port.port_id();
        let owner = self.port_block(port_id);
        let Some(owner) = owner.filter(|b| self.block_parent(*b) == Some(enclosing)) else {
            return Err(ElabError::Connectivity(crate::errors::error_connect(
                crate::errors::N301,
                self.class_name(enclosing),
                "can only adapt ports of child blocks",
            )));
        };
        let block_name = self.blocks[enclosing]
            .blocks
            .name_of(self.mixin_host_or_self(owner))
            .unwrap_or_default()
            .to_string();
        let port_name = self.name_of_port(port_id).unwrap_or_default();
        let adapter = self.block(&format!("(adapter){block_name}.{port_name}"), adapter)?;
        let src = adapter.io().src();
        let port_target = ConnectTarget::Endpoint(Endpoint::Port(port_id));
        let src_target = ConnectTarget::Endpoint(Endpoint::Port(src));
        self.connect(&[&port_target, &src_target])?;
        Ok(adapter.io().dst())
    }

    /// A mixin's host, or the block itself.
    pub(crate) fn mixin_host_or_self(&self, block: BlockId) -> BlockId {
        self.blocks[block].mixin_host.unwrap_or(block)
    }

    /// Runs the root block's contents with the block in context.
    pub(crate) fn run_contents(&mut self, block: BlockId) -> ElabResult<()> {
        let node = &self.blocks[block];
        let def = node.def.clone();
        let io = node
            .io
            .clone()
            .ok_or_else(|| InternalError::new("contents before init"))?;
        self.blocks[block].state = BlockState::Contents;
        self.in_frame(Frame::Block(block), |s| def.contents_erased(&*io, s))?;
        self.blocks[block].state = BlockState::PostContents;
        Ok(())
    }

    /// Instantiates a root element at top level and runs its contents.
    pub(crate) fn instantiate_root(&mut self, def: Rc<dyn ErasedBlock>) -> ElabResult<BlockId> {
        let (id, _) = self.alloc_block(def, None)?;
        self.run_contents(id)?;
        Ok(id)
    }

    /// Instantiates a root block at top level, returning its interface.
    pub fn instantiate<B: BlockType>(&mut self, block: B) -> ElabResult<Child<B::Io>> {
        let class = block.class().name;
        let id = self.instantiate_root(Rc::new(AsBlock(block)))?;
        let io = self.blocks[id]
            .io
            .clone()
            .ok_or_else(|| InternalError::new("root without interface"))?;
        Ok(Child {
            id,
            io: typed_io(io, &class)?,
        })
    }

    /// Tags ports of the enclosing block.
    pub fn tag(&mut self, port: &impl PortHandle, tags: &[PortTag]) -> ElabResult<()> {
        let block = self.enclosing_block("tag(...)")?;
        let id = port.port_id();
        if self.port_block(id) != Some(block) {
            return Err(ElabError::Definition(error_element_kind(
                self.class_name(block),
                "can only tag the block's own ports",
            )));
        }
        self.blocks[block]
            .port_tags
            .extend(tags.iter().map(|tag| (id, *tag)));
        Ok(())
    }

    /// Ports of `block` carrying `tag`, in declaration order.
    pub(crate) fn tagged_ports(&self, block: BlockId, tag: PortTag) -> Vec<PortId> {
        let mut ports: Vec<PortId> = Vec::new();
        let mut owners = vec![block];
        owners.extend(self.blocks[block].mixins.iter().copied());
        for owner in owners {
            for (port, port_tag) in &self.blocks[owner].port_tags {
                if *port_tag == tag && !ports.contains(port) {
                    ports.push(*port);
                }
            }
        }
        ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixin_class_is_abstract_subclass_of_base() {
        let info = ClassInfo::mixin("TestMixin", "TestMixinBase");
        assert!(info.is_abstract);
        assert!(info.is_a("TestMixinBase"));
        assert_eq!(info.mixin_base.as_deref(), Some("TestMixinBase"));
    }

    #[test]
    fn class_builders() {
        let info = ClassInfo::new("Resistor")
            .extends("PassiveComponent")
            .abstract_class()
            .default_refinement("GenericResistor");
        assert!(info.is_a("PassiveComponent"));
        assert!(!info.is_a("Capacitor"));
        assert_eq!(info.default_refinement.as_deref(), Some("GenericResistor"));
    }
}
