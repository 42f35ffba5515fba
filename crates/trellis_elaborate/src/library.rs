//! The element library: named block, link and port classes.
//!
//! A [`Library`] maps class names to factories of default-constructed
//! elements. Elaboration is deterministic for a class name and its generator
//! values, so results are memoized on a [`ContentHash`] of those inputs.

use crate::block::{BlockType, ElementSpec, LinkType};
use crate::emit::{
    elaborate_erased_block, elaborate_erased_link, elaborate_erased_port, generate_erased_block,
};
use crate::errors::{error_unknown_class, ElabError, ElabResult};
use crate::port::{ErasedPort, PortType};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;
use trellis_common::ContentHash;
use trellis_ir::rpc::ExprValue;
use trellis_ir::{Design, HierarchyBlock, LibraryElement, LibraryPath};

#[derive(Clone, Copy)]
enum Entry {
    Block(ElementSpec),
    Link(ElementSpec),
    Port(fn() -> Rc<dyn ErasedPort>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Block(_) => "block",
            Entry::Link(_) => "link",
            Entry::Port(_) => "port",
        }
    }
}

fn make_port<P: PortType>() -> Rc<dyn ErasedPort> {
    Rc::new(P::default())
}

/// A registry of library classes with memoized elaboration.
pub struct Library {
    /// Module name answered to index requests.
    module: String,

    /// Registered classes in registration order.
    entries: IndexMap<String, Entry>,

    /// Elaborated elements keyed by the hash of request kind, class name and
    /// values.
    memo: HashMap<ContentHash, LibraryElement>,
}

impl Library {
    /// Creates an empty library indexed under `module`.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            entries: IndexMap::new(),
            memo: HashMap::new(),
        }
    }

    /// The module name.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Registers a block class.
    pub fn register_block<B: BlockType + Default>(&mut self) -> &mut Self {
        let spec = ElementSpec::block::<B>();
        self.entries.insert(spec.name(), Entry::Block(spec));
        self
    }

    /// Registers a link class.
    pub fn register_link<L: LinkType + Default>(&mut self) -> &mut Self {
        let spec = ElementSpec::link::<L>();
        self.entries.insert(spec.name(), Entry::Link(spec));
        self
    }

    /// Registers a port or bundle class.
    pub fn register_port<P: PortType>(&mut self) -> &mut Self {
        let name = PortType::class(&P::default()).name;
        self.entries.insert(name, Entry::Port(make_port::<P>));
        self
    }

    /// Registered class names with their kinds, in registration order.
    pub fn classes(&self) -> impl Iterator<Item = (&str, &'static str)> + '_ {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.kind()))
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no class is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of memoized elaborations.
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }

    /// Lists the classes of a module.
    pub fn index_module(&self, module: &str) -> ElabResult<Vec<LibraryPath>> {
        if module != self.module {
            return Err(ElabError::Definition(error_unknown_class(module, "module")));
        }
        Ok(self.entries.keys().map(LibraryPath::new).collect())
    }

    fn entry(&self, name: &str, kind: &str) -> ElabResult<Entry> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| ElabError::Definition(error_unknown_class(name, kind)))
    }

    /// Elaborates a class into its library definition. Generator blocks
    /// elaborate to their stub.
    pub fn elaborate_class(&mut self, name: &str) -> ElabResult<LibraryElement> {
        let entry = self.entry(name, "library")?;
        let key = ContentHash::of_value(&("class", name))?;
        if let Some(cached) = self.memo.get(&key) {
            tracing::trace!(class = name, key = %key, "library memo hit");
            return Ok(cached.clone());
        }
        let element = match entry {
            Entry::Block(spec) => LibraryElement::Block(elaborate_erased_block(spec.make())?),
            Entry::Link(spec) => LibraryElement::Link(elaborate_erased_link(spec.make())?),
            Entry::Port(make) => elaborate_erased_port(make())?,
        };
        tracing::debug!(class = name, kind = element.kind(), "elaborated library class");
        self.memo.insert(key, element.clone());
        Ok(element)
    }

    /// Runs a generator block with solved values.
    pub fn elaborate_generator(
        &mut self,
        name: &str,
        values: &[ExprValue],
    ) -> ElabResult<HierarchyBlock> {
        let Entry::Block(spec) = self.entry(name, "block")? else {
            return Err(ElabError::Definition(error_unknown_class(name, "block")));
        };
        let key = ContentHash::of_value(&("generate", name, values))?;
        if let Some(LibraryElement::Block(cached)) = self.memo.get(&key) {
            tracing::trace!(class = name, key = %key, "generator memo hit");
            return Ok(cached.clone());
        }
        let generated = generate_erased_block(spec.make(), values)?;
        tracing::debug!(class = name, values = values.len(), "generated block");
        self.memo
            .insert(key, LibraryElement::Block(generated.clone()));
        Ok(generated)
    }

    /// Elaborates a block class as the root of a design.
    pub fn elaborate_toplevel(&mut self, name: &str) -> ElabResult<Design> {
        match self.elaborate_class(name)? {
            LibraryElement::Block(contents) => Ok(Design { contents }),
            _ => Err(ElabError::Definition(error_unknown_class(name, "block"))),
        }
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new("trellis")
    }
}
