//! The elaboration session: arenas of live elements plus the context stack.
//!
//! A [`Session`] replaces process-wide builder state. Every block, port,
//! parameter, connection and constraint created while elaborating one root
//! lives in the session's arenas and is addressed by a `u32` handle, so
//! registries and reference maps key on handles instead of object identity.
//! Two sessions never share state.

use crate::arena::Arena;
use crate::block::{BlockKind, ClassInfo, ErasedBlock, PortTag};
use crate::connect::{Endpoint, ImplicitConnect};
use crate::context::{ContextStack, Frame};
use crate::errors::{
    error_element_kind, error_naming, error_no_context, error_unreachable, error_wrong_phase,
    ElabError, ElabResult,
};
use crate::expr::{Expr, ExprKind, Operand, TypedExpr};
use crate::generator::GeneratorState;
use crate::ids::{BlockId, ChainId, ConnectId, ConstraintId, Owner, ParamId, PortId};
use crate::port::{ErasedPort, PortClass};
use crate::refmap::Ref;
use crate::registry::{NameRegistry, RegistryError, ANON_CHAIN, ANON_CONSTR, ANON_LINK};
use indexmap::IndexMap;
use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;
use trellis_common::InternalError;
use trellis_ir::Metadata;

/// Lifecycle state of a block. States only ever advance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum BlockState {
    /// Allocated, `init` not yet started.
    PreInit,
    /// Running `init`.
    Init,
    /// `init` finished.
    PostInit,
    /// Running `contents`.
    Contents,
    /// `contents` finished.
    PostContents,
    /// Running `generate`.
    Generate,
    /// `generate` finished.
    PostGenerate,
}

/// How a parameter gets its value.
#[derive(Clone, Debug)]
pub(crate) enum ParamInit {
    /// Left to constraints or the solver.
    None,
    /// Assigned from an expression when declared.
    Initializer(Expr),
    /// A constructor argument, with the value the instantiating block gave.
    Arg(Option<Expr>),
}

pub(crate) struct ParamNode {
    pub kind: ExprKind,
    pub owner: Owner,
    pub init: ParamInit,
}

pub(crate) struct VectorState {
    pub sample: PortId,
    /// Boundary-facing elements; `None` until appended to or marked defined.
    pub elts: Option<IndexMap<String, PortId>>,
    pub next_index: usize,
    /// Allocation-facing requests, with their suggested names.
    pub requests: Vec<(Option<String>, PortId)>,
}

pub(crate) struct PortNode {
    pub def: Rc<dyn ErasedPort>,
    pub class: PortClass,
    pub parent: Option<Owner>,
    pub params: NameRegistry<ParamId>,
    pub fields: NameRegistry<PortId>,
    pub handle: Option<Rc<dyn Any>>,
    pub bridge: Option<BlockId>,
    pub vector: Option<VectorState>,
}

pub(crate) struct BlockNode {
    pub def: Rc<dyn ErasedBlock>,
    pub class: ClassInfo,
    pub kind: BlockKind,
    pub parent: Option<Owner>,
    pub state: BlockState,
    pub io: Option<Rc<dyn Any>>,
    pub params: NameRegistry<ParamId>,
    pub ports: NameRegistry<PortId>,
    pub blocks: NameRegistry<BlockId>,
    pub connects: NameRegistry<ConnectId>,
    pub constraints: NameRegistry<ConstraintId>,
    pub chains: NameRegistry<ChainId>,
    pub required_ports: Vec<PortId>,
    pub port_tags: Vec<(PortId, PortTag)>,
    pub implicit_scopes: Vec<Vec<ImplicitConnect>>,
    pub mixins: Vec<BlockId>,
    pub mixin_host: Option<BlockId>,
    pub generator: GeneratorState,
    pub meta: Metadata,
}

pub(crate) struct ConnectNode {
    pub endpoints: Vec<Endpoint>,
    pub flatten: bool,
    /// Set when this net was merged into another.
    pub delegate: Option<ConnectId>,
}

pub(crate) enum ConstraintNode {
    Require(Expr),
    Assign { dst: ParamId, src: Expr },
}

pub(crate) struct ChainNode {
    pub links: Vec<ConnectId>,
}

/// One elaboration session.
pub struct Session {
    pub(crate) params: Arena<ParamId, ParamNode>,
    pub(crate) ports: Arena<PortId, PortNode>,
    pub(crate) blocks: Arena<BlockId, BlockNode>,
    pub(crate) connects: Arena<ConnectId, ConnectNode>,
    pub(crate) constraints: Arena<ConstraintId, ConstraintNode>,
    pub(crate) chains: Arena<ChainId, ChainNode>,
    pub(crate) context: ContextStack,
    pub(crate) link_prototypes: HashMap<String, BlockId>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty session at top level.
    pub fn new() -> Self {
        Self {
            params: Arena::new(),
            ports: Arena::new(),
            blocks: Arena::new(),
            connects: Arena::new(),
            constraints: Arena::new(),
            chains: Arena::new(),
            context: ContextStack::new(),
            link_prototypes: HashMap::new(),
        }
    }

    /// Runs `f` with `frame` pushed as the innermost element under definition.
    pub(crate) fn in_frame<T>(
        &mut self,
        frame: Frame,
        f: impl FnOnce(&mut Self) -> ElabResult<T>,
    ) -> ElabResult<T> {
        let prev = self.context.push_element(frame);
        let result = f(self);
        self.context.pop_to(prev)?;
        result
    }

    /// Allocates a block node and runs its `init` with the block on top of
    /// the context stack.
    pub(crate) fn alloc_block(
        &mut self,
        def: Rc<dyn ErasedBlock>,
        parent: Option<Owner>,
    ) -> ElabResult<(BlockId, Rc<dyn Any>)> {
        let class = def.class();
        let kind = def.kind();
        let id = self.blocks.alloc(BlockNode {
            def: def.clone(),
            class,
            kind,
            parent,
            state: BlockState::PreInit,
            io: None,
            params: NameRegistry::new(None),
            ports: NameRegistry::new(None),
            blocks: NameRegistry::new(None),
            connects: NameRegistry::new(Some(ANON_LINK)),
            constraints: NameRegistry::new(Some(ANON_CONSTR)),
            chains: NameRegistry::new(Some(ANON_CHAIN)),
            required_ports: Vec::new(),
            port_tags: Vec::new(),
            implicit_scopes: Vec::new(),
            mixins: Vec::new(),
            mixin_host: None,
            generator: GeneratorState::default(),
            meta: Metadata::default(),
        });
        self.blocks[id].state = BlockState::Init;
        let io = self.in_frame(Frame::Block(id), |s| def.init_erased(s))?;
        let node = &mut self.blocks[id];
        node.state = BlockState::PostInit;
        node.io = Some(io.clone());
        Ok((id, io))
    }

    /// Allocates a port node and runs its definition with the port on top of
    /// the context stack.
    pub(crate) fn alloc_port(
        &mut self,
        def: Rc<dyn ErasedPort>,
        parent: Option<Owner>,
    ) -> ElabResult<(PortId, Rc<dyn Any>)> {
        let id = self.ports.alloc(PortNode {
            class: def.class(),
            def: def.clone(),
            parent,
            params: NameRegistry::new(None),
            fields: NameRegistry::new(None),
            handle: None,
            bridge: None,
            vector: None,
        });
        let handle = self.in_frame(Frame::Port(id), |s| def.define_erased(s, id))?;
        self.ports[id].handle = Some(handle.clone());
        Ok((id, handle))
    }

    /// The innermost block under definition.
    pub(crate) fn enclosing_block(&self, what: &str) -> ElabResult<BlockId> {
        self.context
            .get_enclosing_block()
            .ok_or_else(|| ElabError::Definition(error_no_context(what)))
    }

    /// Fails unless `block` is in one of `allowed`.
    pub(crate) fn check_phase(
        &self,
        block: BlockId,
        allowed: &[BlockState],
        what: &str,
        allowed_desc: &str,
    ) -> ElabResult<()> {
        let node = &self.blocks[block];
        if allowed.contains(&node.state) {
            Ok(())
        } else {
            Err(ElabError::Definition(error_wrong_phase(
                &node.class.name,
                what,
                allowed_desc,
            )))
        }
    }

    pub(crate) fn naming_error(&self, block: BlockId, err: RegistryError) -> ElabError {
        ElabError::Definition(error_naming(&self.blocks[block].class.name, &err))
    }

    /// The class name of a block.
    pub fn class_name(&self, block: BlockId) -> &str {
        &self.blocks[block].class.name
    }

    /// The block a port belongs to, walking up through bundles and arrays.
    pub(crate) fn port_block(&self, port: PortId) -> Option<BlockId> {
        let mut current = port;
        loop {
            match self.ports[current].parent {
                Some(Owner::Block(block)) => return Some(block),
                Some(Owner::Port(parent)) => current = parent,
                None => return None,
            }
        }
    }

    /// The block directly containing `block`: its parent block, or for a
    /// link instance the block owning the port it hangs off.
    pub(crate) fn block_parent(&self, block: BlockId) -> Option<BlockId> {
        match self.blocks[block].parent {
            Some(Owner::Block(parent)) => Some(parent),
            Some(Owner::Port(port)) => self.port_block(port),
            None => None,
        }
    }

    /// The block that owns a parameter, port or block directly.
    pub(crate) fn owner_block(&self, owner: Owner) -> Option<BlockId> {
        match owner {
            Owner::Block(block) => Some(block),
            Owner::Port(port) => self.port_block(port),
        }
    }

    /// Fails unless every operand of `expr` belongs to `block` or one of its
    /// direct children.
    pub(crate) fn check_reachable(&self, block: BlockId, expr: &Expr) -> ElabResult<()> {
        for operand in expr.operands() {
            let owner = match operand {
                Operand::Param(id) => self.owner_block(self.params[id].owner),
                Operand::Port(id) => self.port_block(id),
                Operand::Named(owner) => self.owner_block(owner),
            };
            let reachable = match owner {
                Some(owner) => owner == block || self.block_parent(owner) == Some(block),
                None => false,
            };
            if !reachable {
                let what = match operand {
                    Operand::Param(id) => self.describe_ref(Ref::Param(id)),
                    Operand::Port(id) => self.describe_ref(Ref::Port(id)),
                    Operand::Named(owner) => self.describe_ref(Ref::from(owner)),
                };
                return Err(ElabError::Unreachable(error_unreachable(
                    &self.blocks[block].class.name,
                    &what,
                )));
            }
        }
        Ok(())
    }

    /// Human-readable description of the current context, for diagnostics.
    pub(crate) fn describe_context(&self) -> String {
        match self.context.get_enclosing_block() {
            Some(block) => self.blocks[block].class.name.clone(),
            None => "top level".to_string(),
        }
    }

    /// Human-readable description of an element, for diagnostics.
    pub(crate) fn describe_ref(&self, r: Ref) -> String {
        match r {
            Ref::Param(id) => {
                let node = &self.params[id];
                let name = match node.owner {
                    Owner::Block(b) => self.blocks[b].params.name_of(id),
                    Owner::Port(p) => self.ports[p].params.name_of(id),
                };
                format!("parameter `{}`", name.unwrap_or("(unnamed)"))
            }
            Ref::Port(id) => format!("port of class `{}`", self.ports[id].class.name),
            Ref::Block(id) => format!("block of class `{}`", self.blocks[id].class.name),
        }
    }

    /// The element sample of a port array.
    pub(crate) fn vector_sample(&self, port: PortId) -> ElabResult<PortId> {
        self.ports[port]
            .vector
            .as_ref()
            .map(|v| v.sample)
            .ok_or_else(|| {
                InternalError::new(format!("port {port:?} is not an array")).into()
            })
    }

    /// Recovers the typed handle of a port.
    pub(crate) fn port_handle<H: Clone + 'static>(&self, port: PortId) -> ElabResult<H> {
        self.ports[port]
            .handle
            .as_ref()
            .and_then(|h| h.downcast_ref::<H>())
            .cloned()
            .ok_or_else(|| {
                InternalError::new(format!(
                    "port {port:?} handle is not a {}",
                    std::any::type_name::<H>()
                ))
                .into()
            })
    }

    /// Declares a parameter of the element under definition.
    ///
    /// Inside a block this is only legal while its `init` runs; inside a port
    /// definition it declares a port parameter.
    pub fn parameter<E: TypedExpr>(&mut self, name: &str) -> ElabResult<E> {
        self.declare_param(name, ParamInit::None)
    }

    /// Declares a parameter assigned from `init`.
    pub fn parameter_init<E: TypedExpr>(&mut self, name: &str, init: impl Into<E>) -> ElabResult<E> {
        let init = init.into().expr().clone();
        self.declare_param(name, ParamInit::Initializer(init))
    }

    /// Declares a parameter, assigned from `init` when present.
    pub fn parameter_opt<E: TypedExpr>(&mut self, name: &str, init: Option<E>) -> ElabResult<E> {
        match init {
            Some(init) => self.parameter_init(name, init),
            None => self.parameter(name),
        }
    }

    /// Declares a constructor-argument parameter with the value given by the
    /// instantiating block. At top level the value becomes the parameter's
    /// default.
    pub fn arg<E: TypedExpr>(&mut self, name: &str, value: Option<E>) -> ElabResult<E> {
        let value = value.map(|v| v.expr().clone());
        self.declare_param(name, ParamInit::Arg(value))
    }

    fn declare_param<E: TypedExpr>(&mut self, name: &str, init: ParamInit) -> ElabResult<E> {
        let owner = match self.context.top() {
            Some(Frame::Block(block)) => {
                self.check_phase(block, &[BlockState::Init], "Parameter(...)", "init")?;
                if let ParamInit::Initializer(expr) = &init {
                    self.check_reachable(block, expr)?;
                }
                Owner::Block(block)
            }
            Some(Frame::Port(port)) => Owner::Port(port),
            None => return Err(ElabError::Definition(error_no_context("Parameter(...)"))),
        };
        let id = self.params.alloc(ParamNode {
            kind: E::kind(),
            owner,
            init,
        });
        let registered = match owner {
            Owner::Block(block) => self.blocks[block]
                .params
                .insert(name, id)
                .map_err(|e| self.naming_error(block, e)),
            Owner::Port(port) => self.ports[port].params.insert(name, id).map_err(|e| {
                ElabError::Definition(error_naming(&self.ports[port].class.name, &e))
            }),
        };
        registered?;
        Ok(E::wrap(Expr::param(E::kind(), id)))
    }

    /// Attaches a metadata entry to the enclosing block or link. Entries are
    /// emitted in the order they were added.
    pub fn metadata(&mut self, name: &str, value: impl Into<Metadata>) -> ElabResult<()> {
        let block = self.enclosing_block("metadata(...)")?;
        self.check_phase(
            block,
            &[BlockState::Init, BlockState::Contents, BlockState::Generate],
            "metadata(...)",
            "init, contents or generate",
        )?;
        if self.blocks[block].meta.members.contains_key(name) {
            return Err(self.naming_error(block, RegistryError::DuplicateName(name.to_string())));
        }
        self.blocks[block]
            .meta
            .members
            .insert(name.to_string(), value.into());
        Ok(())
    }

    /// Adds a named or anonymous constraint to the enclosing block.
    pub fn require(&mut self, constraint: &crate::expr::BoolExpr) -> ElabResult<ConstraintId> {
        self.add_constraint(None, ConstraintNode::Require(constraint.expr().clone()))
    }

    /// Adds a named constraint to the enclosing block.
    pub fn require_named(
        &mut self,
        name: &str,
        constraint: &crate::expr::BoolExpr,
    ) -> ElabResult<ConstraintId> {
        self.add_constraint(Some(name), ConstraintNode::Require(constraint.expr().clone()))
    }

    /// Assigns `value` to the parameter `target`.
    pub fn assign<E: TypedExpr>(&mut self, target: &E, value: impl Into<E>) -> ElabResult<ConstraintId> {
        self.assign_inner(None, target, value.into())
    }

    /// Assigns `value` to the parameter `target`, naming the assignment.
    pub fn assign_named<E: TypedExpr>(
        &mut self,
        name: &str,
        target: &E,
        value: impl Into<E>,
    ) -> ElabResult<ConstraintId> {
        self.assign_inner(Some(name), target, value.into())
    }

    fn assign_inner<E: TypedExpr>(
        &mut self,
        name: Option<&str>,
        target: &E,
        value: E,
    ) -> ElabResult<ConstraintId> {
        let block = self.enclosing_block("assign(...)")?;
        let dst = target.expr().as_param().ok_or_else(|| {
            ElabError::Definition(error_element_kind(
                &self.blocks[block].class.name,
                "assign(...) target must be a parameter",
            ))
        })?;
        self.check_reachable(block, target.expr())?;
        self.add_constraint(
            name,
            ConstraintNode::Assign {
                dst,
                src: value.expr().clone(),
            },
        )
    }

    fn add_constraint(
        &mut self,
        name: Option<&str>,
        constraint: ConstraintNode,
    ) -> ElabResult<ConstraintId> {
        let block = self.enclosing_block("require(...)")?;
        match &constraint {
            ConstraintNode::Require(expr) | ConstraintNode::Assign { src: expr, .. } => {
                self.check_reachable(block, expr)?
            }
        }
        let id = self.constraints.alloc(constraint);
        let registry = &mut self.blocks[block].constraints;
        let result = match name {
            Some(name) => registry.insert(name, id),
            None => registry.register(id).map(|_| ()),
        };
        result.map_err(|e| self.naming_error(block, e))?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::FloatExpr;

    #[test]
    fn states_are_ordered() {
        assert!(BlockState::Init < BlockState::PostInit);
        assert!(BlockState::Contents < BlockState::Generate);
        assert!(BlockState::PreInit < BlockState::PostGenerate);
    }

    #[test]
    fn parameters_need_an_enclosing_element() {
        let mut s = Session::new();
        let err = s.parameter::<FloatExpr>("x").unwrap_err();
        assert!(matches!(err, ElabError::Definition(d) if d.code == crate::errors::D311));
    }

    #[test]
    fn constraints_need_an_enclosing_block() {
        let mut s = Session::new();
        let err = s.require(&true.into()).unwrap_err();
        assert!(matches!(err, ElabError::Definition(_)));
    }
}
