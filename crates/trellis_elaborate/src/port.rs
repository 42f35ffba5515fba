//! Ports and bundles.
//!
//! A port type is a value implementing [`PortType`]: the value carries the
//! initializers of the port's parameters (so `TestPortSource { float_param:
//! Some(..) }` declares a source with its parameter tied to an expression) and
//! [`PortType::define`] declares those parameters on a fresh port node. The
//! `Default` value is the empty model: the same type with no initializers.

use crate::block::ElementSpec;
use crate::context::Frame;
use crate::errors::{error_element_kind, error_naming, error_no_context, ElabError, ElabResult};
use crate::expr::{Binding, BoolExpr, Expr, ExprKind, StringExpr, TypedExpr};
use crate::ids::{Owner, PortId};
use crate::session::{BlockState, Session};
use crate::connect::{ConnectTarget, Endpoint};
use std::any::Any;
use std::rc::Rc;

/// The shape of a port class.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PortKind {
    /// A leaf port.
    Port,
    /// A bundle of named sub-ports.
    Bundle,
    /// A port array.
    Vector,
}

/// Library identity of a port class.
#[derive(Clone, Debug)]
pub struct PortClass {
    /// Library name. For arrays, the element class name.
    pub name: String,
    /// Superclass names.
    pub superclasses: Vec<String>,
    /// Shape.
    pub kind: PortKind,
    /// The link joining ports of this family.
    pub link: Option<ElementSpec>,
    /// The bridge adapting a boundary port of this type to an inner link.
    pub bridge: Option<ElementSpec>,
}

impl PortClass {
    /// A leaf port class.
    pub fn port(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclasses: Vec::new(),
            kind: PortKind::Port,
            link: None,
            bridge: None,
        }
    }

    /// A bundle class.
    pub fn bundle(name: impl Into<String>) -> Self {
        Self {
            kind: PortKind::Bundle,
            ..Self::port(name)
        }
    }

    /// Sets the link type.
    pub fn with_link(mut self, link: ElementSpec) -> Self {
        self.link = Some(link);
        self
    }

    /// Sets the bridge type.
    pub fn with_bridge(mut self, bridge: ElementSpec) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Adds a superclass.
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclasses.push(superclass.into());
        self
    }
}

/// A port or bundle type.
pub trait PortType: Default + Clone + 'static {
    /// Typed handle returned once the port is declared.
    type Handle: PortHandle;

    /// Library identity.
    fn class(&self) -> PortClass;

    /// Declares the port's parameters and fields on the port `id`, which is
    /// on top of the context stack.
    fn define(&self, s: &mut Session, id: PortId) -> ElabResult<Self::Handle>;
}

/// A declared port.
pub trait PortHandle: Clone + 'static {
    /// The port node.
    fn port_id(&self) -> PortId;

    /// Whether the port is connected.
    fn is_connected(&self) -> BoolExpr {
        BoolExpr::wrap(Expr::new(
            ExprKind::Bool,
            Binding::IsConnected(self.port_id()),
        ))
    }

    /// The port's name, as resolved after solving.
    fn name(&self) -> StringExpr {
        StringExpr::wrap(Expr::new(
            ExprKind::String,
            Binding::Name(Owner::Port(self.port_id())),
        ))
    }
}

/// Port definition with the handle type erased.
pub(crate) trait ErasedPort {
    fn class(&self) -> PortClass;
    fn define_erased(&self, s: &mut Session, id: PortId) -> ElabResult<Rc<dyn Any>>;
    fn empty(&self) -> Rc<dyn ErasedPort>;
}

impl<P: PortType> ErasedPort for P {
    fn class(&self) -> PortClass {
        PortType::class(self)
    }

    fn define_erased(&self, s: &mut Session, id: PortId) -> ElabResult<Rc<dyn Any>> {
        Ok(Rc::new(self.define(s, id)?))
    }

    fn empty(&self) -> Rc<dyn ErasedPort> {
        Rc::new(P::default())
    }
}

impl Session {
    /// Declares a required port on the enclosing block or link.
    pub fn port<P: PortType>(&mut self, name: &str, model: P) -> ElabResult<P::Handle> {
        self.declare_port(name, model, false)
    }

    /// Declares an optional port on the enclosing block or link.
    pub fn optional_port<P: PortType>(&mut self, name: &str, model: P) -> ElabResult<P::Handle> {
        self.declare_port(name, model, true)
    }

    fn declare_port<P: PortType>(
        &mut self,
        name: &str,
        model: P,
        optional: bool,
    ) -> ElabResult<P::Handle> {
        let (_, handle) = self.declare_port_erased(name, Rc::new(model), optional)?;
        downcast_handle(handle)
    }

    fn declare_port_erased(
        &mut self,
        name: &str,
        model: Rc<dyn ErasedPort>,
        optional: bool,
    ) -> ElabResult<(PortId, Rc<dyn Any>)> {
        let block = match self.context.top() {
            Some(Frame::Block(block)) => block,
            Some(Frame::Port(_)) => {
                return Err(ElabError::Definition(error_element_kind(
                    &self.describe_context(),
                    "declare bundle fields with field(...)",
                )))
            }
            None => return Err(ElabError::Definition(error_no_context("Port(...)"))),
        };
        self.check_phase(block, &[BlockState::Init], "Port(...)", "init")?;
        let (id, handle) = self.alloc_port(model, Some(Owner::Block(block)))?;
        self.blocks[block]
            .ports
            .insert(name, id)
            .map_err(|e| self.naming_error(block, e))?;
        if !optional {
            self.blocks[block].required_ports.push(id);
        }
        Ok((id, handle))
    }

    /// Declares a boundary port with the empty model of a child's port.
    pub(crate) fn declare_boundary_like(
        &mut self,
        name: &str,
        internal: PortId,
        optional: bool,
    ) -> ElabResult<(PortId, Rc<dyn Any>)> {
        let block = self.enclosing_block("Export(...)")?;
        let owner = self.port_block(internal);
        if owner.is_none() || owner == Some(block) || owner.and_then(|b| self.block_parent(b)) != Some(block) {
            return Err(ElabError::Connectivity(crate::errors::error_connect(
                crate::errors::N301,
                self.class_name(block),
                "can only export ports of child blocks",
            )));
        }
        let model = self.ports[internal].def.empty();
        self.declare_port_erased(name, model, optional)
    }

    /// Declares a required boundary port exporting a child block's port.
    pub fn export<H: PortHandle>(&mut self, name: &str, internal: &H) -> ElabResult<H> {
        self.export_inner(name, internal, false)
    }

    /// Declares an optional boundary port exporting a child block's port.
    pub fn optional_export<H: PortHandle>(&mut self, name: &str, internal: &H) -> ElabResult<H> {
        self.export_inner(name, internal, true)
    }

    fn export_inner<H: PortHandle>(
        &mut self,
        name: &str,
        internal: &H,
        optional: bool,
    ) -> ElabResult<H> {
        let (exported, handle) = self.declare_boundary_like(name, internal.port_id(), optional)?;
        let exported = ConnectTarget::Endpoint(Endpoint::Port(exported));
        self.connect(&[&exported, internal])?;
        downcast_handle(handle)
    }

    /// Declares a field of the bundle under definition.
    pub fn field<P: PortType>(&mut self, name: &str, model: P) -> ElabResult<P::Handle> {
        let Some(Frame::Port(bundle)) = self.context.top() else {
            return Err(ElabError::Definition(error_no_context("field(...)")));
        };
        let (id, handle) = self.alloc_port(Rc::new(model), Some(Owner::Port(bundle)))?;
        self.ports[bundle].fields.insert(name, id).map_err(|e| {
            ElabError::Definition(error_naming(&self.ports[bundle].class.name, &e))
        })?;
        downcast_handle(handle)
    }

    /// The name of a port within its direct container, as seen from the
    /// current context.
    pub(crate) fn name_of_port(&self, port: PortId) -> ElabResult<String> {
        let missing = || -> ElabError {
            trellis_common::InternalError::new(format!("port {port:?} has no name")).into()
        };
        match self.ports[port].parent {
            Some(Owner::Block(block)) => self.blocks[block]
                .ports
                .name_of(port)
                .map(str::to_string)
                .ok_or_else(missing),
            Some(Owner::Port(parent)) if self.ports[parent].vector.is_some() => {
                self.vector_child_name(parent, port)
            }
            Some(Owner::Port(parent)) => self.ports[parent]
                .fields
                .name_of(port)
                .map(str::to_string)
                .ok_or_else(missing),
            None => Err(missing()),
        }
    }

    /// The path of names from `block` down to `port`, for naming nets.
    pub(crate) fn name_from(&self, port: PortId, block: crate::ids::BlockId) -> ElabResult<Vec<String>> {
        let mut names = vec![self.name_of_port(port)?];
        let mut current = Owner::Port(port);
        loop {
            let parent = match current {
                Owner::Port(p) => self.ports[p].parent,
                Owner::Block(b) => self.blocks[b].parent,
            };
            match (current, parent) {
                (Owner::Port(_), Some(Owner::Port(p))) => {
                    names.push(self.name_of_port(p)?);
                    current = Owner::Port(p);
                }
                (Owner::Port(_), Some(Owner::Block(b))) => {
                    if b == block || self.blocks[b].mixin_host == Some(block) {
                        break;
                    }
                    let named = self.mixin_host_or_self(b);
                    let name = self.blocks[named]
                        .parent
                        .and_then(|owner| match owner {
                            Owner::Block(parent) => self.blocks[parent].blocks.name_of(named),
                            Owner::Port(_) => None,
                        })
                        .ok_or_else(|| {
                            trellis_common::InternalError::new("unnamed block in port path")
                        })?;
                    names.push(name.to_string());
                    break;
                }
                _ => break,
            }
        }
        names.reverse();
        Ok(names)
    }
}

pub(crate) fn downcast_handle<H: Clone + 'static>(handle: Rc<dyn Any>) -> ElabResult<H> {
    handle.downcast_ref::<H>().cloned().ok_or_else(|| {
        trellis_common::InternalError::new(format!(
            "port handle is not a {}",
            std::any::type_name::<H>()
        ))
        .into()
    })
}
