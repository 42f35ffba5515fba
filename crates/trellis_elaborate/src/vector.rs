//! Port arrays.
//!
//! A [`Vector`] has two faces. Boundary-facing, the defining block appends
//! named elements with [`Session::append_elt`] (or marks the array defined and
//! empty). Allocation-facing, the parent block requests new elements with
//! [`Session::request`], which serialize as allocate steps resolved after
//! solving. Expressions over "every element" project out of the array's
//! element sample.

use crate::connect::DerivedVector;
use crate::errors::{error_vector_context, ElabError, ElabResult};
use crate::expr::{ArrayExpr, Binding, BoolExpr, Expr, ExprKind, IntExpr, StringExpr, TypedExpr};
use crate::ids::{Owner, PortId};
use crate::port::{downcast_handle, PortClass, PortHandle, PortKind, PortType};
use crate::session::{Session, VectorState};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// A port array of `P`.
#[derive(Clone, Debug, Default)]
pub struct Vector<P>(pub P);

/// A declared port array.
pub struct VectorHandle<P: PortType> {
    id: PortId,
    sample: P::Handle,
}

impl<P: PortType> Clone for VectorHandle<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sample: self.sample.clone(),
        }
    }
}

impl<P: PortType> fmt::Debug for VectorHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorHandle").field("id", &self.id).finish()
    }
}

impl<P: PortType> PortHandle for VectorHandle<P> {
    fn port_id(&self) -> PortId {
        self.id
    }
}

impl<P: PortType> PortType for Vector<P> {
    type Handle = VectorHandle<P>;

    fn class(&self) -> PortClass {
        PortClass {
            kind: PortKind::Vector,
            ..self.0.class()
        }
    }

    fn define(&self, s: &mut Session, id: PortId) -> ElabResult<VectorHandle<P>> {
        let (sample, handle) = s.alloc_port(Rc::new(self.0.clone()), Some(Owner::Port(id)))?;
        s.ports[id].vector = Some(VectorState {
            sample,
            elts: None,
            next_index: 0,
            requests: Vec::new(),
        });
        Ok(VectorHandle {
            id,
            sample: downcast_handle(handle)?,
        })
    }
}

impl<P: PortType> VectorHandle<P> {
    /// The element sample, for building per-element projections.
    pub fn sample(&self) -> &P::Handle {
        &self.sample
    }

    /// The number of elements.
    pub fn length(&self) -> IntExpr {
        IntExpr::wrap(Expr::new(ExprKind::Int, Binding::Length(self.id)))
    }

    /// The names of the requested elements.
    pub fn requested(&self) -> ArrayExpr<StringExpr> {
        ArrayExpr::wrap(Expr::new(
            ArrayExpr::<StringExpr>::kind(),
            Binding::Allocated(self.id),
        ))
    }

    /// The same parameter or introspection value out of every element.
    pub fn map_extract<E: TypedExpr>(&self, f: impl FnOnce(&P::Handle) -> E) -> ArrayExpr<E> {
        let target = f(&self.sample).expr().clone();
        ArrayExpr::wrap(Expr::new(
            ArrayExpr::<E>::kind(),
            Binding::MapExtract {
                container: self.id,
                target,
            },
        ))
    }

    /// The same sub-port out of every element, as a connectable array.
    pub fn map_extract_port<Q: PortHandle>(&self, f: impl FnOnce(&P::Handle) -> Q) -> DerivedVector {
        DerivedVector {
            base: self.id,
            target: f(&self.sample).port_id(),
        }
    }

    /// Whether any element satisfies `f`.
    pub fn any(&self, f: impl FnOnce(&P::Handle) -> BoolExpr) -> BoolExpr {
        self.map_extract(f).any()
    }

    /// Whether every element satisfies `f`.
    pub fn all(&self, f: impl FnOnce(&P::Handle) -> BoolExpr) -> BoolExpr {
        self.map_extract(f).all()
    }

    /// The value of `f` shared by every element.
    pub fn equal_any<E: TypedExpr>(&self, f: impl FnOnce(&P::Handle) -> E) -> E {
        self.map_extract(f).equal_any()
    }

    /// Whether any element is connected.
    pub fn any_connected(&self) -> BoolExpr {
        self.any(|elt| elt.is_connected())
    }
}

impl Session {
    /// Appends a boundary-facing element to a port array of the enclosing
    /// block. Unnamed elements are numbered in order.
    pub fn append_elt<P: PortType>(
        &mut self,
        vector: &VectorHandle<P>,
        model: P,
        name: Option<&str>,
    ) -> ElabResult<P::Handle> {
        self.check_defining_block(vector.id, "append_elt(...)")?;
        let (elt, handle) = self.alloc_port(Rc::new(model), Some(Owner::Port(vector.id)))?;
        let state = self.vector_state_mut(vector.id)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => state.next_index.to_string(),
        };
        state.next_index += 1;
        let elts = state.elts.get_or_insert_with(IndexMap::new);
        if elts.contains_key(&name) {
            return Err(ElabError::Definition(error_vector_context(&format!(
                "duplicate array element `{name}`"
            ))));
        }
        elts.insert(name, elt);
        downcast_handle(handle)
    }

    /// Marks a port array of the enclosing block as defined, possibly empty.
    pub fn defined<P: PortType>(&mut self, vector: &VectorHandle<P>) -> ElabResult<()> {
        self.check_defining_block(vector.id, "defined()")?;
        self.vector_state_mut(vector.id)?
            .elts
            .get_or_insert_with(IndexMap::new);
        Ok(())
    }

    /// Requests a new element of a child block's port array.
    pub fn request<P: PortType>(
        &mut self,
        vector: &VectorHandle<P>,
        suggested: Option<&str>,
    ) -> ElabResult<P::Handle> {
        self.check_requesting_block(vector.id)?;
        let (elt, handle) = self.alloc_port(Rc::new(P::default()), Some(Owner::Port(vector.id)))?;
        self.vector_state_mut(vector.id)?
            .requests
            .push((suggested.map(str::to_string), elt));
        downcast_handle(handle)
    }

    /// Requests a new sub-array of a child block's port array.
    pub fn request_vector<P: PortType>(
        &mut self,
        vector: &VectorHandle<P>,
        suggested: Option<&str>,
    ) -> ElabResult<VectorHandle<P>> {
        self.check_requesting_block(vector.id)?;
        let (elt, handle) = self.alloc_port(
            Rc::new(Vector(P::default())),
            Some(Owner::Port(vector.id)),
        )?;
        self.vector_state_mut(vector.id)?
            .requests
            .push((suggested.map(str::to_string), elt));
        downcast_handle(handle)
    }

    /// The boundary-facing elements of a port array, in order.
    pub fn elements<P: PortType>(
        &self,
        vector: &VectorHandle<P>,
    ) -> ElabResult<Vec<(String, P::Handle)>> {
        let state = self.vector_state(vector.id)?;
        let Some(elts) = &state.elts else {
            return Ok(Vec::new());
        };
        elts.iter()
            .map(|(name, &elt)| Ok((name.clone(), self.port_handle::<P::Handle>(elt)?)))
            .collect()
    }

    /// The name of an element of `vector` as seen from the current context:
    /// element names inside the defining block, request names from its
    /// parent.
    pub(crate) fn vector_child_name(&self, vector: PortId, child: PortId) -> ElabResult<String> {
        let state = self.vector_state(vector)?;
        let enclosing = self.context.get_enclosing_block();
        let defining = self.port_block(vector);
        if enclosing.is_none() || enclosing == defining {
            if let Some((name, _)) = state
                .elts
                .iter()
                .flatten()
                .find(|(_, elt)| **elt == child)
            {
                return Ok(name.clone());
            }
        }
        if enclosing.is_none() || enclosing == defining.and_then(|b| self.block_parent(b)) {
            if let Some((i, (suggested, _))) = state
                .requests
                .iter()
                .enumerate()
                .find(|(_, (_, elt))| *elt == child)
            {
                return Ok(suggested.clone().unwrap_or_else(|| format!("_allocate_{i}")));
            }
        }
        Err(ElabError::Definition(error_vector_context(&format!(
            "array element is not visible from {}",
            self.describe_context()
        ))))
    }

    /// Nesting depth and leaf element port of a port array.
    pub(crate) fn vector_leaf(&self, port: PortId) -> (PortId, usize) {
        let mut current = port;
        let mut depth = 0;
        while let Some(state) = &self.ports[current].vector {
            current = state.sample;
            depth += 1;
        }
        (current, depth)
    }

    fn vector_state(&self, vector: PortId) -> ElabResult<&VectorState> {
        self.ports[vector].vector.as_ref().ok_or_else(|| {
            trellis_common::InternalError::new(format!("port {vector:?} is not an array")).into()
        })
    }

    fn vector_state_mut(&mut self, vector: PortId) -> ElabResult<&mut VectorState> {
        self.ports[vector].vector.as_mut().ok_or_else(|| {
            trellis_common::InternalError::new(format!("port {vector:?} is not an array")).into()
        })
    }

    fn check_defining_block(&self, vector: PortId, what: &str) -> ElabResult<()> {
        let enclosing = self.context.get_enclosing_block();
        if enclosing.is_some() && enclosing == self.port_block(vector) {
            Ok(())
        } else {
            Err(ElabError::Definition(error_vector_context(&format!(
                "{what} can only be called from the block defining the array"
            ))))
        }
    }

    fn check_requesting_block(&self, vector: PortId) -> ElabResult<()> {
        let enclosing = self.context.get_enclosing_block();
        let parent = self.port_block(vector).and_then(|b| self.block_parent(b));
        if enclosing.is_none() || enclosing == parent {
            Ok(())
        } else {
            Err(ElabError::Definition(error_vector_context(
                "request(...) can only be called from the parent of the block defining the array",
            )))
        }
    }
}
