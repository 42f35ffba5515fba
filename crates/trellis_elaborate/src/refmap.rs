//! Reference maps: element handle to structural path, relative to one root.
//!
//! Serialization never embeds handles. Each block, link or port being emitted
//! builds a [`RefMap`] covering everything it may reference: its own
//! parameters and ports, its children and their parameters and ports, mixins
//! overlaid on their host, and a port array's elements and requests.

use crate::errors::ElabResult;
use crate::ids::{BlockId, Owner, ParamId, PortId};
use crate::session::Session;
use std::collections::{HashMap, HashSet};
use trellis_common::InternalError;
use trellis_ir::{LocalPath, LocalStep};

/// A referenceable element.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Ref {
    /// A parameter.
    Param(ParamId),
    /// A port, bundle or port array.
    Port(PortId),
    /// A block, link or mixin.
    Block(BlockId),
}

impl From<Owner> for Ref {
    fn from(owner: Owner) -> Self {
        match owner {
            Owner::Block(id) => Ref::Block(id),
            Owner::Port(id) => Ref::Port(id),
        }
    }
}

/// Paths of every element reachable from one root.
#[derive(Debug, Default, Clone)]
pub struct RefMap {
    paths: HashMap<Ref, LocalPath>,
    taken: HashSet<LocalPath>,
}

impl RefMap {
    /// The reference map of a block, rooted at the block itself.
    pub fn for_block(s: &Session, block: BlockId) -> ElabResult<Self> {
        let mut refs = Self::default();
        refs.add_block(s, block, LocalPath::new(), true)?;
        Ok(refs)
    }

    /// The reference map of a port, rooted at the port itself.
    pub fn for_port(s: &Session, port: PortId) -> ElabResult<Self> {
        let mut refs = Self::default();
        refs.add_port(s, port, LocalPath::new())?;
        Ok(refs)
    }

    /// The path of an element, if reachable.
    pub fn path(&self, r: Ref) -> Option<&LocalPath> {
        self.paths.get(&r)
    }

    /// Every mapped element with its path, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Ref, &LocalPath)> + '_ {
        self.paths.iter().map(|(&r, path)| (r, path))
    }

    /// Number of mapped elements.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn insert(&mut self, r: Ref, path: LocalPath) -> ElabResult<()> {
        // requests without a suggested name all share the anonymous step
        let anonymous = path
            .steps
            .iter()
            .any(|step| matches!(step, LocalStep::Allocate(name) if name.is_empty()));
        if !anonymous && !self.taken.insert(path.clone()) {
            return Err(InternalError::new(format!("duplicate reference path `{path}`")).into());
        }
        self.paths.insert(r, path);
        Ok(())
    }

    /// Adds a block's parameters and ports, and when `deep` its children.
    fn add_block(
        &mut self,
        s: &Session,
        block: BlockId,
        prefix: LocalPath,
        deep: bool,
    ) -> ElabResult<()> {
        let node = &s.blocks[block];
        self.insert(Ref::Block(block), prefix.clone())?;
        self.add_members(s, block, &prefix)?;
        for &mixin in &node.mixins {
            // mixins share their host's path
            self.paths.insert(Ref::Block(mixin), prefix.clone());
            self.add_members(s, mixin, &prefix)?;
        }
        if deep {
            for (name, child) in node.blocks.items() {
                self.add_block(s, child, prefix.with_name(name), false)?;
            }
        }
        Ok(())
    }

    fn add_members(&mut self, s: &Session, block: BlockId, prefix: &LocalPath) -> ElabResult<()> {
        let node = &s.blocks[block];
        for (name, param) in node.params.items() {
            self.insert(Ref::Param(param), prefix.with_name(name))?;
        }
        for (name, port) in node.ports.items() {
            self.add_port(s, port, prefix.with_name(name))?;
        }
        Ok(())
    }

    fn add_port(&mut self, s: &Session, port: PortId, prefix: LocalPath) -> ElabResult<()> {
        let node = &s.ports[port];
        self.insert(Ref::Port(port), prefix.clone())?;
        for (name, param) in node.params.items() {
            self.insert(Ref::Param(param), prefix.with_name(name))?;
        }
        for (name, field) in node.fields.items() {
            self.add_port(s, field, prefix.with_name(name))?;
        }
        if let Some(vector) = &node.vector {
            if let Some(elts) = &vector.elts {
                for (name, &elt) in elts {
                    self.add_port(s, elt, prefix.with_name(name))?;
                }
            }
            for (suggested, request) in &vector.requests {
                self.add_port(s, *request, prefix.with_allocate(suggested.as_deref()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaId;

    #[test]
    fn owners_convert_to_refs() {
        let port = PortId::from_raw(2);
        assert_eq!(Ref::from(Owner::Port(port)), Ref::Port(port));
    }

    #[test]
    fn duplicate_paths_are_internal_errors() {
        let mut refs = RefMap::default();
        let path = LocalPath::from_names(&["a"]);
        refs.insert(Ref::Param(ParamId::from_raw(0)), path.clone())
            .unwrap();
        assert!(refs.insert(Ref::Param(ParamId::from_raw(1)), path).is_err());
    }

    #[test]
    fn anonymous_requests_may_share_a_path() {
        let mut refs = RefMap::default();
        let path = LocalPath::from_names(&["ports"]).with_allocate(None);
        refs.insert(Ref::Port(PortId::from_raw(0)), path.clone())
            .unwrap();
        refs.insert(Ref::Port(PortId::from_raw(1)), path).unwrap();
        assert_eq!(refs.len(), 2);
    }
}
