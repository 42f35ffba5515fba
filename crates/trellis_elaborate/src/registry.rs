//! Per-container name registries keyed on arena handles.
//!
//! A [`NameRegistry`] tracks the children of one kind (parameters, ports,
//! blocks, connections, constraints, chains) owned by a container. Children are
//! registered first and named later, exactly once. Closing the registry either
//! rejects leftover unnamed children or names them `{prefix}_{i}` in
//! registration order.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Anonymous-name prefix for connections.
pub const ANON_LINK: &str = "anon_link";
/// Anonymous-name prefix for constraints.
pub const ANON_CONSTR: &str = "anon_constr";
/// Anonymous-name prefix for chains.
pub const ANON_CHAIN: &str = "anon_chain";

/// Misuse of a [`NameRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// An element was registered or named after the registry was closed.
    #[error("cannot add `{0}` after the registry was closed")]
    Closed(String),
    /// An element was named without being registered first.
    #[error("`{0}` was named but never registered")]
    NotRegistered(String),
    /// The name is already taken in this registry.
    #[error("name `{0}` is already taken")]
    DuplicateName(String),
    /// Unnamed elements remain and the registry has no anonymous prefix.
    #[error("{0} element(s) were never named")]
    Unnamed(usize),
}

/// Ordered name registry for one kind of child element.
#[derive(Debug, Clone)]
pub struct NameRegistry<I> {
    anon_prefix: Option<&'static str>,
    pending: IndexSet<I>,
    names: IndexMap<String, I>,
    reverse: HashMap<I, String>,
    closed: bool,
}

impl<I: Copy + Eq + Hash + Debug> Default for NameRegistry<I> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<I: Copy + Eq + Hash + Debug> NameRegistry<I> {
    /// Creates a registry. With an anonymous prefix, unnamed leftovers are
    /// auto-named on [`finalize`](Self::finalize).
    pub fn new(anon_prefix: Option<&'static str>) -> Self {
        Self {
            anon_prefix,
            pending: IndexSet::new(),
            names: IndexMap::new(),
            reverse: HashMap::new(),
            closed: false,
        }
    }

    /// Pre-registers an element, pending a name.
    pub fn register(&mut self, item: I) -> Result<I, RegistryError> {
        if self.closed {
            return Err(RegistryError::Closed(format!("{item:?}")));
        }
        self.pending.insert(item);
        Ok(item)
    }

    /// Names a pre-registered element.
    pub fn add_element(&mut self, name: &str, item: I) -> Result<(), RegistryError> {
        if self.closed {
            return Err(RegistryError::Closed(name.to_string()));
        }
        if !self.pending.contains(&item) {
            return Err(RegistryError::NotRegistered(name.to_string()));
        }
        if self.names.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        self.pending.shift_remove(&item);
        self.names.insert(name.to_string(), item);
        self.reverse.insert(item, name.to_string());
        Ok(())
    }

    /// Registers and names an element in one step.
    pub fn insert(&mut self, name: &str, item: I) -> Result<(), RegistryError> {
        self.register(item)?;
        self.add_element(name, item)
    }

    /// Closes the registry, naming leftovers under the anonymous prefix.
    ///
    /// Calling this again on a closed registry does nothing.
    pub fn finalize(&mut self) -> Result<(), RegistryError> {
        if self.closed {
            return Ok(());
        }
        match self.anon_prefix {
            None if !self.pending.is_empty() => {
                return Err(RegistryError::Unnamed(self.pending.len()));
            }
            None => {}
            Some(prefix) => {
                let leftovers: Vec<I> = self.pending.drain(..).collect();
                for (i, item) in leftovers.into_iter().enumerate() {
                    let name = format!("{prefix}_{i}");
                    if self.names.contains_key(&name) {
                        return Err(RegistryError::DuplicateName(name));
                    }
                    self.reverse.insert(item, name.clone());
                    self.names.insert(name, item);
                }
            }
        }
        self.closed = true;
        Ok(())
    }

    /// Returns whether the registry has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns the name of an element, if it has one.
    pub fn name_of(&self, item: I) -> Option<&str> {
        self.reverse.get(&item).map(String::as_str)
    }

    /// Returns the element with the given name.
    pub fn get(&self, name: &str) -> Option<I> {
        self.names.get(name).copied()
    }

    /// Returns whether the element was registered here, named or not.
    pub fn contains(&self, item: I) -> bool {
        self.reverse.contains_key(&item) || self.pending.contains(&item)
    }

    /// Named elements in naming order.
    pub fn items(&self) -> impl Iterator<Item = (&str, I)> + '_ {
        self.names.iter().map(|(name, item)| (name.as_str(), *item))
    }

    /// Names in naming order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.keys().map(String::as_str)
    }

    /// All elements, named ones first, then pending ones in registration order.
    pub fn all_values(&self) -> Vec<I> {
        self.names
            .values()
            .copied()
            .chain(self.pending.iter().copied())
            .collect()
    }

    /// Number of named elements.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nothing has been named.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_name() {
        let mut reg: NameRegistry<u32> = NameRegistry::new(None);
        reg.register(1).unwrap();
        reg.add_element("a", 1).unwrap();
        assert_eq!(reg.name_of(1), Some("a"));
        assert_eq!(reg.get("a"), Some(1));
    }

    #[test]
    fn naming_requires_registration() {
        let mut reg: NameRegistry<u32> = NameRegistry::new(None);
        assert_eq!(
            reg.add_element("a", 7),
            Err(RegistryError::NotRegistered("a".into()))
        );
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut reg: NameRegistry<u32> = NameRegistry::new(None);
        reg.insert("a", 1).unwrap();
        reg.register(2).unwrap();
        assert_eq!(
            reg.add_element("a", 2),
            Err(RegistryError::DuplicateName("a".into()))
        );
    }

    #[test]
    fn finalize_names_leftovers_in_registration_order() {
        let mut reg: NameRegistry<u32> = NameRegistry::new(Some(ANON_LINK));
        reg.register(5).unwrap();
        reg.register(3).unwrap();
        reg.insert("named", 9).unwrap();
        reg.finalize().unwrap();
        let names: Vec<_> = reg.items().map(|(n, i)| (n.to_string(), i)).collect();
        assert_eq!(
            names,
            vec![
                ("named".to_string(), 9),
                ("anon_link_0".to_string(), 5),
                ("anon_link_1".to_string(), 3),
            ]
        );
    }

    #[test]
    fn finalize_without_prefix_rejects_leftovers() {
        let mut reg: NameRegistry<u32> = NameRegistry::new(None);
        reg.register(1).unwrap();
        assert_eq!(reg.finalize(), Err(RegistryError::Unnamed(1)));
    }

    #[test]
    fn finalize_is_idempotent_and_closes() {
        let mut reg: NameRegistry<u32> = NameRegistry::new(Some(ANON_CONSTR));
        reg.register(1).unwrap();
        reg.finalize().unwrap();
        reg.finalize().unwrap();
        assert_eq!(reg.len(), 1);
        assert!(reg.is_closed());
        assert!(matches!(reg.register(2), Err(RegistryError::Closed(_))));
    }

    #[test]
    fn all_values_includes_pending() {
        let mut reg: NameRegistry<u32> = NameRegistry::new(Some(ANON_CHAIN));
        reg.register(1).unwrap();
        reg.insert("x", 2).unwrap();
        assert_eq!(reg.all_values(), vec![2, 1]);
        assert!(reg.contains(1));
        assert!(!reg.contains(3));
    }
}
