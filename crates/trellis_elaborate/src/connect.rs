//! Nets and connection resolution.
//!
//! [`Session::connect`] groups ports into nets owned by the enclosing block,
//! merging nets that share a port. At emission each net resolves either to a
//! direct export (a boundary port and a child port of the same type) or to a
//! link instance, with a bridge block inserted for every boundary port that
//! must face the link.

use crate::block::{BlockKind, ElementSpec, PortTag};
use crate::errors::{error_connect, ElabError, ElabResult, N301, N302, N303, N304, N305, N306, N307, N308};
use crate::ids::{BlockId, ConnectId, PortId};
use crate::port::PortHandle;
use crate::session::{BlockState, ConnectNode, Session};
use std::collections::HashMap;
use trellis_ir::LocalPath;

/// One connected element of a net.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Endpoint {
    /// A port, bundle or port array.
    Port(PortId),
    /// The same sub-port of every element of a port array.
    Derived {
        /// The port array.
        base: PortId,
        /// The sub-port of the array's element sample.
        target: PortId,
    },
}

impl Endpoint {
    /// The port node the endpoint hangs off.
    pub fn port(&self) -> PortId {
        match self {
            Endpoint::Port(port) => *port,
            Endpoint::Derived { base, .. } => *base,
        }
    }
}

/// A net in the enclosing block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Net(pub(crate) ConnectId);

impl Net {
    /// The connection handle.
    pub fn id(&self) -> ConnectId {
        self.0
    }
}

/// A sub-port projected out of every element of a port array.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DerivedVector {
    pub(crate) base: PortId,
    pub(crate) target: PortId,
}

/// What a [`Connectable`] contributes to a net.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConnectTarget {
    /// A port endpoint.
    Endpoint(Endpoint),
    /// An existing net, joined as a whole.
    Net(ConnectId),
}

/// Anything that can be passed to [`Session::connect`].
pub trait Connectable {
    /// The endpoint or net this stands for.
    fn connect_target(&self) -> ConnectTarget;
}

impl<H: PortHandle> Connectable for H {
    fn connect_target(&self) -> ConnectTarget {
        ConnectTarget::Endpoint(Endpoint::Port(self.port_id()))
    }
}

impl Connectable for Net {
    fn connect_target(&self) -> ConnectTarget {
        ConnectTarget::Net(self.0)
    }
}

impl Connectable for ConnectTarget {
    fn connect_target(&self) -> ConnectTarget {
        *self
    }
}

impl Connectable for DerivedVector {
    fn connect_target(&self) -> ConnectTarget {
        ConnectTarget::Endpoint(Endpoint::Derived {
            base: self.base,
            target: self.target,
        })
    }
}

/// A net an implicit connection scope joins, and the port tags it accepts.
#[derive(Clone, Debug, PartialEq)]
pub struct ImplicitConnect {
    target: ConnectTarget,
    tags: Vec<PortTag>,
}

impl ImplicitConnect {
    /// Joins child ports carrying any of `tags` to `target`.
    pub fn new(target: &dyn Connectable, tags: &[PortTag]) -> Self {
        Self {
            target: target.connect_target(),
            tags: tags.to_vec(),
        }
    }
}

/// How a net is realized.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Resolved {
    /// A lone port, nothing to emit.
    Nothing,
    /// A boundary port exported to a child port.
    Export {
        is_array: bool,
        external: Endpoint,
        internal: Endpoint,
    },
    /// A link instance.
    Link {
        link: ElementSpec,
        is_array: bool,
        /// Boundary ports and the link port their bridge's inner port joins.
        bridged: Vec<(PortId, LocalPath)>,
        /// Endpoints joined to link ports directly.
        direct: Vec<(Endpoint, LocalPath)>,
    },
}

/// Leaf class and array depth, the connectable type of an endpoint.
type TypeKey = (String, usize);

impl Session {
    /// Connects ports and nets into one net of the enclosing block.
    pub fn connect(&mut self, items: &[&dyn Connectable]) -> ElabResult<Net> {
        self.connect_inner(None, items, false)
    }

    /// Connects ports and nets into one net and names it.
    pub fn connect_named(&mut self, name: &str, items: &[&dyn Connectable]) -> ElabResult<Net> {
        self.connect_inner(Some(name), items, false)
    }

    /// Connects ports inside a link, joining port arrays element by element
    /// to a single nested link.
    pub fn connect_flattened(&mut self, items: &[&dyn Connectable]) -> ElabResult<Net> {
        self.connect_inner(None, items, true)
    }

    pub(crate) fn connect_inner(
        &mut self,
        name: Option<&str>,
        items: &[&dyn Connectable],
        flatten: bool,
    ) -> ElabResult<Net> {
        let block = self.enclosing_block("connect(...)")?;
        self.check_phase(
            block,
            &[BlockState::Init, BlockState::Contents, BlockState::Generate],
            "connect(...)",
            "init, contents or generate",
        )?;
        let class = self.class_name(block).to_string();
        if flatten && self.blocks[block].kind != BlockKind::Link {
            return Err(ElabError::Connectivity(error_connect(
                N305,
                &class,
                "flattened connections are only allowed in links",
            )));
        }

        let mut endpoints: Vec<Endpoint> = Vec::new();
        let mut nets: Vec<ConnectId> = Vec::new();
        for item in items {
            match item.connect_target() {
                ConnectTarget::Endpoint(endpoint) => {
                    self.check_connectable(block, endpoint.port())?;
                    if !endpoints.contains(&endpoint) {
                        endpoints.push(endpoint);
                    }
                }
                ConnectTarget::Net(net) => {
                    if !self.blocks[block].connects.contains(net) {
                        return Err(ElabError::Connectivity(error_connect(
                            N301,
                            &class,
                            "net belongs to another block",
                        )));
                    }
                    let root = self.net_root(net);
                    if !nets.contains(&root) {
                        nets.push(root);
                    }
                }
            }
        }
        for existing in self.blocks[block].connects.all_values() {
            let node = &self.connects[existing];
            if node.delegate.is_none()
                && !nets.contains(&existing)
                && node.endpoints.iter().any(|e| endpoints.contains(e))
            {
                nets.push(existing);
            }
        }

        let registry = &self.blocks[block].connects;
        let named: Vec<ConnectId> = nets
            .iter()
            .copied()
            .filter(|net| registry.name_of(*net).is_some())
            .collect();
        if named.len() > 1 {
            return Err(ElabError::Connectivity(error_connect(
                N302,
                &class,
                "connection merges nets with different names",
            )));
        }
        for net in &nets {
            if self.connects[*net].flatten != flatten {
                return Err(ElabError::Connectivity(error_connect(
                    N308,
                    &class,
                    "can't merge flattened and unflattened connections",
                )));
            }
        }

        let root = match nets.first() {
            None => {
                let id = self.connects.alloc(ConnectNode {
                    endpoints: Vec::new(),
                    flatten,
                    delegate: None,
                });
                self.blocks[block]
                    .connects
                    .register(id)
                    .map_err(|e| self.naming_error(block, e))?;
                id
            }
            Some(&first) => {
                let root = named.first().copied().unwrap_or(first);
                for &net in nets.iter().filter(|net| **net != root) {
                    let moved = std::mem::take(&mut self.connects[net].endpoints);
                    self.connects[net].delegate = Some(root);
                    let root_node = &mut self.connects[root];
                    for endpoint in moved {
                        if !root_node.endpoints.contains(&endpoint) {
                            root_node.endpoints.push(endpoint);
                        }
                    }
                    tracing::trace!(block = %class, ?net, ?root, "merged nets");
                }
                root
            }
        };
        let root_node = &mut self.connects[root];
        for endpoint in endpoints {
            if !root_node.endpoints.contains(&endpoint) {
                root_node.endpoints.push(endpoint);
            }
        }

        if let Some(name) = name {
            let registry = &mut self.blocks[block].connects;
            match registry.name_of(root) {
                Some(existing) if existing == name => {}
                Some(existing) => {
                    return Err(ElabError::Connectivity(error_connect(
                        N302,
                        &class,
                        &format!("net is already named `{existing}`, can't rename to `{name}`"),
                    )))
                }
                None => registry
                    .add_element(name, root)
                    .map_err(|e| self.naming_error(block, e))?,
            }
        }
        Ok(Net(root))
    }

    /// Follows merge delegation to the surviving net.
    pub(crate) fn net_root(&self, mut net: ConnectId) -> ConnectId {
        while let Some(next) = self.connects[net].delegate {
            net = next;
        }
        net
    }

    /// Runs `body` with an implicit connection scope open on the enclosing
    /// block. Each child instantiated inside has its tagged ports connected
    /// to the first matching implicit, innermost scope first.
    pub fn implicit_connect<T>(
        &mut self,
        implicits: &[ImplicitConnect],
        body: impl FnOnce(&mut Session) -> ElabResult<T>,
    ) -> ElabResult<T> {
        let block = self.enclosing_block("implicit_connect(...)")?;
        self.check_phase(
            block,
            &[BlockState::Init, BlockState::Contents, BlockState::Generate],
            "implicit_connect(...)",
            "init, contents or generate",
        )?;
        self.blocks[block].implicit_scopes.push(implicits.to_vec());
        let result = body(self);
        self.blocks[block].implicit_scopes.pop();
        result
    }

    /// Connects a new child's tagged ports to its parent's open scopes.
    pub(crate) fn connect_implicit(&mut self, parent: BlockId, child: BlockId) -> ElabResult<()> {
        if self.blocks[parent].implicit_scopes.is_empty() {
            return Ok(());
        }
        let implicits: Vec<ImplicitConnect> = self.blocks[parent]
            .implicit_scopes
            .iter()
            .rev()
            .flatten()
            .cloned()
            .collect();
        let mut connected: Vec<PortId> = Vec::new();
        for implicit in &implicits {
            for &tag in &implicit.tags {
                for port in self.tagged_ports(child, tag) {
                    if connected.contains(&port) {
                        continue;
                    }
                    let endpoint = ConnectTarget::Endpoint(Endpoint::Port(port));
                    self.connect(&[&implicit.target, &endpoint])?;
                    connected.push(port);
                }
            }
        }
        tracing::trace!(
            block = %self.class_name(parent),
            child = %self.class_name(child),
            ports = connected.len(),
            "implicit connections"
        );
        Ok(())
    }

    fn check_connectable(&self, block: BlockId, port: PortId) -> ElabResult<()> {
        let owner = self.port_block(port);
        let reachable = match owner {
            Some(owner) => owner == block || self.block_parent(owner) == Some(block),
            None => false,
        };
        if reachable {
            Ok(())
        } else {
            Err(ElabError::Connectivity(error_connect(
                N301,
                self.class_name(block),
                &format!("{} is not a port of this block or its children", self.describe_ref(crate::refmap::Ref::Port(port))),
            )))
        }
    }

    fn type_key(&self, endpoint: Endpoint) -> TypeKey {
        let (leaf, depth) = match endpoint {
            Endpoint::Port(port) => self.vector_leaf(port),
            Endpoint::Derived { target, .. } => {
                let (leaf, depth) = self.vector_leaf(target);
                (leaf, depth + 1)
            }
        };
        (self.ports[leaf].class.name.clone(), depth)
    }

    pub(crate) fn is_array_endpoint(&self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Port(port) => self.ports[port].vector.is_some(),
            Endpoint::Derived { .. } => true,
        }
    }

    fn leaf_link(&self, endpoint: Endpoint) -> Option<ElementSpec> {
        let port = match endpoint {
            Endpoint::Port(port) => port,
            Endpoint::Derived { target, .. } => target,
        };
        self.ports[self.vector_leaf(port).0].class.link
    }

    /// The link prototype of a class, instantiated once per session.
    pub(crate) fn link_prototype(&mut self, link: ElementSpec) -> ElabResult<BlockId> {
        let name = link.name();
        if let Some(id) = self.link_prototypes.get(&name) {
            return Ok(*id);
        }
        let (id, _) = self.alloc_block(link.make(), None)?;
        self.link_prototypes.insert(name, id);
        Ok(id)
    }

    /// The bridge instance of a boundary port, instantiated on first use.
    pub(crate) fn bridge_of(&mut self, port: PortId) -> ElabResult<Option<BlockId>> {
        if let Some(bridge) = self.ports[port].bridge {
            return Ok(Some(bridge));
        }
        let Some(spec) = self.ports[port].class.bridge else {
            return Ok(None);
        };
        let (bridge, _) = self.alloc_block(spec.make(), None)?;
        self.ports[port].bridge = Some(bridge);
        Ok(Some(bridge))
    }

    /// A named port of a bridge.
    pub(crate) fn bridge_port(&self, bridge: BlockId, name: &str) -> ElabResult<PortId> {
        self.blocks[bridge].ports.get(name).ok_or_else(|| {
            trellis_common::InternalError::new(format!(
                "bridge `{}` has no `{name}` port",
                self.class_name(bridge)
            ))
            .into()
        })
    }

    /// Decides how a net of `block` is realized.
    pub(crate) fn resolve_net(&mut self, block: BlockId, net: ConnectId) -> ElabResult<Resolved> {
        let node = &self.connects[net];
        let endpoints = node.endpoints.clone();
        let flatten = node.flatten;
        let class = self.class_name(block).to_string();
        let conn_error = |code, msg: &str| ElabError::Connectivity(error_connect(code, &class, msg));

        if endpoints.len() == 1 && !(flatten && self.is_array_endpoint(endpoints[0])) {
            return Ok(Resolved::Nothing);
        }

        let on_boundary = |s: &Self, e: Endpoint| s.port_block(e.port()) == Some(block);
        if endpoints.len() == 2
            && self.type_key(endpoints[0]) == self.type_key(endpoints[1])
            && on_boundary(self, endpoints[0]) != on_boundary(self, endpoints[1])
        {
            let (external, internal) = if on_boundary(self, endpoints[0]) {
                (endpoints[0], endpoints[1])
            } else {
                (endpoints[1], endpoints[0])
            };
            return Ok(Resolved::Export {
                is_array: self.is_array_endpoint(external),
                external,
                internal,
            });
        }

        // link-facing endpoints, with the boundary port each bridge stands in for
        let mut facing: Vec<(Endpoint, Option<PortId>)> = Vec::new();
        let in_link = self.blocks[block].kind == BlockKind::Link;
        for endpoint in &endpoints {
            if !in_link && on_boundary(self, *endpoint) {
                let port = match endpoint {
                    Endpoint::Port(port) if self.ports[*port].vector.is_none() => *port,
                    _ => return Err(conn_error(N303, "can only bridge single ports, not arrays")),
                };
                let Some(bridge) = self.bridge_of(port)? else {
                    return Err(conn_error(
                        N303,
                        &format!("no bridge for boundary port of class `{}`", self.ports[port].class.name),
                    ));
                };
                let inner = self.bridge_port(bridge, "inner_link")?;
                facing.push((Endpoint::Port(inner), Some(port)));
            } else {
                facing.push((*endpoint, None));
            }
        }

        let mut links: Vec<ElementSpec> = Vec::new();
        for (endpoint, _) in &facing {
            match self.leaf_link(*endpoint) {
                Some(link) if !links.contains(&link) => links.push(link),
                Some(_) => {}
                None => return Err(conn_error(N304, "port has no link type")),
            }
        }
        let link = match links.as_slice() {
            [link] => *link,
            _ => {
                let names: Vec<String> = links.iter().map(ElementSpec::name).collect();
                return Err(conn_error(
                    N304,
                    &format!("ambiguous link types {names:?} for one connection"),
                ));
            }
        };

        let prototype = self.link_prototype(link)?;
        let mut link_ports: HashMap<String, Vec<(PortId, LocalPath)>> = HashMap::new();
        for (name, port) in self.blocks[prototype].ports.items() {
            let path = if self.ports[port].vector.is_some() {
                LocalPath::from_names(&[name]).with_allocate(None)
            } else {
                LocalPath::from_names(&[name])
            };
            let (leaf, _) = self.vector_leaf(port);
            link_ports
                .entry(self.ports[leaf].class.name.clone())
                .or_default()
                .push((port, path));
        }

        let arrays: Vec<bool> = facing
            .iter()
            .map(|(e, _)| self.is_array_endpoint(*e))
            .collect();
        let is_array = if flatten || arrays.iter().all(|a| !a) {
            false
        } else if arrays.iter().all(|a| *a) {
            true
        } else {
            return Err(conn_error(
                N305,
                "can't connect array and non-array ports without flattening",
            ));
        };

        let mut bridged = Vec::new();
        let mut direct = Vec::new();
        for (endpoint, boundary) in facing {
            let key = self.type_key(endpoint).0;
            let available = link_ports.entry(key.clone()).or_default();
            let Some((link_port, path)) = available.first().cloned() else {
                return Err(conn_error(
                    N306,
                    &format!("no remaining link ports for port of class `{key}`"),
                ));
            };
            if self.ports[link_port].vector.is_none() {
                if !is_array && self.is_array_endpoint(endpoint) {
                    return Err(conn_error(N307, "can't connect an array to a single link port"));
                }
                available.remove(0);
            }
            match boundary {
                Some(port) => bridged.push((port, path)),
                None => direct.push((endpoint, path)),
            }
        }
        tracing::debug!(block = %class, link = %link.name(), is_array, bridged = bridged.len(), direct = direct.len(), "resolved link");
        Ok(Resolved::Link {
            link,
            is_array,
            bridged,
            direct,
        })
    }
}
