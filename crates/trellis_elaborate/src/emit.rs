//! Emission of elaborated elements into IR definitions.
//!
//! Constraint order within a block definition is fixed: required-port
//! constraints, port parameter initializers, parameter initializers, then the
//! hierarchy (connections and child argument initializers), then the block's
//! own constraints.

use crate::block::ErasedBlock;
use crate::connect::{Endpoint, Resolved};
use crate::context::Frame;
use crate::errors::{
    error_connect, error_default_not_literal, error_naming, ElabError, ElabResult, N305,
};
use crate::ids::{BlockId, ConnectId, ParamId, PortId};
use crate::port::{ErasedPort, PortKind};
use crate::refmap::{Ref, RefMap};
use crate::registry::RegistryError;
use crate::session::{ConstraintNode, ParamInit, Session};
use std::rc::Rc;
use tracing::instrument;
use trellis_common::InternalError;
use trellis_ir::rpc::ExprValue;
use trellis_ir::{
    BinaryOp, BlockLibElem, BlockLike, Bundle, ConnectedExpr, Design, ExportedExpr, Generator,
    HierarchyBlock, IndexMap, LibraryElement, LibraryPath, Link, LinkArray, LinkLike, LocalPath,
    Metadata,
    Port, PortArray, PortLike, Reserved, ValueExpr, ValueLit,
};

type Constraints = IndexMap<String, ValueExpr>;

fn add_constraint(
    constraints: &mut Constraints,
    class: &str,
    name: String,
    expr: ValueExpr,
) -> ElabResult<()> {
    if constraints.contains_key(&name) {
        return Err(ElabError::Definition(error_naming(
            class,
            &RegistryError::DuplicateName(name),
        )));
    }
    constraints.insert(name, expr);
    Ok(())
}

fn lookup(s: &Session, refs: &RefMap, r: Ref) -> ElabResult<LocalPath> {
    refs.path(r).cloned().ok_or_else(|| {
        InternalError::new(format!("no path for {}", s.describe_ref(r))).into()
    })
}

fn assign(s: &Session, refs: &RefMap, dst: ParamId, src: &crate::expr::Expr) -> ElabResult<ValueExpr> {
    Ok(ValueExpr::Assign {
        dst: lookup(s, refs, Ref::Param(dst))?,
        src: Box::new(src.to_proto(s, refs)?),
    })
}

fn finalize_members(s: &mut Session, block: BlockId) -> ElabResult<()> {
    let node = &mut s.blocks[block];
    let result = node
        .params
        .finalize()
        .and_then(|_| node.ports.finalize())
        .and_then(|_| node.blocks.finalize())
        .and_then(|_| node.constraints.finalize())
        .and_then(|_| node.chains.finalize());
    result.map_err(|e| s.naming_error(block, e))
}

/// The instance of a port inside a block or link definition.
fn port_instance(s: &Session, port: PortId) -> ElabResult<PortLike> {
    let node = &s.ports[port];
    Ok(match node.class.kind {
        PortKind::Port | PortKind::Bundle => PortLike::LibElem(LibraryPath::new(&node.class.name)),
        PortKind::Vector => {
            let (leaf, _) = s.vector_leaf(port);
            let elts = match node.vector.as_ref().and_then(|v| v.elts.as_ref()) {
                Some(elts) => {
                    let mut ports = IndexMap::new();
                    for (name, &elt) in elts {
                        ports.insert(name.clone(), port_instance(s, elt)?);
                    }
                    Some(ports)
                }
                None => None,
            };
            PortLike::Array(PortArray {
                self_class: LibraryPath::new(&s.ports[leaf].class.name),
                ports: elts,
            })
        }
    })
}

/// Port parameter initializers below `port`, with their dotted paths.
fn port_initializers(
    s: &Session,
    port: PortId,
    path: &[String],
    out: &mut Vec<(String, ParamId, crate::expr::Expr)>,
) {
    let node = &s.ports[port];
    for (name, param) in node.params.items() {
        if let ParamInit::Initializer(expr) = &s.params[param].init {
            let mut full = path.to_vec();
            full.push(name.to_string());
            out.push((full.join("."), param, expr.clone()));
        }
    }
    for (name, field) in node.fields.items() {
        let mut full = path.to_vec();
        full.push(name.to_string());
        port_initializers(s, field, &full, out);
    }
    if let Some(elts) = node.vector.as_ref().and_then(|v| v.elts.as_ref()) {
        for (name, &elt) in elts {
            let mut full = path.to_vec();
            full.push(name.clone());
            port_initializers(s, elt, &full, out);
        }
    }
}

fn emitted_meta(meta: &Metadata) -> Option<Metadata> {
    (!meta.is_empty()).then(|| meta.clone())
}

/// Parameters, ports and class identity shared by block definitions.
fn block_base(s: &Session, block: BlockId, refs: &RefMap) -> ElabResult<HierarchyBlock> {
    let node = &s.blocks[block];
    let class = &node.class;
    let mut pb = HierarchyBlock {
        self_class: Some(LibraryPath::new(&class.name)),
        prerefine_class: Some(LibraryPath::new(&class.name)),
        superclasses: class.superclasses.iter().map(LibraryPath::new).collect(),
        is_abstract: class.is_abstract,
        default_refinement: class.default_refinement.as_ref().map(LibraryPath::new),
        meta: emitted_meta(&node.meta),
        ..HierarchyBlock::default()
    };
    for (name, param) in node.params.items() {
        let param_node = &s.params[param];
        pb.params.insert(name.to_string(), param_node.kind.val_init());
        if let ParamInit::Arg(Some(value)) = &param_node.init {
            if !value.operands().is_empty() {
                return Err(ElabError::Definition(error_default_not_literal(
                    &class.name,
                    name,
                )));
            }
            pb.param_defaults
                .insert(name.to_string(), value.to_proto(s, &RefMap::default())?);
        }
    }
    for (name, port) in node.ports.items() {
        pb.ports.insert(name.to_string(), port_instance(s, port)?);
    }
    required_constraints(s, block, refs, &mut pb.constraints)?;
    Ok(pb)
}

fn required_constraints(
    s: &Session,
    block: BlockId,
    refs: &RefMap,
    constraints: &mut Constraints,
) -> ElabResult<()> {
    let node = &s.blocks[block];
    for &port in &node.required_ports {
        let name = node
            .ports
            .name_of(port)
            .ok_or_else(|| InternalError::new("required port without a name"))?;
        let path = lookup(s, refs, Ref::Port(port))?;
        let expr = if s.ports[port].vector.is_some() {
            ValueExpr::Binary {
                op: BinaryOp::Gt,
                lhs: Box::new(ValueExpr::Ref(path.with_reserved(Reserved::Length))),
                rhs: Box::new(ValueExpr::Literal(ValueLit::Integer(0))),
            }
        } else {
            ValueExpr::Ref(path.with_reserved(Reserved::IsConnected))
        };
        add_constraint(constraints, &node.class.name, format!("(reqd){name}"), expr)?;
    }
    Ok(())
}

fn param_initializers(
    s: &Session,
    block: BlockId,
    refs: &RefMap,
    constraints: &mut Constraints,
) -> ElabResult<()> {
    let node = &s.blocks[block];
    for (name, param) in node.params.items() {
        if let ParamInit::Initializer(expr) = &s.params[param].init {
            add_constraint(
                constraints,
                &node.class.name,
                format!("(init){name}"),
                assign(s, refs, param, expr)?,
            )?;
        }
    }
    Ok(())
}

fn body_constraints(
    s: &Session,
    block: BlockId,
    refs: &RefMap,
    constraints: &mut Constraints,
) -> ElabResult<()> {
    let node = &s.blocks[block];
    for (name, constraint) in node.constraints.items() {
        let expr = match &s.constraints[constraint] {
            ConstraintNode::Require(expr) => expr.to_proto(s, refs)?,
            ConstraintNode::Assign { dst, src } => assign(s, refs, *dst, src)?,
        };
        add_constraint(constraints, &node.class.name, name.to_string(), expr)?;
    }
    Ok(())
}

/// The reference of an endpoint, as a bare or projected expression.
fn endpoint_expr(s: &Session, refs: &RefMap, endpoint: Endpoint) -> ElabResult<ValueExpr> {
    Ok(match endpoint {
        Endpoint::Port(port) => ValueExpr::Ref(lookup(s, refs, Ref::Port(port))?),
        Endpoint::Derived { base, target } => ValueExpr::MapExtract {
            container: Box::new(ValueExpr::Ref(lookup(s, refs, Ref::Port(base))?)),
            path: {
                let sample = s.vector_sample(base)?;
                let sample_refs = RefMap::for_port(s, sample)?;
                lookup(s, &sample_refs, Ref::Port(target))?
            },
        },
    })
}

fn connected(block_port: ValueExpr, link_port: LocalPath, array: bool) -> ValueExpr {
    let expr = ConnectedExpr {
        block_port: Box::new(block_port),
        link_port: Box::new(ValueExpr::Ref(link_port)),
        expanded: Vec::new(),
    };
    if array {
        ValueExpr::ConnectedArray(expr)
    } else {
        ValueExpr::Connected(expr)
    }
}

fn exported(exterior: ValueExpr, internal: ValueExpr, array: bool) -> ValueExpr {
    let expr = ExportedExpr {
        exterior_port: Box::new(exterior),
        internal_block_port: Box::new(internal),
        expanded: Vec::new(),
    };
    if array {
        ValueExpr::ExportedArray(expr)
    } else {
        ValueExpr::Exported(expr)
    }
}

/// The root nets of a block, named, in naming order.
fn named_nets(s: &mut Session, block: BlockId) -> ElabResult<Vec<(String, ConnectId)>> {
    let roots: Vec<ConnectId> = s.blocks[block]
        .connects
        .all_values()
        .into_iter()
        .filter(|c| s.connects[*c].delegate.is_none())
        .collect();
    s.blocks[block]
        .connects
        .finalize()
        .map_err(|e| s.naming_error(block, e))?;
    let registry = &s.blocks[block].connects;
    Ok(roots
        .into_iter()
        .filter_map(|root| registry.name_of(root).map(|name| (name.to_string(), root)))
        .collect())
}

/// Chain-derived names of nets: `{chain}_{i}` for each chain stage.
fn chain_names(s: &Session, block: BlockId) -> Vec<(ConnectId, String)> {
    let mut out = Vec::new();
    for (name, chain) in s.blocks[block].chains.items() {
        for (i, net) in s.chains[chain].links.iter().enumerate() {
            out.push((s.net_root(*net), format!("{name}_{i}")));
        }
    }
    out
}

fn is_anon(name: &str) -> bool {
    name.starts_with("anon_")
}

fn inferred_name(s: &Session, block: BlockId, resolved: &Resolved) -> ElabResult<Option<String>> {
    let port = match resolved {
        Resolved::Export { external, .. } => Some(external.port()),
        Resolved::Link { bridged, direct, .. } => bridged
            .first()
            .map(|(port, _)| *port)
            .or_else(|| direct.first().map(|(e, _)| e.port())),
        Resolved::Nothing => None,
    };
    Ok(match port {
        Some(port) => Some(format!("_{}_link", s.name_from(port, block)?.join("_"))),
        None => None,
    })
}

/// Emits the connections of a block: exports, links and bridges.
fn hierarchy_connections(
    s: &mut Session,
    block: BlockId,
    refs: &RefMap,
    pb: &mut HierarchyBlock,
) -> ElabResult<()> {
    let class = s.class_name(block).to_string();
    let nets = named_nets(s, block)?;
    let chains = chain_names(s, block);
    for (name, net) in nets {
        let resolved = s.resolve_net(block, net)?;
        let chain_name = chains.iter().find(|(c, _)| *c == net).map(|(_, n)| n.clone());
        let name = if is_anon(&name) {
            match chain_name {
                Some(chain) if !is_anon(&chain) => chain,
                chain => match inferred_name(s, block, &resolved)? {
                    Some(inferred) => inferred,
                    None => chain.unwrap_or(name),
                },
            }
        } else {
            name
        };
        match resolved {
            Resolved::Nothing => {}
            Resolved::Export {
                is_array,
                external,
                internal,
            } => {
                let expr = exported(
                    endpoint_expr(s, refs, external)?,
                    endpoint_expr(s, refs, internal)?,
                    is_array,
                );
                add_constraint(&mut pb.constraints, &class, format!("(conn){name}"), expr)?;
            }
            Resolved::Link {
                link,
                is_array,
                bridged,
                direct,
            } => {
                let link_class = LibraryPath::new(link.name());
                let link_path = LocalPath::from_names(&[&name]);
                let link_like = if is_array {
                    LinkLike::Array(LinkArray {
                        self_class: link_class,
                        ports: IndexMap::new(),
                        constraints: IndexMap::new(),
                        links: IndexMap::new(),
                    })
                } else {
                    LinkLike::LibElem(link_class)
                };
                pb.links.insert(name.clone(), link_like);

                for (idx, (port, link_port)) in bridged.into_iter().enumerate() {
                    let bridge = s.bridge_of(port)?.ok_or_else(|| {
                        InternalError::new("bridged port without a bridge")
                    })?;
                    let port_name = s.name_from(port, block)?.join(".");
                    let bridge_name = format!("(bridge){port_name}");
                    pb.blocks.insert(
                        bridge_name.clone(),
                        BlockLike::LibElem(BlockLibElem {
                            base: LibraryPath::new(s.class_name(bridge)),
                            mixins: Vec::new(),
                        }),
                    );
                    let bridge_path = LocalPath::from_names(&[&bridge_name]);
                    add_constraint(
                        &mut pb.constraints,
                        &class,
                        format!("(bridge){name}_b{idx}"),
                        ValueExpr::exported(
                            lookup(s, refs, Ref::Port(port))?,
                            bridge_path.with_name("outer_port"),
                        ),
                    )?;
                    add_constraint(
                        &mut pb.constraints,
                        &class,
                        format!("(conn){name}_b{idx}"),
                        ValueExpr::connected(
                            bridge_path.with_name("inner_link"),
                            link_path.concat(&link_port),
                        ),
                    )?;
                }
                for (idx, (endpoint, link_port)) in direct.into_iter().enumerate() {
                    let expr = connected(
                        endpoint_expr(s, refs, endpoint)?,
                        link_path.concat(&link_port),
                        is_array,
                    );
                    add_constraint(&mut pb.constraints, &class, format!("(conn){name}_d{idx}"), expr)?;
                }
            }
        }
    }
    Ok(())
}

/// Child blocks with their mixins, and their argument initializers.
fn hierarchy_blocks(s: &Session, block: BlockId, pb: &mut HierarchyBlock) {
    let node = &s.blocks[block];
    for (name, child) in node.blocks.items() {
        let child_node = &s.blocks[child];
        pb.blocks.insert(
            name.to_string(),
            BlockLike::LibElem(BlockLibElem {
                base: LibraryPath::new(&child_node.class.name),
                mixins: child_node
                    .mixins
                    .iter()
                    .map(|m| LibraryPath::new(&s.blocks[*m].class.name))
                    .collect(),
            }),
        );
    }
}

fn child_arguments(
    s: &Session,
    block: BlockId,
    refs: &RefMap,
    constraints: &mut Constraints,
) -> ElabResult<()> {
    let node = &s.blocks[block];
    for (name, child) in node.blocks.items() {
        let mut owners = vec![child];
        owners.extend(s.blocks[child].mixins.iter().copied());
        for owner in owners {
            for (param_name, param) in s.blocks[owner].params.items() {
                if let ParamInit::Arg(Some(value)) = &s.params[param].init {
                    add_constraint(
                        constraints,
                        &node.class.name,
                        format!("(init){name}.{param_name}"),
                        assign(s, refs, param, value)?,
                    )?;
                }
            }
        }
    }
    Ok(())
}

/// Emits a block definition. A stub declares only the interface and the
/// generator record.
#[instrument(level = "debug", skip(s), fields(class = %s.class_name(block)))]
pub(crate) fn block_def(s: &mut Session, block: BlockId, stub: bool) -> ElabResult<HierarchyBlock> {
    s.in_frame(Frame::Block(block), |s| {
        finalize_members(s, block)?;
        let refs = RefMap::for_block(s, block)?;
        let mut pb = block_base(s, block, &refs)?;
        if stub {
            pb.generator = Some(Generator {
                required_params: s.generator_required(block, &refs)?,
            });
            return Ok(pb);
        }

        let class = s.class_name(block).to_string();
        let mut inits = Vec::new();
        for (name, port) in s.blocks[block].ports.items() {
            port_initializers(s, port, &[name.to_string()], &mut inits);
        }
        for (path, param, expr) in inits {
            add_constraint(
                &mut pb.constraints,
                &class,
                format!("(init){path}"),
                assign(s, &refs, param, &expr)?,
            )?;
        }
        param_initializers(s, block, &refs, &mut pb.constraints)?;
        hierarchy_blocks(s, block, &mut pb);
        hierarchy_connections(s, block, &refs, &mut pb)?;
        child_arguments(s, block, &refs, &mut pb.constraints)?;
        body_constraints(s, block, &refs, &mut pb.constraints)?;
        tracing::debug!(
            blocks = pb.blocks.len(),
            links = pb.links.len(),
            constraints = pb.constraints.len(),
            "emitted block"
        );
        Ok(pb)
    })
}

/// Emits a link definition. Nets between the link's own ports become nested
/// links, with each port exported into its nested link.
#[instrument(level = "debug", skip(s), fields(class = %s.class_name(link)))]
pub(crate) fn link_def(s: &mut Session, link: BlockId) -> ElabResult<Link> {
    s.in_frame(Frame::Block(link), |s| {
        finalize_members(s, link)?;
        let refs = RefMap::for_block(s, link)?;
        let node = &s.blocks[link];
        let class = node.class.name.clone();
        let mut pb = Link {
            self_class: Some(LibraryPath::new(&class)),
            superclasses: node.class.superclasses.iter().map(LibraryPath::new).collect(),
            meta: emitted_meta(&node.meta),
            ..Link::default()
        };
        for (name, param) in node.params.items() {
            pb.params.insert(name.to_string(), s.params[param].kind.val_init());
        }
        for (name, port) in node.ports.items() {
            pb.ports.insert(name.to_string(), port_instance(s, port)?);
        }
        param_initializers(s, link, &refs, &mut pb.constraints)?;
        body_constraints(s, link, &refs, &mut pb.constraints)?;

        for (name, net) in named_nets(s, link)? {
            let Resolved::Link {
                link: nested,
                is_array,
                bridged,
                direct,
            } = s.resolve_net(link, net)?
            else {
                continue;
            };
            if is_array {
                return Err(ElabError::Connectivity(error_connect(
                    N305,
                    &class,
                    "array connections inside a link must be flattened",
                )));
            }
            if !bridged.is_empty() {
                return Err(InternalError::new("link ports are never bridged").into());
            }
            let link_path = LocalPath::from_names(&[&name]);
            pb.links
                .insert(name.clone(), LinkLike::LibElem(LibraryPath::new(nested.name())));
            for (idx, (endpoint, link_port)) in direct.into_iter().enumerate() {
                let array = s.is_array_endpoint(endpoint);
                let expr = exported(
                    endpoint_expr(s, &refs, endpoint)?,
                    ValueExpr::Ref(link_path.concat(&link_port)),
                    array,
                );
                add_constraint(&mut pb.constraints, &class, format!("(export){name}_{idx}"), expr)?;
            }
        }
        Ok(pb)
    })
}

/// Emits a port or bundle definition.
pub(crate) fn port_def(s: &Session, port: PortId) -> ElabResult<LibraryElement> {
    let node = &s.ports[port];
    let mut params = IndexMap::new();
    for (name, param) in node.params.items() {
        params.insert(name.to_string(), s.params[param].kind.val_init());
    }
    let self_class = Some(LibraryPath::new(&node.class.name));
    let superclasses = node.class.superclasses.iter().map(LibraryPath::new).collect();
    Ok(match node.class.kind {
        PortKind::Port => LibraryElement::Port(Port {
            params,
            constraints: IndexMap::new(),
            self_class,
            superclasses,
            meta: None,
        }),
        PortKind::Bundle => {
            let mut ports = IndexMap::new();
            for (name, field) in node.fields.items() {
                ports.insert(name.to_string(), port_instance(s, field)?);
            }
            LibraryElement::Bundle(Bundle {
                params,
                ports,
                constraints: IndexMap::new(),
                self_class,
                superclasses,
                meta: None,
            })
        }
        PortKind::Vector => {
            return Err(InternalError::new("port arrays are not library elements").into())
        }
    })
}

/// Elaborates a block class on its own: a full definition, or a stub for
/// generators.
pub(crate) fn elaborate_erased_block(def: Rc<dyn ErasedBlock>) -> ElabResult<HierarchyBlock> {
    let mut s = Session::new();
    let block = s.instantiate_root(def)?;
    let stub = s.is_generator(block);
    block_def(&mut s, block, stub)
}

/// Elaborates a generator block with solved values.
pub(crate) fn generate_erased_block(
    def: Rc<dyn ErasedBlock>,
    values: &[ExprValue],
) -> ElabResult<HierarchyBlock> {
    let mut s = Session::new();
    let block = s.instantiate_root(def)?;
    s.run_generate(block, values)?;
    block_def(&mut s, block, false)
}

/// Elaborates a link class on its own.
pub(crate) fn elaborate_erased_link(def: Rc<dyn ErasedBlock>) -> ElabResult<Link> {
    let mut s = Session::new();
    let link = s.instantiate_root(def)?;
    link_def(&mut s, link)
}

/// Elaborates a port class on its own.
pub(crate) fn elaborate_erased_port(def: Rc<dyn ErasedPort>) -> ElabResult<LibraryElement> {
    let mut s = Session::new();
    let (port, _) = s.alloc_port(def, None)?;
    port_def(&s, port)
}

/// Elaborates a block type into its library definition.
pub fn elaborate_block<B: crate::block::BlockType>(block: B) -> ElabResult<HierarchyBlock> {
    elaborate_erased_block(Rc::new(crate::block::AsBlock(block)))
}

/// Elaborates a generator block type with solved values.
pub fn generate_block<B: crate::block::BlockType>(
    block: B,
    values: &[ExprValue],
) -> ElabResult<HierarchyBlock> {
    generate_erased_block(Rc::new(crate::block::AsBlock(block)), values)
}

/// Elaborates a link type into its library definition.
pub fn elaborate_link<L: crate::block::LinkType>(link: L) -> ElabResult<Link> {
    elaborate_erased_link(Rc::new(crate::block::AsLink(link)))
}

/// Elaborates a port type into its library definition.
pub fn elaborate_port<P: crate::port::PortType>(port: P) -> ElabResult<LibraryElement> {
    elaborate_erased_port(Rc::new(port))
}

/// Elaborates a top-level design rooted at `block`.
pub fn elaborate_toplevel<B: crate::block::BlockType>(block: B) -> ElabResult<Design> {
    let contents = elaborate_erased_block(Rc::new(crate::block::AsBlock(block)))?;
    Ok(Design { contents })
}
