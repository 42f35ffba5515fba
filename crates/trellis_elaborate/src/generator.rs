//! The generator protocol.
//!
//! A generator block is elaborated twice. The first pass runs `init` and
//! `contents` and emits a stub: the interface plus a generator record naming
//! the parameters generation depends on. The solver resolves those
//! parameters; the second pass replays `init` and `contents`, binds the
//! solved values into [`GeneratorInputs`], runs `generate` and emits the full
//! definition.
//!
//! Only three kinds of value can feed a generator: constructor arguments of
//! the block, the requested-element names of its port arrays, and whether
//! its ports are connected.

use crate::connect::{ConnectTarget, Connectable, Endpoint};
use crate::context::Frame;
use crate::errors::{
    error_generator, ElabError, ElabResult, G302, G303, G304, G305, G306, G307,
};
use crate::expr::{Binding, Expr, ExprKind, TypedExpr};
use crate::ids::{BlockId, Owner, ParamId, PortId};
use crate::port::{downcast_handle, PortHandle};
use crate::refmap::{Ref, RefMap};
use crate::session::{BlockState, ParamInit, Session};
use std::fmt;
use std::rc::Rc;
use trellis_ir::rpc::ExprValue;
use trellis_ir::{LocalPath, Reserved, ValueLit};

/// A value a generator may depend on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum GenKey {
    Param(ParamId),
    IsConnected(PortId),
    Allocated(PortId),
}

impl GenKey {
    fn of(expr: &Expr) -> Option<Self> {
        match expr.binding() {
            Binding::Param(id) => Some(GenKey::Param(*id)),
            Binding::IsConnected(port) => Some(GenKey::IsConnected(*port)),
            Binding::Allocated(port) => Some(GenKey::Allocated(*port)),
            _ => None,
        }
    }

    fn path(&self, refs: &RefMap) -> Option<LocalPath> {
        match self {
            GenKey::Param(id) => refs.path(Ref::Param(*id)).cloned(),
            GenKey::IsConnected(port) => refs
                .path(Ref::Port(*port))
                .map(|p| p.with_reserved(Reserved::IsConnected)),
            GenKey::Allocated(port) => refs
                .path(Ref::Port(*port))
                .map(|p| p.with_reserved(Reserved::Allocated)),
        }
    }
}

/// Callback of a legacy generator.
pub type GeneratorFn = Rc<dyn Fn(&mut Session, &GeneratorInputs) -> ElabResult<()>>;

pub(crate) struct LegacyGenerator {
    pub reqs: Vec<(GenKey, ExprKind)>,
    pub callback: GeneratorFn,
}

/// An optional boundary port wired to an internal port when connected, and
/// the internal port wired to a fallback otherwise.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DefaultExport {
    pub internal: PortId,
    pub exported: PortId,
    pub default: ConnectTarget,
}

/// Generator bookkeeping of one block.
#[derive(Default)]
pub(crate) struct GeneratorState {
    pub params: Vec<(GenKey, ExprKind)>,
    pub legacy: Option<LegacyGenerator>,
    pub default_exports: Vec<DefaultExport>,
}

/// Solved values available to `generate`.
pub struct GeneratorInputs {
    class: String,
    values: Vec<(GenKey, ValueLit)>,
}

impl fmt::Debug for GeneratorInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorInputs")
            .field("class", &self.class)
            .field("values", &self.values.len())
            .finish()
    }
}

impl GeneratorInputs {
    /// The solved value of a generator parameter.
    pub fn get<E: TypedExpr>(&self, param: &E) -> ElabResult<E::Value> {
        let key = GenKey::of(param.expr()).ok_or_else(|| self.unregistered())?;
        let lit = self
            .values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, lit)| lit)
            .ok_or_else(|| self.unregistered())?;
        E::from_lit(lit).ok_or_else(|| {
            ElabError::Generator(error_generator(
                G305,
                &self.class,
                &format!("solved value {lit:?} does not match the parameter's type"),
            ))
        })
    }

    /// The solved value of a generator parameter, or `default` if it was
    /// never registered.
    pub fn get_or<E: TypedExpr>(&self, param: &E, default: E::Value) -> ElabResult<E::Value> {
        match self.get(param) {
            Err(ElabError::Generator(d)) if d.code == G303 => Ok(default),
            other => other,
        }
    }

    fn unregistered(&self) -> ElabError {
        ElabError::Generator(error_generator(
            G303,
            &self.class,
            "get(...) on a value never registered as a generator parameter",
        ))
    }

    fn value(&self, key: GenKey) -> Option<&ValueLit> {
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

impl Session {
    /// Registers a value the block's `generate` reads.
    ///
    /// Allowed from `init` or `contents`, and only for constructor arguments,
    /// a port array's requested names or a port's connectedness.
    pub fn generator_param<E: TypedExpr>(&mut self, param: &E) -> ElabResult<()> {
        let block = self.enclosing_block("generator_param(...)")?;
        self.check_phase(
            block,
            &[BlockState::Init, BlockState::Contents],
            "generator_param(...)",
            "init or contents",
        )?;
        let key = self.generator_key(block, param.expr())?;
        let params = &mut self.blocks[block].generator.params;
        if !params.iter().any(|(k, _)| *k == key) {
            params.push((key, E::kind()));
        }
        Ok(())
    }

    /// Defines a generator from a callback and the values it reads.
    pub fn generator(
        &mut self,
        reqs: impl IntoIterator<Item = Expr>,
        callback: impl Fn(&mut Session, &GeneratorInputs) -> ElabResult<()> + 'static,
    ) -> ElabResult<()> {
        let block = self.enclosing_block("generator(...)")?;
        if self.blocks[block].generator.legacy.is_some() {
            return Err(ElabError::Generator(error_generator(
                G306,
                self.class_name(block),
                "generator defined more than once",
            )));
        }
        let reqs = reqs
            .into_iter()
            .map(|expr| Ok((self.generator_key(block, &expr)?, expr.kind().clone())))
            .collect::<ElabResult<Vec<_>>>()?;
        self.blocks[block].generator.legacy = Some(LegacyGenerator {
            reqs,
            callback: Rc::new(callback),
        });
        Ok(())
    }

    /// Declares an optional boundary port of the same type as `internal`.
    /// When generating, `internal` is exported through it if it is connected
    /// and joined to `default` otherwise.
    pub fn default_export<H: PortHandle>(
        &mut self,
        name: &str,
        internal: &H,
        default: &dyn Connectable,
    ) -> ElabResult<H> {
        let block = self.enclosing_block("default_export(...)")?;
        let (exported, handle) = self.declare_boundary_like(name, internal.port_id(), true)?;
        let key = GenKey::IsConnected(exported);
        self.blocks[block]
            .generator
            .params
            .push((key, ExprKind::Bool));
        self.blocks[block].generator.default_exports.push(DefaultExport {
            internal: internal.port_id(),
            exported,
            default: default.connect_target(),
        });
        downcast_handle(handle)
    }

    fn generator_key(&self, block: BlockId, expr: &Expr) -> ElabResult<GenKey> {
        let class = self.class_name(block);
        let invalid = |msg: &str| ElabError::Generator(error_generator(G304, class, msg));
        let key = GenKey::of(expr)
            .ok_or_else(|| invalid("generator parameters must be parameters or port introspection"))?;
        match key {
            GenKey::Param(id) => {
                let node = &self.params[id];
                if node.owner != Owner::Block(block) || !matches!(node.init, ParamInit::Arg(_)) {
                    return Err(invalid("generator parameter must be a constructor argument of the block"));
                }
            }
            GenKey::IsConnected(port) | GenKey::Allocated(port) => {
                if self.port_block(port) != Some(block) {
                    return Err(invalid("generator port introspection must be on the block's own ports"));
                }
            }
        }
        Ok(key)
    }

    /// Whether the block generates its contents.
    pub(crate) fn is_generator(&self, block: BlockId) -> bool {
        let node = &self.blocks[block];
        node.class.is_generator
            || node.generator.legacy.is_some()
            || !node.generator.default_exports.is_empty()
    }

    /// Rejects blocks that use both `generate` and a legacy callback.
    fn check_generator_style(&self, block: BlockId) -> ElabResult<()> {
        let node = &self.blocks[block];
        let modern = node.class.is_generator || !node.generator.default_exports.is_empty();
        if modern && node.generator.legacy.is_some() {
            return Err(ElabError::Generator(error_generator(
                G302,
                &node.class.name,
                "generate() and generator(...) can't be used on the same block",
            )));
        }
        Ok(())
    }

    /// Paths of the values the stub's generator record declares.
    pub(crate) fn generator_required(
        &self,
        block: BlockId,
        refs: &RefMap,
    ) -> ElabResult<Vec<LocalPath>> {
        self.check_generator_style(block)?;
        let node = &self.blocks[block];
        let params = node.generator.params.iter();
        let keys: Vec<GenKey> = match &node.generator.legacy {
            Some(legacy) => legacy.reqs.iter().chain(params).map(|(k, _)| *k).collect(),
            None => params.map(|(k, _)| *k).collect(),
        };
        let mut paths = Vec::new();
        for key in keys {
            let path = key.path(refs).ok_or_else(|| {
                trellis_common::InternalError::new(format!("generator parameter {key:?} has no path"))
            })?;
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Binds solved values and runs the block's generation.
    pub(crate) fn run_generate(&mut self, block: BlockId, values: &[ExprValue]) -> ElabResult<()> {
        let class = self.class_name(block).to_string();
        if !self.is_generator(block) {
            return Err(ElabError::Generator(error_generator(
                G307,
                &class,
                "block is not a generator",
            )));
        }
        self.check_generator_style(block)?;
        if self.blocks[block].class.is_abstract {
            return Err(ElabError::Generator(
                error_generator(G307, &class, "abstract blocks can't be generated")
                    .with_help("refine the block to a concrete class first"),
            ));
        }
        let refs = RefMap::for_block(self, block)?;
        let node = &self.blocks[block];
        let mut wanted: Vec<(GenKey, ExprKind)> = node.generator.params.clone();
        if let Some(legacy) = &node.generator.legacy {
            wanted.extend(legacy.reqs.iter().cloned());
        }
        let mut inputs = GeneratorInputs {
            class: class.clone(),
            values: Vec::new(),
        };
        for (key, kind) in wanted {
            if inputs.value(key).is_some() {
                continue;
            }
            let path = key.path(&refs).ok_or_else(|| {
                trellis_common::InternalError::new(format!("generator parameter {key:?} has no path"))
            })?;
            let found = values.iter().find(|v| v.path == path).ok_or_else(|| {
                ElabError::Generator(error_generator(
                    G305,
                    &class,
                    &format!("no solved value for `{path}`"),
                ))
            })?;
            if !kind.admits(&found.value) {
                return Err(ElabError::Generator(error_generator(
                    G305,
                    &class,
                    &format!("solved value for `{path}` has the wrong type"),
                )));
            }
            inputs.values.push((key, found.value.clone()));
        }
        tracing::debug!(block = %class, values = inputs.values.len(), "generating");

        self.blocks[block].state = BlockState::Generate;
        let def = self.blocks[block].def.clone();
        let io = self.blocks[block]
            .io
            .clone()
            .ok_or_else(|| trellis_common::InternalError::new("generate before init"))?;
        let legacy = self.blocks[block]
            .generator
            .legacy
            .as_ref()
            .map(|l| l.callback.clone());
        let exports = self.blocks[block].generator.default_exports.clone();
        let modern = self.blocks[block].class.is_generator;
        self.in_frame(Frame::Block(block), |s| {
            match legacy {
                Some(callback) => callback(s, &inputs)?,
                None if modern => def.generate_erased(&*io, s, &inputs)?,
                None => {}
            }
            for export in exports {
                let connected = inputs
                    .value(GenKey::IsConnected(export.exported))
                    .and_then(ValueLit::as_bool)
                    .unwrap_or(false);
                let internal = ConnectTarget::Endpoint(Endpoint::Port(export.internal));
                if connected {
                    let exported = ConnectTarget::Endpoint(Endpoint::Port(export.exported));
                    s.connect(&[&internal, &exported])?;
                } else {
                    s.connect(&[&internal, &export.default])?;
                }
            }
            Ok(())
        })?;
        self.blocks[block].state = BlockState::PostGenerate;
        Ok(())
    }
}
