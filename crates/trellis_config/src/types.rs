//! Configuration types deserialized from `trellis.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level configuration parsed from `trellis.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct TrellisConfig {
    /// The external solver. Required only for compiling.
    #[serde(default)]
    pub compiler: Option<CompilerConfig>,
    /// Refinements applied to every compiled design.
    #[serde(default)]
    pub refinements: RefinementConfig,
}

/// How to launch the external solver.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    /// The solver executable.
    pub command: String,
    /// Extra arguments passed to the solver.
    #[serde(default)]
    pub args: Vec<String>,
    /// Return solved results even when the solver reports errors.
    #[serde(default)]
    pub ignore_errors: bool,
}

/// Refinement tables, keyed by class name or dotted design path.
#[derive(Debug, Default, Deserialize)]
pub struct RefinementConfig {
    /// Every instance of a class is replaced by another class.
    #[serde(default)]
    pub class_refinements: BTreeMap<String, String>,
    /// The block at a dotted design path is replaced by a class.
    #[serde(default)]
    pub instance_refinements: BTreeMap<String, String>,
    /// Per class, parameters forced on every instance.
    #[serde(default)]
    pub class_values: BTreeMap<String, BTreeMap<String, LiteralValue>>,
    /// Parameters forced at a dotted design path.
    #[serde(default)]
    pub instance_values: BTreeMap<String, InstanceValue>,
}

/// A literal as written in TOML.
///
/// Tables with `min` and `max` keys are ranges.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    /// `true` or `false`.
    Boolean(bool),
    /// An integer.
    Integer(i64),
    /// A float.
    Floating(f64),
    /// A string.
    Text(String),
    /// `{ min = .., max = .. }`.
    Range {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// An array of literals.
    Array(Vec<LiteralValue>),
}

/// A forced parameter value: a literal, or `{ ref = "dotted.path" }` to take
/// the value of another parameter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InstanceValue {
    /// The value of the parameter at another design path.
    Ref {
        /// The dotted path.
        #[serde(rename = "ref")]
        path: String,
    },
    /// A literal.
    Literal(LiteralValue),
}
