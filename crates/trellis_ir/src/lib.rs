//! The language-neutral intermediate representation produced by elaboration.
//!
//! The IR is a plain serde tree: [`LocalPath`]s address elements structurally,
//! [`ValueExpr`]s describe constraints over parameters and ports, and the
//! element types ([`HierarchyBlock`], [`Link`], [`Port`], [`Bundle`]) describe
//! one library class each. Named children are kept in [`IndexMap`]s so
//! declaration order survives serialization.
//!
//! The [`rpc`] module holds the messages exchanged with the external solver.

#![warn(missing_docs)]

pub mod elem;
pub mod expr;
pub mod lit;
pub mod path;
pub mod refinement;
pub mod rpc;
pub mod schema;

pub use elem::*;
pub use expr::*;
pub use indexmap::IndexMap;
pub use lit::ValueLit;
pub use path::{LocalPath, LocalStep, Reserved};
pub use refinement::{Refinements, RefinementValue};
pub use schema::{Design, LibraryElement};
