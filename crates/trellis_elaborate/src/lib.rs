//! Hardware elaboration engine.
//!
//! Turns typed block, link and port definitions into the `trellis_ir`
//! intermediate representation. Definitions declare their interface in
//! `init`, their internal hierarchy in `contents`, and optionally build that
//! hierarchy from solved values in `generate`. Every declaration goes through
//! an explicit [`Session`], which tracks the element under definition and
//! owns all live elements in arenas.
//!
//! # Usage
//!
//! ```ignore
//! let block = elaborate_block(TestBlockTop)?;
//! let stub = elaborate_block(TestGenerator::default())?;
//! let generated = generate_block(TestGenerator::default(), &solved_values)?;
//! ```

#![warn(missing_docs)]

pub mod arena;
pub mod block;
pub mod chain;
pub mod connect;
pub mod context;
pub mod emit;
pub mod errors;
pub mod expr;
pub mod generator;
pub mod ids;
pub mod library;
pub mod port;
pub mod range;
pub mod refmap;
pub mod reference;
pub mod registry;
pub mod session;
pub mod vector;

pub use block::{AdapterIo, BlockKind, BlockType, Child, ClassInfo, ElementSpec, LinkType, PortTag};
pub use chain::{Chain, Chainable};
pub use connect::{Connectable, ConnectTarget, DerivedVector, Endpoint, ImplicitConnect, Net};
pub use emit::{elaborate_block, elaborate_link, elaborate_port, elaborate_toplevel, generate_block};
pub use errors::{ElabError, ElabResult};
pub use expr::{ArrayExpr, BoolExpr, FloatExpr, IntExpr, RangeExpr, StringExpr, TypedExpr};
pub use generator::GeneratorInputs;
pub use library::Library;
pub use port::{PortClass, PortHandle, PortKind, PortType};
pub use range::Range;
pub use session::{BlockState, Session};
pub use vector::{Vector, VectorHandle};
