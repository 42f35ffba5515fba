//! Parsing and validation of `trellis.toml` configuration files.
//!
//! The configuration names the external solver command and the refinements
//! applied to every compiled design. [`TrellisConfig::refinements`] converts
//! the refinement tables into the IR [`Refinements`](trellis_ir::Refinements)
//! value sent to the solver.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use resolve::resolve_refinements;
pub use types::*;
