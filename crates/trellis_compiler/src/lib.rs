//! Transport and driver for the external constraint solver.
//!
//! Elaborated designs are handed to a solver subprocess over a framed binary
//! protocol ([`framing`]). While solving, the solver calls back into the
//! elaborator for library elements and generated blocks; [`HdlServer`]
//! answers those requests from a [`trellis_elaborate::Library`]. The final
//! answer is wrapped in a [`CompiledDesign`].
//!
//! ```ignore
//! let mut server = HdlServer::new(reference_library());
//! let mut solver = CompilerProcess::spawn("solver", &[])?;
//! let compiled = solver.compile(&mut server, "TestBlockTop", Refinements::default(), false)?;
//! println!("{:?}", compiled.get_value(&LocalPath::parse_dotted("source.float_value")));
//! ```

#![warn(missing_docs)]

pub mod design;
pub mod error;
pub mod framing;
pub mod process;
pub mod server;

pub use design::CompiledDesign;
pub use error::CompileError;
pub use framing::{write_frame, FrameReader, FRAME_MAGIC, MAX_FRAME_LEN};
pub use process::{drive_compile, CompilerProcess};
pub use server::HdlServer;
