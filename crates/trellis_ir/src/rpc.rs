//! Messages exchanged with the external solver process.
//!
//! The solver receives one [`CompilerRequest`], may then issue any number of
//! [`HdlRequest`]s (each answered by an [`HdlResponse`]) to fetch library
//! elements and run generators, signals [`HdlRequest::EndOfRequests`], and
//! finally returns a [`CompilerResult`].

use crate::elem::{HierarchyBlock, LibraryPath};
use crate::lit::ValueLit;
use crate::path::LocalPath;
use crate::refinement::Refinements;
use crate::schema::{Design, LibraryElement};
use serde::{Deserialize, Serialize};

/// Version of this message set, answered to [`HdlRequest::GetProtoVersion`].
pub const PROTO_VERSION: u32 = 5;

/// A solved value at a design path.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ExprValue {
    /// The parameter path.
    pub path: LocalPath,
    /// The solved value.
    pub value: ValueLit,
}

/// A structured error reported by the solver.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Where the error is.
    pub path: LocalPath,
    /// Error kind, such as `Unsolved` or `Overassigned`.
    pub kind: String,
    /// Optional name of the offending constraint or parameter.
    pub name: String,
    /// Detail text.
    pub details: String,
}

/// The initial request to the solver.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CompilerRequest {
    /// The design to compile.
    pub design: Design,
    /// Refinements to apply.
    pub refinements: Refinements,
}

/// The solver's final answer.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CompilerResult {
    /// The fully expanded design.
    pub design: Design,
    /// Solved parameter values.
    pub solved_values: Vec<ExprValue>,
    /// Errors found while solving.
    pub errors: Vec<ErrorRecord>,
}

/// A request from the solver back to the elaborator.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum HdlRequest {
    /// List the library elements reachable from a module name.
    IndexModule {
        /// The module to index.
        name: String,
    },
    /// Elaborate one library class with default arguments.
    GetLibraryElement {
        /// The class to elaborate.
        element: LibraryPath,
    },
    /// Run a generator block with solved values.
    ElaborateGenerator {
        /// The generator class.
        element: LibraryPath,
        /// Values of the generator's required parameters.
        values: Vec<ExprValue>,
    },
    /// Run a refinement pass over a solved design.
    RunRefinement {
        /// The pass class.
        refinement_pass: LibraryPath,
        /// The design.
        design: Design,
        /// Its solved values.
        solved_values: Vec<ExprValue>,
    },
    /// Run a backend over a solved design.
    RunBackend {
        /// The backend class.
        backend: LibraryPath,
        /// The design.
        design: Design,
        /// Its solved values.
        solved_values: Vec<ExprValue>,
        /// Backend arguments.
        arguments: Vec<(String, String)>,
    },
    /// Query [`PROTO_VERSION`].
    GetProtoVersion,
    /// The solver has no further requests.
    EndOfRequests,
}

/// A successful answer to an [`HdlRequest`], or an error.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum HdlResponse {
    /// Indexed library classes.
    IndexModule {
        /// The class names found.
        indexed: Vec<LibraryPath>,
    },
    /// An elaborated library class.
    GetLibraryElement {
        /// The definition.
        element: LibraryElement,
        /// Refinements the element carries, for design tops.
        refinements: Refinements,
    },
    /// A generated block definition.
    ElaborateGenerator {
        /// The generated block.
        generated: HierarchyBlock,
    },
    /// New values from a refinement pass.
    RunRefinement {
        /// New values.
        new_values: Vec<ExprValue>,
    },
    /// Backend output.
    RunBackend {
        /// Output text per path.
        results: Vec<(LocalPath, String)>,
    },
    /// The protocol version.
    GetProtoVersion(u32),
    /// The request failed.
    Error {
        /// The error message.
        error: String,
        /// The chain of causes, outermost first.
        traceback: String,
    },
}
