//! Diagnostic codes, helper constructors and the elaboration error type.
//!
//! Codes `D301`--`D311` cover malformed definitions, `N301`--`N308`
//! unresolvable connections, `G301`--`G307` generator contract violations and
//! `I301` internal defects surfaced as diagnostics.

use crate::registry::RegistryError;
use trellis_common::InternalError;
use trellis_diagnostics::{Category, Diagnostic, DiagnosticCode};

/// Declaration made in a lifecycle phase that does not allow it.
pub const D301: DiagnosticCode = DiagnosticCode::new(Category::Definition, 301);
/// Naming conflict or unnamed element.
pub const D302: DiagnosticCode = DiagnosticCode::new(Category::Definition, 302);
/// Wrong kind of element passed to a declaration.
pub const D303: DiagnosticCode = DiagnosticCode::new(Category::Definition, 303);
/// Interface mixin misuse.
pub const D304: DiagnosticCode = DiagnosticCode::new(Category::Definition, 304);
/// Parameter default that is not self-contained.
pub const D305: DiagnosticCode = DiagnosticCode::new(Category::Definition, 305);
/// Port array used from the wrong context.
pub const D306: DiagnosticCode = DiagnosticCode::new(Category::Definition, 306);
/// Reference to a parameter or port outside the block and its children.
pub const D307: DiagnosticCode = DiagnosticCode::new(Category::Definition, 307);
/// Malformed chain.
pub const D308: DiagnosticCode = DiagnosticCode::new(Category::Definition, 308);
/// Library class that is not registered.
pub const D309: DiagnosticCode = DiagnosticCode::new(Category::Definition, 309);
/// Array projection whose selector is not a plain element reference.
pub const D310: DiagnosticCode = DiagnosticCode::new(Category::Definition, 310);
/// Declaration made with no element under definition.
pub const D311: DiagnosticCode = DiagnosticCode::new(Category::Definition, 311);

/// Port not reachable from the connecting block.
pub const N301: DiagnosticCode = DiagnosticCode::new(Category::Connectivity, 301);
/// More than one explicit name for one net.
pub const N302: DiagnosticCode = DiagnosticCode::new(Category::Connectivity, 302);
/// Boundary port without a bridge joined to a link.
pub const N303: DiagnosticCode = DiagnosticCode::new(Category::Connectivity, 303);
/// Ports with different link types in one net.
pub const N304: DiagnosticCode = DiagnosticCode::new(Category::Connectivity, 304);
/// Array and single ports mixed in one net.
pub const N305: DiagnosticCode = DiagnosticCode::new(Category::Connectivity, 305);
/// No link port left for a connected port.
pub const N306: DiagnosticCode = DiagnosticCode::new(Category::Connectivity, 306);
/// Port array joined to a single link port.
pub const N307: DiagnosticCode = DiagnosticCode::new(Category::Connectivity, 307);
/// Merging nets with different flattening.
pub const N308: DiagnosticCode = DiagnosticCode::new(Category::Connectivity, 308);

/// Generator block with no generation method.
pub const G301: DiagnosticCode = DiagnosticCode::new(Category::Generator, 301);
/// Modern and legacy generator styles mixed.
pub const G302: DiagnosticCode = DiagnosticCode::new(Category::Generator, 302);
/// Value read for a parameter never declared as a generator parameter.
pub const G303: DiagnosticCode = DiagnosticCode::new(Category::Generator, 303);
/// Invalid generator parameter declaration.
pub const G304: DiagnosticCode = DiagnosticCode::new(Category::Generator, 304);
/// Solved value missing or of the wrong type.
pub const G305: DiagnosticCode = DiagnosticCode::new(Category::Generator, 305);
/// Legacy generator defined twice.
pub const G306: DiagnosticCode = DiagnosticCode::new(Category::Generator, 306);
/// Generate requested on a block that cannot generate.
pub const G307: DiagnosticCode = DiagnosticCode::new(Category::Generator, 307);

/// Internal defect.
pub const I301: DiagnosticCode = DiagnosticCode::new(Category::Internal, 301);

/// An elaboration failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ElabError {
    /// Malformed declaration.
    #[error("{0}")]
    Definition(Diagnostic),
    /// Unresolvable or ambiguous connection.
    #[error("{0}")]
    Connectivity(Diagnostic),
    /// Generator protocol violation.
    #[error("{0}")]
    Generator(Diagnostic),
    /// A constraint references a parameter or port the block cannot reach.
    #[error("{0}")]
    Unreachable(Diagnostic),
    /// Internal consistency defect.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl ElabError {
    /// Returns this error as a diagnostic for rendering.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ElabError::Definition(d)
            | ElabError::Connectivity(d)
            | ElabError::Generator(d)
            | ElabError::Unreachable(d) => d.clone(),
            ElabError::Internal(err) => Diagnostic::error(I301, err.message.clone())
                .with_note("this is a defect in trellis, not in the design"),
        }
    }
}

/// Result type of elaboration operations.
pub type ElabResult<T> = Result<T, ElabError>;

/// Declaration outside the phases that allow it.
pub fn error_wrong_phase(class: &str, what: &str, allowed: &str) -> Diagnostic {
    Diagnostic::error(D301, format!("can't call {what} outside {allowed}"))
        .with_subject(class)
        .with_help(format!("call {what} inside {allowed} only"))
}

/// Registry misuse while naming an element.
pub fn error_naming(class: &str, err: &RegistryError) -> Diagnostic {
    Diagnostic::error(D302, err.to_string()).with_subject(class)
}

/// Wrong kind of element.
pub fn error_element_kind(class: &str, msg: &str) -> Diagnostic {
    Diagnostic::error(D303, msg.to_string()).with_subject(class)
}

/// Mixin misuse.
pub fn error_mixin(class: &str, msg: &str) -> Diagnostic {
    Diagnostic::error(D304, msg.to_string()).with_subject(class)
}

/// Parameter default that references other elements.
pub fn error_default_not_literal(class: &str, param: &str) -> Diagnostic {
    Diagnostic::error(
        D305,
        format!("default value of `{param}` must be a literal"),
    )
    .with_subject(class)
    .with_note("defaults are emitted without a reference map")
}

/// Port array operation from the wrong context.
pub fn error_vector_context(msg: &str) -> Diagnostic {
    Diagnostic::error(D306, msg.to_string())
}

/// Unreachable parameter or port in a constraint.
pub fn error_unreachable(class: &str, what: &str) -> Diagnostic {
    Diagnostic::error(D307, format!("constraint references unreachable {what}"))
        .with_subject(class)
        .with_help("only own parameters and ports, or those of immediate children, can be referenced")
}

/// Malformed chain.
pub fn error_chain(class: &str, msg: &str) -> Diagnostic {
    Diagnostic::error(D308, msg.to_string()).with_subject(class)
}

/// Library lookup of an unregistered class.
pub fn error_unknown_class(name: &str, kind: &str) -> Diagnostic {
    Diagnostic::error(D309, format!("no {kind} class `{name}` in the library"))
        .with_help("register the class with the library before elaborating it")
}

/// Array projection selector that is not a plain element reference.
pub fn error_projection(msg: &str) -> Diagnostic {
    Diagnostic::error(D310, msg.to_string())
        .with_help("return a parameter or introspection value of the element")
}

/// Declaration with no element under definition.
pub fn error_no_context(what: &str) -> Diagnostic {
    Diagnostic::error(D311, format!("{what} needs an enclosing element"))
}

/// Connectivity failure.
pub fn error_connect(code: DiagnosticCode, class: &str, msg: &str) -> Diagnostic {
    Diagnostic::error(code, msg.to_string()).with_subject(class)
}

/// Generator contract violation.
pub fn error_generator(code: DiagnosticCode, class: &str, msg: &str) -> Diagnostic {
    Diagnostic::error(code, msg.to_string()).with_subject(class)
}
