//! The library server answering the solver's callbacks.

use std::io::{Read, Write};

use trellis_elaborate::{ElabError, Library};
use trellis_ir::rpc::{HdlRequest, HdlResponse, PROTO_VERSION};
use trellis_ir::Refinements;

use crate::error::CompileError;
use crate::framing::{write_frame, FrameReader};

/// Answers [`HdlRequest`]s from a [`Library`].
///
/// A request that fails is answered with [`HdlResponse::Error`]; the server
/// keeps running.
pub struct HdlServer {
    library: Library,
}

fn error_reply(err: &ElabError) -> HdlResponse {
    let diagnostic = err.to_diagnostic();
    let traceback = diagnostic
        .notes
        .iter()
        .map(|note| format!("note: {note}"))
        .chain(diagnostic.help.iter().map(|help| format!("help: {help}")))
        .collect::<Vec<_>>()
        .join("\n");
    HdlResponse::Error {
        error: err.to_string(),
        traceback,
    }
}

fn unsupported(what: &str, class: &str) -> HdlResponse {
    HdlResponse::Error {
        error: format!("{what} `{class}` cannot be run: {what}s are not supported"),
        traceback: String::new(),
    }
}

impl HdlServer {
    /// A server over the given library.
    pub fn new(library: Library) -> Self {
        Self { library }
    }

    /// The served library.
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// The served library, mutably, for elaborating design tops.
    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }

    /// Answers one request. Returns `None` for
    /// [`HdlRequest::EndOfRequests`].
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn handle(&mut self, request: HdlRequest) -> Option<HdlResponse> {
        let response = match request {
            HdlRequest::IndexModule { name } => self
                .library
                .index_module(&name)
                .map(|indexed| HdlResponse::IndexModule { indexed }),
            HdlRequest::GetLibraryElement { element } => self
                .library
                .elaborate_class(&element.target)
                .map(|element| HdlResponse::GetLibraryElement {
                    element,
                    refinements: Refinements::default(),
                }),
            HdlRequest::ElaborateGenerator { element, values } => self
                .library
                .elaborate_generator(&element.target, &values)
                .map(|generated| HdlResponse::ElaborateGenerator { generated }),
            HdlRequest::RunRefinement {
                refinement_pass, ..
            } => Ok(unsupported("refinement pass", &refinement_pass.target)),
            HdlRequest::RunBackend { backend, .. } => Ok(unsupported("backend", &backend.target)),
            HdlRequest::GetProtoVersion => Ok(HdlResponse::GetProtoVersion(PROTO_VERSION)),
            HdlRequest::EndOfRequests => return None,
        };
        Some(response.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "request failed");
            error_reply(&err)
        }))
    }

    /// Serves framed requests from `input`, writing framed responses to
    /// `output`, until end of requests or end of input. Returns the number
    /// of requests answered.
    pub fn serve<R: Read, W: Write>(
        &mut self,
        input: R,
        mut output: W,
    ) -> Result<usize, CompileError> {
        let mut requests = FrameReader::new(input);
        let mut served = 0;
        loop {
            let request = requests.read_frame::<HdlRequest>()?;
            requests.log_passthrough("client");
            let Some(request) = request else {
                break;
            };
            let Some(response) = self.handle(request) else {
                break;
            };
            write_frame(&mut output, &response)?;
            served += 1;
        }
        tracing::debug!(served, "library server done");
        Ok(served)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_elaborate::reference::reference_library;
    use trellis_ir::LibraryPath;

    #[test]
    fn answers_proto_version() {
        let mut server = HdlServer::new(reference_library());
        assert_eq!(
            server.handle(HdlRequest::GetProtoVersion),
            Some(HdlResponse::GetProtoVersion(5))
        );
    }

    #[test]
    fn end_of_requests_has_no_answer() {
        let mut server = HdlServer::new(reference_library());
        assert_eq!(server.handle(HdlRequest::EndOfRequests), None);
    }

    #[test]
    fn backends_are_refused() {
        let mut server = HdlServer::new(reference_library());
        let reply = server.handle(HdlRequest::RunBackend {
            backend: LibraryPath::new("Netlist"),
            design: Default::default(),
            solved_values: Vec::new(),
            arguments: Vec::new(),
        });
        assert!(
            matches!(reply, Some(HdlResponse::Error { ref error, .. }) if error.contains("Netlist"))
        );
    }
}
