//! `trellis serve`: answers solver requests over stdin and stdout.

use trellis_compiler::HdlServer;
use trellis_elaborate::reference::reference_library;

use crate::GlobalArgs;

/// Runs the library server until end of requests or end of input.
pub fn run(_global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut server = HdlServer::new(reference_library());
    tracing::info!(classes = server.library().len(), "serving library");
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let served = server.serve(stdin.lock(), stdout.lock())?;
    tracing::info!(served, "library server stopped");
    Ok(0)
}
