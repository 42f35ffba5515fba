//! The solver subprocess and the compile exchange.

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};

use trellis_config::CompilerConfig;
use trellis_ir::rpc::{CompilerRequest, CompilerResult, HdlRequest};
use trellis_ir::Refinements;

use crate::design::CompiledDesign;
use crate::error::CompileError;
use crate::framing::{write_frame, FrameReader};
use crate::server::HdlServer;

/// Runs one compile exchange over an established transport.
///
/// Sends `request`, answers the solver's requests with `server` until it
/// signals end of requests, then reads the result. Fails with
/// [`CompileError::CheckFailed`] if the solver reported errors, unless
/// `ignore_errors` is set.
pub fn drive_compile<R: Read, W: Write>(
    server: &mut HdlServer,
    from_solver: &mut FrameReader<R>,
    to_solver: &mut W,
    request: &CompilerRequest,
    ignore_errors: bool,
) -> Result<CompiledDesign, CompileError> {
    write_frame(to_solver, request)?;
    tracing::debug!(
        refined = !request.refinements.is_empty(),
        "sent compile request"
    );

    let mut answered = 0usize;
    loop {
        let hdl_request = from_solver.read_frame::<HdlRequest>()?;
        from_solver.log_passthrough("solver");
        let hdl_request = hdl_request.ok_or_else(|| CompileError::Process {
            reason: "solver closed its output before ending requests".to_string(),
        })?;
        let Some(response) = server.handle(hdl_request) else {
            break;
        };
        write_frame(to_solver, &response)?;
        answered += 1;
    }
    tracing::debug!(answered, "solver ended requests");

    let result = from_solver.read_frame::<CompilerResult>()?;
    from_solver.log_passthrough("solver");
    let result = result.ok_or_else(|| CompileError::Process {
        reason: "solver closed its output without a result".to_string(),
    })?;

    let compiled = CompiledDesign::from_result(result);
    if !compiled.errors.is_empty() {
        tracing::warn!(errors = compiled.errors.len(), "solver reported errors");
        if !ignore_errors {
            return Err(CompileError::CheckFailed(compiled.errors_str()));
        }
    }
    Ok(compiled)
}

/// A running solver subprocess. Its stdin and stdout carry frames; its
/// stderr is inherited.
pub struct CompilerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: FrameReader<ChildStdout>,
}

impl CompilerProcess {
    /// Starts `command` with `args`.
    pub fn spawn(command: &str, args: &[String]) -> Result<Self, CompileError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| CompileError::Process {
                reason: format!("failed to start `{command}`: {e}"),
            })?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(CompileError::Process {
                reason: format!("`{command}` started without piped stdio"),
            });
        };
        tracing::info!(command, ?args, pid = child.id(), "started solver");
        Ok(Self {
            child,
            stdin,
            stdout: FrameReader::new(stdout),
        })
    }

    /// Starts the solver described by a `[compiler]` section. Its
    /// `ignore_errors` flag is left to the caller of [`Self::compile`].
    pub fn from_config(config: &CompilerConfig) -> Result<Self, CompileError> {
        Self::spawn(&config.command, &config.args)
    }

    /// Elaborates `root` from the server's library as a design top and
    /// compiles it with `refinements`.
    #[tracing::instrument(level = "info", skip(self, server, refinements))]
    pub fn compile(
        &mut self,
        server: &mut HdlServer,
        root: &str,
        refinements: Refinements,
        ignore_errors: bool,
    ) -> Result<CompiledDesign, CompileError> {
        let design = server.library_mut().elaborate_toplevel(root)?;
        let request = CompilerRequest {
            design,
            refinements,
        };
        drive_compile(
            server,
            &mut self.stdout,
            &mut self.stdin,
            &request,
            ignore_errors,
        )
    }

    /// Closes the solver's input and waits for it to exit.
    pub fn close(self) -> Result<ExitStatus, CompileError> {
        let Self {
            mut child, stdin, ..
        } = self;
        drop(stdin);
        let status = child.wait()?;
        tracing::debug!(%status, "solver exited");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_is_a_process_error() {
        let err = CompilerProcess::spawn("trellis-no-such-solver", &[]).err();
        assert!(
            matches!(err, Some(CompileError::Process { ref reason }) if reason.contains("trellis-no-such-solver"))
        );
    }
}
