//! `trellis compile`: runs a design through the configured solver.

use trellis_compiler::{CompiledDesign, CompilerProcess, HdlServer};
use trellis_elaborate::reference::reference_library;

use crate::project::load_project_config;
use crate::{CompileArgs, GlobalArgs};

/// Compiles `args.class` and prints its solved values and errors.
///
/// Returns exit code 0 if the solver reported no errors, 1 otherwise.
pub fn run(args: &CompileArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_project_config(global)?;
    let compiler = config
        .compiler
        .as_ref()
        .ok_or("no [compiler] section in trellis.toml")?;
    let refinements = config.refinements()?;
    let ignore_errors = args.ignore_errors || compiler.ignore_errors;

    let mut server = HdlServer::new(reference_library());
    let mut process = CompilerProcess::from_config(compiler)?;
    let compiled = process.compile(&mut server, &args.class, refinements, ignore_errors);
    let status = process.close()?;
    if !status.success() {
        tracing::warn!(%status, "solver exited unsuccessfully");
    }
    let compiled = compiled?;

    print!("{}", render_values(&compiled));
    if !compiled.errors.is_empty() {
        println!("{}", compiled.errors_str());
        return Ok(1);
    }
    if !global.quiet {
        eprintln!("    Compiled {} ({} values)", args.class, compiled.values().count());
    }
    Ok(0)
}

/// One `path = value` line per solved value.
fn render_values(compiled: &CompiledDesign) -> String {
    compiled
        .values()
        .map(|(path, value)| format!("{path} = {value}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_ir::rpc::ExprValue;
    use trellis_ir::{Design, LocalPath, ValueLit};

    #[test]
    fn values_render_one_per_line() {
        let compiled = CompiledDesign::from_values(
            Design::default(),
            vec![
                ExprValue {
                    path: LocalPath::from_names(&["source", "float_value"]),
                    value: ValueLit::Boolean(true),
                },
                ExprValue {
                    path: LocalPath::from_names(&["count"]),
                    value: ValueLit::Integer(3),
                },
            ],
        );
        let rendered = render_values(&compiled);
        assert_eq!(rendered, "source.float_value = true\ncount = 3\n");
    }
}
