//! Trellis CLI: the command-line interface for the Trellis elaborator.
//!
//! Provides `trellis elaborate` to print the IR of a library element,
//! `trellis library` to list the registered elements, `trellis compile` to
//! run a design through the configured solver, and `trellis serve` to answer
//! solver requests over stdin and stdout.

#![warn(missing_docs)]

mod compile;
mod elaborate;
mod project;
mod serve;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Trellis, an elaborator for hierarchical hardware designs.
#[derive(Parser, Debug)]
#[command(name = "trellis", version, about = "Trellis design elaborator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `trellis.toml` file or the directory holding one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer solver requests over stdin and stdout.
    Serve,
    /// Print the elaborated IR of a library element.
    Elaborate(ElaborateArgs),
    /// Compile a block as a design top with the configured solver.
    Compile(CompileArgs),
    /// List the registered library elements.
    Library,
}

/// Arguments for the `trellis elaborate` subcommand.
#[derive(Parser, Debug)]
pub struct ElaborateArgs {
    /// Library class name.
    pub class: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `trellis compile` subcommand.
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Block class to use as the design top.
    pub class: String,

    /// Print solved values even if the solver reports errors.
    #[arg(long)]
    pub ignore_errors: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from the environment.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Output format for elaborated elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable summary.
    Text,
    /// The full IR as JSON.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a config file or directory.
    pub config: Option<String>,
}

impl GlobalArgs {
    /// The log level used when `RUST_LOG` is unset.
    fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Installs the stderr log subscriber. stdout stays free for frames and
/// command output.
fn init_tracing(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(global.default_log_level()));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(global.color),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var_os("NO_COLOR").is_none() && std::env::var_os("TERM").is_some(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Serve => serve::run(&global),
        Command::Elaborate(ref args) => elaborate::run(args, &global),
        Command::Compile(ref args) => compile::run(args, &global),
        Command::Library => elaborate::list(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_elaborate_default_format() {
        let cli = Cli::parse_from(["trellis", "elaborate", "TestBlockTop"]);
        match cli.command {
            Command::Elaborate(ref args) => {
                assert_eq!(args.class, "TestBlockTop");
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Elaborate command"),
        }
    }

    #[test]
    fn parse_elaborate_json() {
        let cli = Cli::parse_from(["trellis", "elaborate", "TestLink", "--format", "json"]);
        match cli.command {
            Command::Elaborate(ref args) => assert_eq!(args.format, ReportFormat::Json),
            _ => panic!("expected Elaborate command"),
        }
    }

    #[test]
    fn parse_compile_with_global_flags() {
        let cli = Cli::parse_from([
            "trellis",
            "compile",
            "TestBlockTop",
            "--ignore-errors",
            "--config",
            "/path/to/trellis.toml",
            "--verbose",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("/path/to/trellis.toml"));
        match cli.command {
            Command::Compile(ref args) => {
                assert_eq!(args.class, "TestBlockTop");
                assert!(args.ignore_errors);
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn parse_serve_and_library() {
        assert!(matches!(
            Cli::parse_from(["trellis", "serve"]).command,
            Command::Serve
        ));
        let cli = Cli::parse_from(["trellis", "--quiet", "--color", "never", "library"]);
        assert!(cli.quiet);
        assert_eq!(cli.color, ColorChoice::Never);
        assert!(matches!(cli.command, Command::Library));
    }

    #[test]
    fn compile_requires_a_class() {
        assert!(Cli::try_parse_from(["trellis", "compile"]).is_err());
    }

    #[test]
    fn log_level_follows_flags() {
        let mut global = GlobalArgs {
            quiet: false,
            verbose: false,
            color: false,
            config: None,
        };
        assert_eq!(global.default_log_level(), "info");
        global.verbose = true;
        assert_eq!(global.default_log_level(), "debug");
        global.quiet = true;
        assert_eq!(global.default_log_level(), "error");
    }
}
