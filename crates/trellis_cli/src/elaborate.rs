//! `trellis elaborate` and `trellis library`.

use std::fmt::Write as _;

use trellis_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use trellis_elaborate::reference::reference_library;
use trellis_ir::{IndexMap, LibraryElement};

use crate::{ElaborateArgs, GlobalArgs, ReportFormat};

/// Elaborates one library element and prints it.
///
/// Returns exit code 0 on success, 1 if elaboration failed.
pub fn run(args: &ElaborateArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut library = reference_library();
    let element = match library.elaborate_class(&args.class) {
        Ok(element) => element,
        Err(err) => {
            let renderer = TerminalRenderer::new(global.color);
            eprint!("{}", renderer.render(&err.to_diagnostic()));
            return Ok(1);
        }
    };
    match args.format {
        ReportFormat::Text => print!("{}", summarize(&args.class, &element)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&element)?),
    }
    Ok(0)
}

/// Lists the registered library elements with their kinds, elaborating
/// each one and reporting those that fail.
///
/// Returns exit code 0 if every element elaborates, 1 otherwise.
pub fn list(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut library = reference_library();
    let classes: Vec<(String, &'static str)> = library
        .classes()
        .map(|(name, kind)| (name.to_string(), kind))
        .collect();
    let sink = DiagnosticSink::new();
    for (name, kind) in &classes {
        let status = match library.elaborate_class(name) {
            Ok(_) => "ok",
            Err(err) => {
                let mut diag = err.to_diagnostic();
                if diag.subject.is_none() {
                    diag = diag.with_subject(name.clone());
                }
                sink.emit(diag);
                "FAILED"
            }
        };
        println!("{kind:<5} {name:<24} {status}");
    }

    let renderer = TerminalRenderer::new(global.color);
    for diag in sink.take_all() {
        eprint!("{}", renderer.render(&diag));
    }
    if !global.quiet {
        eprintln!("{} classes in {}", library.len(), library.module());
    }
    Ok(if sink.has_errors() { 1 } else { 0 })
}

fn section<V>(out: &mut String, title: &str, entries: &IndexMap<String, V>) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {title}:");
    for name in entries.keys() {
        let _ = writeln!(out, "    {name}");
    }
}

/// A human-readable outline of an element: its kind and the names of its
/// members, in declaration order.
fn summarize(class: &str, element: &LibraryElement) -> String {
    let mut out = format!("{} {class}\n", element.kind());
    match element {
        LibraryElement::Port(port) => {
            section(&mut out, "params", &port.params);
            section(&mut out, "constraints", &port.constraints);
        }
        LibraryElement::Bundle(bundle) => {
            section(&mut out, "params", &bundle.params);
            section(&mut out, "ports", &bundle.ports);
            section(&mut out, "constraints", &bundle.constraints);
        }
        LibraryElement::Block(block) => {
            if block.is_abstract {
                out.push_str("  abstract\n");
            }
            if let Some(generator) = &block.generator {
                let required: Vec<String> =
                    generator.required_params.iter().map(|p| p.to_string()).collect();
                let _ = writeln!(out, "  generator requires: {}", required.join(", "));
            }
            section(&mut out, "params", &block.params);
            section(&mut out, "ports", &block.ports);
            section(&mut out, "blocks", &block.blocks);
            section(&mut out, "links", &block.links);
            section(&mut out, "constraints", &block.constraints);
        }
        LibraryElement::Link(link) => {
            section(&mut out, "params", &link.params);
            section(&mut out, "ports", &link.ports);
            section(&mut out, "links", &link.links);
            section(&mut out, "constraints", &link.constraints);
        }
    }
    out
}
