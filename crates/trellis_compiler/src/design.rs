//! The solved design returned by the solver.

use indexmap::IndexMap;
use trellis_ir::rpc::{CompilerResult, ErrorRecord, ExprValue};
use trellis_ir::{Design, HierarchyBlock, LocalPath, ValueLit};

use crate::error::CompileError;

/// A design together with its solved parameter values and any errors the
/// solver reported.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledDesign {
    /// The fully expanded design.
    pub design: Design,
    /// Errors found while solving, in report order.
    pub errors: Vec<ErrorRecord>,
    values: IndexMap<LocalPath, ValueLit>,
}

impl CompiledDesign {
    /// Wraps a solver result. Later values for a repeated path win.
    pub fn from_result(result: CompilerResult) -> Self {
        let values = result
            .solved_values
            .into_iter()
            .map(|v| (v.path, v.value))
            .collect();
        Self {
            design: result.design,
            errors: result.errors,
            values,
        }
    }

    /// A design with known values and no errors.
    pub fn from_values(design: Design, values: Vec<ExprValue>) -> Self {
        Self::from_result(CompilerResult {
            design,
            solved_values: values,
            errors: Vec::new(),
        })
    }

    /// The root block of the design.
    pub fn contents(&self) -> &HierarchyBlock {
        &self.design.contents
    }

    /// The solved value at a path, if any.
    pub fn get_value(&self, path: &LocalPath) -> Option<&ValueLit> {
        self.values.get(path)
    }

    /// The solved value at a path of plain names.
    pub fn get_value_at(&self, names: &[&str]) -> Option<&ValueLit> {
        self.get_value(&LocalPath::from_names(names))
    }

    /// Solved values in the order the solver reported them.
    pub fn values(&self) -> impl Iterator<Item = (&LocalPath, &ValueLit)> {
        self.values.iter()
    }

    /// Adds values, for example from a refinement pass. A path that already
    /// has a value is an error and leaves the earlier values of the batch in
    /// place.
    pub fn append_values(&mut self, values: Vec<ExprValue>) -> Result<(), CompileError> {
        for ExprValue { path, value } in values {
            if self.values.contains_key(&path) {
                return Err(CompileError::DuplicateValue {
                    path: path.to_string(),
                });
            }
            self.values.insert(path, value);
        }
        Ok(())
    }

    /// Renders the errors as a bulleted list, one per line.
    pub fn errors_str(&self) -> String {
        self.errors
            .iter()
            .map(|error| {
                let mut location = error.path.to_string();
                if !error.name.is_empty() {
                    location.push(':');
                    location.push_str(&error.name);
                }
                format!("- {} @ {}: {}", error.kind, location, error.details)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_ir::Reserved;

    fn value(names: &[&str], value: ValueLit) -> ExprValue {
        ExprValue {
            path: LocalPath::from_names(names),
            value,
        }
    }

    #[test]
    fn values_are_keyed_by_structural_path() {
        let compiled = CompiledDesign::from_values(
            Design::default(),
            vec![
                value(&["source", "float_value"], ValueLit::Floating(2.5)),
                value(&["sink1", "range_param"], ValueLit::Range { min: 1.0, max: 2.0 }),
            ],
        );
        assert_eq!(
            compiled.get_value_at(&["source", "float_value"]),
            Some(&ValueLit::Floating(2.5))
        );
        assert_eq!(compiled.get_value_at(&["source"]), None);
        assert_eq!(compiled.values().count(), 2);
    }

    #[test]
    fn append_rejects_duplicates() {
        let mut compiled = CompiledDesign::from_values(
            Design::default(),
            vec![value(&["a"], ValueLit::Integer(1))],
        );
        compiled
            .append_values(vec![value(&["b"], ValueLit::Integer(2))])
            .unwrap();
        assert_eq!(compiled.get_value_at(&["b"]), Some(&ValueLit::Integer(2)));
        let err = compiled
            .append_values(vec![value(&["a"], ValueLit::Integer(3))])
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateValue { ref path } if path == "a"));
        assert_eq!(compiled.get_value_at(&["a"]), Some(&ValueLit::Integer(1)));
    }

    #[test]
    fn errors_render_with_reserved_steps_and_names() {
        let compiled = CompiledDesign::from_result(CompilerResult {
            design: Design::default(),
            solved_values: Vec::new(),
            errors: vec![
                ErrorRecord {
                    path: LocalPath::from_names(&["sink1", "sink"])
                        .with_reserved(Reserved::IsConnected),
                    kind: "Unsolved".to_string(),
                    name: String::new(),
                    details: "no value".to_string(),
                },
                ErrorRecord {
                    path: LocalPath::from_names(&["source"]),
                    kind: "Failed assertion".to_string(),
                    name: "limit".to_string(),
                    details: "false".to_string(),
                },
            ],
        });
        assert_eq!(
            compiled.errors_str(),
            "- Unsolved @ sink1.sink.(is_connected): no value\n\
             - Failed assertion @ source:limit: false"
        );
    }

    #[test]
    fn no_errors_render_empty() {
        let compiled = CompiledDesign::from_values(Design::default(), Vec::new());
        assert_eq!(compiled.errors_str(), "");
    }
}
