//! Conversion of refinement tables into the IR refinements value.

use crate::error::ConfigError;
use crate::types::{InstanceValue, LiteralValue, RefinementConfig, TrellisConfig};
use trellis_ir::{LibraryPath, LocalPath, RefinementValue, Refinements, ValueLit};

impl LiteralValue {
    /// Converts to an IR literal. Arrays must hold literals of one kind.
    pub fn to_lit(&self) -> Result<ValueLit, ConfigError> {
        Ok(match self {
            LiteralValue::Boolean(v) => ValueLit::Boolean(*v),
            LiteralValue::Integer(v) => ValueLit::Integer(*v),
            LiteralValue::Floating(v) => ValueLit::Floating(*v),
            LiteralValue::Text(v) => ValueLit::Text(v.clone()),
            LiteralValue::Range { min, max } => {
                if min > max {
                    return Err(ConfigError::ValidationError(format!(
                        "range minimum {min} exceeds maximum {max}"
                    )));
                }
                ValueLit::Range {
                    min: *min,
                    max: *max,
                }
            }
            LiteralValue::Array(elts) => {
                let lits = elts
                    .iter()
                    .map(LiteralValue::to_lit)
                    .collect::<Result<Vec<_>, _>>()?;
                if let Some(first) = lits.first() {
                    let kind = std::mem::discriminant(first);
                    if lits.iter().any(|l| std::mem::discriminant(l) != kind) {
                        return Err(ConfigError::ValidationError(
                            "array elements must all have the same type".to_string(),
                        ));
                    }
                }
                ValueLit::Array(lits)
            }
        })
    }
}

fn class_name(field: &str, name: &str) -> Result<LibraryPath, ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "empty class name in refinements.{field}"
        )));
    }
    Ok(LibraryPath::new(name))
}

fn design_path(field: &str, dotted: &str) -> Result<LocalPath, ConfigError> {
    if dotted.is_empty() || dotted.split('.').any(str::is_empty) {
        return Err(ConfigError::ValidationError(format!(
            "invalid path `{dotted}` in refinements.{field}"
        )));
    }
    Ok(LocalPath::parse_dotted(dotted))
}

/// Converts refinement tables into IR refinements, validating class names
/// and paths. Entries keep the tables' key order.
pub fn resolve_refinements(config: &RefinementConfig) -> Result<Refinements, ConfigError> {
    let mut refinements = Refinements::default();
    for (from, to) in &config.class_refinements {
        refinements.class_refinements.push((
            class_name("class_refinements", from)?,
            class_name("class_refinements", to)?,
        ));
    }
    for (path, class) in &config.instance_refinements {
        refinements.instance_refinements.push((
            design_path("instance_refinements", path)?,
            class_name("instance_refinements", class)?,
        ));
    }
    for (class, values) in &config.class_values {
        let class = class_name("class_values", class)?;
        for (param, value) in values {
            refinements.class_values.push((
                class.clone(),
                design_path("class_values", param)?,
                value.to_lit()?,
            ));
        }
    }
    for (path, value) in &config.instance_values {
        let value = match value {
            InstanceValue::Ref { path } => {
                RefinementValue::Ref(design_path("instance_values", path)?)
            }
            InstanceValue::Literal(lit) => RefinementValue::Literal(lit.to_lit()?),
        };
        refinements
            .instance_values
            .push((design_path("instance_values", path)?, value));
    }
    Ok(refinements)
}

impl TrellisConfig {
    /// The configured refinements as an IR value.
    pub fn refinements(&self) -> Result<Refinements, ConfigError> {
        resolve_refinements(&self.refinements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn empty_config_has_no_refinements() {
        let config = load_config_from_str("").unwrap();
        assert!(config.refinements().unwrap().is_empty());
    }

    #[test]
    fn converts_every_table() {
        let config = load_config_from_str(
            r#"
[refinements.class_refinements]
TestMixinBase = "TestMixinConcrete"

[refinements.instance_refinements]
"top.sink1" = "TestBlockSink"

[refinements.class_values.TestBlockSource]
float_value = 2.5

[refinements.instance_values]
"top.source.float_value" = 1
"top.limit" = { min = 0.5, max = 1.5 }
"top.mirror" = { ref = "top.source.float_value" }
"#,
        )
        .unwrap();
        let refinements = config.refinements().unwrap();
        assert_eq!(
            refinements.class_refinements,
            vec![(
                LibraryPath::new("TestMixinBase"),
                LibraryPath::new("TestMixinConcrete")
            )]
        );
        assert_eq!(
            refinements.instance_refinements[0].0,
            LocalPath::parse_dotted("top.sink1")
        );
        assert_eq!(
            refinements.class_values,
            vec![(
                LibraryPath::new("TestBlockSource"),
                LocalPath::parse_dotted("float_value"),
                ValueLit::Floating(2.5)
            )]
        );
        assert_eq!(refinements.instance_values.len(), 3);
        assert!(refinements.instance_values.contains(&(
            LocalPath::parse_dotted("top.limit"),
            RefinementValue::Literal(ValueLit::Range { min: 0.5, max: 1.5 })
        )));
        assert!(refinements.instance_values.contains(&(
            LocalPath::parse_dotted("top.mirror"),
            RefinementValue::Ref(LocalPath::parse_dotted("top.source.float_value"))
        )));
        assert!(refinements.instance_values.contains(&(
            LocalPath::parse_dotted("top.source.float_value"),
            RefinementValue::Literal(ValueLit::Integer(1))
        )));
    }

    #[test]
    fn rejects_empty_path_segments() {
        let config = load_config_from_str(
            r#"
[refinements.instance_refinements]
"top..sink" = "TestBlockSink"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.refinements().unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn rejects_inverted_ranges_and_mixed_arrays() {
        let inverted = LiteralValue::Range { min: 2.0, max: 1.0 };
        assert!(inverted.to_lit().is_err());
        let mixed = LiteralValue::Array(vec![
            LiteralValue::Integer(1),
            LiteralValue::Text("a".into()),
        ]);
        assert!(mixed.to_lit().is_err());
        let ints = LiteralValue::Array(vec![LiteralValue::Integer(1), LiteralValue::Integer(2)]);
        assert_eq!(
            ints.to_lit().unwrap(),
            ValueLit::Array(vec![ValueLit::Integer(1), ValueLit::Integer(2)])
        );
    }
}
