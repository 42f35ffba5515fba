//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::TrellisConfig;
use std::path::Path;

/// The configuration file name looked up in a project directory.
pub const CONFIG_FILE: &str = "trellis.toml";

/// Loads and validates `trellis.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<TrellisConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<TrellisConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<TrellisConfig, ConfigError> {
    let config: TrellisConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &TrellisConfig) -> Result<(), ConfigError> {
    if let Some(compiler) = &config.compiler {
        if compiler.command.trim().is_empty() {
            return Err(ConfigError::MissingField("compiler.command".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LiteralValue;
    use std::io::Write;

    #[test]
    fn parse_compiler_section() {
        let config = load_config_from_str(
            r#"
[compiler]
command = "java"
args = ["-jar", "compiler.jar"]
ignore_errors = true
"#,
        )
        .unwrap();
        let compiler = config.compiler.unwrap();
        assert_eq!(compiler.command, "java");
        assert_eq!(compiler.args, ["-jar", "compiler.jar"]);
        assert!(compiler.ignore_errors);
    }

    #[test]
    fn defaults_when_sections_are_absent() {
        let config = load_config_from_str("").unwrap();
        assert!(config.compiler.is_none());
        assert!(config.refinements.class_values.is_empty());
    }

    #[test]
    fn literal_kinds_are_distinguished() {
        let config = load_config_from_str(
            r#"
[refinements.class_values.TestBlock]
flag = true
count = 3
value = 3.0
label = "x"
limit = { min = 1.0, max = 2.0 }
names = ["a", "b"]
"#,
        )
        .unwrap();
        let values = &config.refinements.class_values["TestBlock"];
        assert_eq!(values["flag"], LiteralValue::Boolean(true));
        assert_eq!(values["count"], LiteralValue::Integer(3));
        assert_eq!(values["value"], LiteralValue::Floating(3.0));
        assert_eq!(values["label"], LiteralValue::Text("x".into()));
        assert_eq!(values["limit"], LiteralValue::Range { min: 1.0, max: 2.0 });
        assert!(matches!(values["names"], LiteralValue::Array(ref a) if a.len() == 2));
    }

    #[test]
    fn empty_command_errors() {
        let err = load_config_from_str("[compiler]\ncommand = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn missing_command_is_a_parse_error() {
        let err = load_config_from_str("[compiler]\nargs = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn loads_from_project_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE)).unwrap();
        writeln!(file, "[compiler]\ncommand = \"solver\"").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.compiler.unwrap().command, "solver");
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
