//! Locating and loading `trellis.toml`.

use std::path::{Path, PathBuf};

use trellis_config::{load_config, load_config_file, TrellisConfig, CONFIG_FILE};

use crate::GlobalArgs;

/// Walks up from `start` to the nearest directory holding `trellis.toml`.
pub fn find_config_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Loads the configuration named by `--config`, or the nearest one above the
/// current directory. Without either, the defaults apply.
pub fn load_project_config(global: &GlobalArgs) -> Result<TrellisConfig, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let path = PathBuf::from(config_path);
        let config = if path.is_dir() {
            load_config(&path)?
        } else {
            load_config_file(&path)?
        };
        return Ok(config);
    }
    match find_config_dir(&std::env::current_dir()?) {
        Some(dir) => {
            tracing::debug!(dir = %dir.display(), "using project configuration");
            Ok(load_config(&dir)?)
        }
        None => Ok(TrellisConfig::default()),
    }
}
