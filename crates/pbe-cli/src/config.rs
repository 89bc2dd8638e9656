use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pbe_core::EngineConfig;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "PBE_CONFIG";

/// Resolve the config file: explicit path first, then `PBE_CONFIG`.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV).ok().filter(|s| !s.is_empty()).map(PathBuf::from))
}

/// Load the engine config from TOML, falling back to defaults when no file is
/// configured, then apply command-line overrides.
pub fn load(
    explicit: Option<&Path>,
    energy: Option<u32>,
    steps: Option<usize>,
) -> Result<EngineConfig> {
    let mut config = match config_path(explicit) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            let config: EngineConfig = toml::from_str(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => EngineConfig::default(),
    };
    if let Some(energy) = energy {
        config.energy_units = energy;
    }
    if let Some(steps) = steps {
        config.step_budget = steps;
    }
    Ok(config)
}
