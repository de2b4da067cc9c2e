use bank_risk_core::EngineConfig;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::file::resolve_path;

/// Load an `EngineConfig` from YAML or JSON (chosen by extension, YAML
/// otherwise), or fall back to the reference preset.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        warn!("no --config given; using the reference configuration");
        return Ok(EngineConfig::reference());
    };

    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let config: EngineConfig = if is_json(&canonical) {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    config.validate()?;
    info!(version = %config.version, path = %canonical.display(), "configuration loaded");
    Ok(config)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
