use std::path::Path;

use adpulse_workflow::WorkflowConfig;

/// Config file picked up from the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "adpulse.toml";

/// Load the workflow config.
///
/// An explicit path must exist. Without one, `./adpulse.toml` is read if
/// present and defaults are used otherwise.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<WorkflowConfig, String> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                read_config(default)
            } else {
                Ok(WorkflowConfig::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<WorkflowConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read config '{}': {}", path.display(), e))?;
    let config: WorkflowConfig = toml::from_str(&content)
        .map_err(|e| format!("could not parse config '{}': {}", path.display(), e))?;
    config
        .validate()
        .map_err(|e| format!("invalid config '{}': {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}
