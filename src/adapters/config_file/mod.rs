//! Configuration file adapter - TOML or YAML, chosen by extension

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::ClipperConfig;
use crate::error::{ClipperError, ClipperResult};

/// Read a configuration file; `.yaml`/`.yml` are YAML, everything else TOML
pub fn load(path: &Path) -> ClipperResult<ClipperConfig> {
    if !path.is_file() {
        return Err(ClipperError::ConfigError {
            message: format!("Config file does not exist: {}", path.display()),
        });
    }
    let content = fs::read_to_string(path)?;
    let config = parse(path, &content)?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

fn parse(path: &Path, content: &str) -> ClipperResult<ClipperConfig> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        _ => toml::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| ClipperError::ConfigError {
        message: format!("Failed to parse {}: {}", path.display(), e),
    })
}

/// Render a configuration as TOML, used by `config --show`
pub fn to_toml(config: &ClipperConfig) -> ClipperResult<String> {
    toml::to_string_pretty(config).map_err(|e| ClipperError::ConfigError {
        message: format!("Failed to serialize configuration: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Container, Verbosity};

    #[test]
    fn test_yaml_and_toml_agree() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("c.toml");
        let yaml_path = dir.path().join("c.yaml");
        fs::write(&toml_path, "container = \"mkv\"\nverbosity = \"commands\"\n").unwrap();
        fs::write(&yaml_path, "container: mkv\nverbosity: commands\n").unwrap();

        let from_toml = load(&toml_path).unwrap();
        let from_yaml = load(&yaml_path).unwrap();
        assert_eq!(from_toml, from_yaml);
        assert_eq!(from_toml.container, Some(Container::Mkv));
        assert_eq!(from_toml.verbosity, Verbosity::Commands);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("none.toml")).is_err());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "container = [").unwrap();
        assert!(matches!(load(&bad), Err(ClipperError::ConfigError { .. })));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = ClipperConfig::default();
        let text = to_toml(&config).unwrap();
        let back: ClipperConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
