use std::path::Path;

use pregen_core::{PregenConfig, Settings};
use tracing::info;

/// Resolve settings from `path`; a missing file means defaults.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    if !path.exists() {
        info!(path = %path.display(), "no config file, using defaults");
        return Ok(Settings::default());
    }
    let settings = Settings::load(path)?;
    info!(path = %path.display(), "config loaded");
    Ok(settings)
}

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let content = PregenConfig::scaffold().to_toml_string()?;
    std::fs::write(path, content)?;
    println!("✓ Generated {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("pregen.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn scaffold_loads_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pregen.toml");
        init(&path, false).unwrap();
        assert_eq!(load_settings(&path).unwrap(), Settings::default());
        assert!(init(&path, false).is_err());
        init(&path, true).unwrap();
    }
}
