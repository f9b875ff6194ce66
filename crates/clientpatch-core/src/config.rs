use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

/// Target-root directories whose contents the client regenerates freely and
/// which are always emptied on revert.
pub const DEFAULT_VOLATILE_DIRS: [&str; 8] = [
    "AI",
    "AI_sakray",
    "_tmpEmblem",
    "memo",
    "Replay",
    "SaveData",
    "Navigationdata",
    "System",
];

/// Immutable patcher configuration, built once at startup and passed by
/// reference to every component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatchConfig {
    /// Live client installation that gets patched and reverted.
    pub target_root: PathBuf,
    /// Directory holding `Patches/`; staged source paths are relative to it.
    pub patch_root: PathBuf,
    #[serde(default = "default_volatile_dirs")]
    pub volatile_dirs: Vec<String>,
}

impl PatchConfig {
    pub fn new(target_root: impl Into<PathBuf>, patch_root: impl Into<PathBuf>) -> Self {
        Self {
            target_root: target_root.into(),
            patch_root: patch_root.into(),
            volatile_dirs: default_volatile_dirs(),
        }
    }

    /// Default configuration for a patch root living directly inside the
    /// client installation.
    pub fn discover(patch_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let patch_root = patch_root.into();
        let target_root = patch_root
            .parent()
            .ok_or_else(|| {
                anyhow!(
                    "patch root has no parent directory to use as target root: {}",
                    patch_root.display()
                )
            })?
            .to_path_buf();
        Ok(Self::new(target_root, patch_root))
    }

    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse clientpatch config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. Relative roots are resolved against the directory
    /// containing the file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml_str(&raw)
            .with_context(|| format!("invalid config file: {}", path.display()))?;

        if let Some(base) = path.parent() {
            if config.target_root.is_relative() {
                config.target_root = base.join(&config.target_root);
            }
            if config.patch_root.is_relative() {
                config.patch_root = base.join(&config.patch_root);
            }
        }
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for dir in &self.volatile_dirs {
            validate_volatile_dir(dir)
                .with_context(|| format!("invalid volatile directory '{dir}'"))?;
        }
        Ok(())
    }
}

fn default_volatile_dirs() -> Vec<String> {
    DEFAULT_VOLATILE_DIRS
        .iter()
        .map(|dir| (*dir).to_string())
        .collect()
}

// Volatile dirs are force-emptied on revert, so they must stay inside the
// target root.
fn validate_volatile_dir(dir: &str) -> anyhow::Result<()> {
    if dir.trim().is_empty() {
        return Err(anyhow!("volatile directory must not be empty"));
    }
    let path = Path::new(dir);
    if path
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(anyhow!(
            "volatile directory must be a plain relative path inside the target root"
        ));
    }
    Ok(())
}
