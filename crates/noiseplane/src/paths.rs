//! Resolves where noiseplane keeps its configuration.
//!
//! `NOISEPLANE_CONFIG_DIR` replaces the platform config directory when set to
//! a non-empty value; otherwise the directory comes from `directories-next`
//! and is created on first use.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "NOISEPLANE_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "noiseplane";
const APPLICATION: &str = "noiseplane";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }

        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        let config_dir = ensure_directory(project_dirs.config_dir())?;
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

fn ensure_directory(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            format!(
                "failed to create noiseplane config directory at {}",
                path.display()
            )
        })?;
    }
    Ok(path.to_path_buf())
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
