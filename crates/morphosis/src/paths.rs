use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG: &str = "MORPHOSIS_CONFIG";
pub const CONFIG_FILE_NAME: &str = "config.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Morphosis";
const APPLICATION: &str = "Morphosis";

/// Where the scene configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Flag(PathBuf),
    Env(PathBuf),
    UserFile(PathBuf),
    Defaults,
}

impl ConfigOrigin {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigOrigin::Flag(path) | ConfigOrigin::Env(path) | ConfigOrigin::UserFile(path) => {
                Some(path)
            }
            ConfigOrigin::Defaults => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self::with_config_dir(project_dirs.config_dir()))
    }

    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn default_config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Picks the configuration source: the flag, then `$MORPHOSIS_CONFIG`,
    /// then the user config file if it exists, then built-in defaults.
    pub fn resolve_config(&self, flag: Option<&Path>) -> ConfigOrigin {
        let from_env = env::var_os(ENV_CONFIG)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        self.resolve_with(flag, from_env)
    }

    fn resolve_with(&self, flag: Option<&Path>, from_env: Option<PathBuf>) -> ConfigOrigin {
        if let Some(path) = flag {
            return ConfigOrigin::Flag(path.to_path_buf());
        }
        if let Some(path) = from_env {
            return ConfigOrigin::Env(path);
        }
        let user_file = self.default_config_file();
        if user_file.is_file() {
            return ConfigOrigin::UserFile(user_file);
        }
        ConfigOrigin::Defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn flag_wins_over_everything() {
        let paths = AppPaths::with_config_dir("/nonexistent");
        let origin = paths.resolve_with(
            Some(Path::new("scene.toml")),
            Some(PathBuf::from("env.toml")),
        );
        assert_eq!(origin, ConfigOrigin::Flag(PathBuf::from("scene.toml")));
    }

    #[test]
    fn env_beats_user_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "version = 1").unwrap();
        let paths = AppPaths::with_config_dir(dir.path());
        let origin = paths.resolve_with(None, Some(PathBuf::from("env.toml")));
        assert_eq!(origin, ConfigOrigin::Env(PathBuf::from("env.toml")));
    }

    #[test]
    fn user_file_is_used_when_present() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&file, "version = 1").unwrap();
        let paths = AppPaths::with_config_dir(dir.path());
        assert_eq!(paths.resolve_with(None, None), ConfigOrigin::UserFile(file));
    }

    #[test]
    fn falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::with_config_dir(dir.path());
        let origin = paths.resolve_with(None, None);
        assert_eq!(origin, ConfigOrigin::Defaults);
        assert!(origin.path().is_none());
    }
}
