use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::paths::{config_file_path, default_mpv_config_dir};

pub const CONFIG_PATH_ENV: &str = "PLAYDISPATCH_CONFIG";
pub const MPV_ARGS_ENV: &str = "PLAYDISPATCH_MPV_ARGS";
pub const MPV_PRE_ARGS_ENV: &str = "PLAYDISPATCH_MPV_PRE_ARGS";
pub const MPV_CONFIG_DIR_ENV: &str = "PLAYDISPATCH_MPV_CONFIG_DIR";

/// Player settings, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Extra mpv arguments, comma separated.
    pub args: Option<String>,
    /// Command prefix wrapping the mpv invocation, comma separated.
    pub pre_args: Option<String>,
    /// Directory passed to mpv as `--config-dir`.
    pub config_dir: Option<PathBuf>,
}

impl PlayerConfig {
    pub fn load() -> Result<(Self, PathBuf)> {
        let path = resolve_config_path(env::var_os(CONFIG_PATH_ENV))?;
        let config = Self::load_from(&path)?.with_overrides(|key| env::var(key).ok());
        Ok((config, path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config at {}", path.display()));
            }
        };
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(config.normalized())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(args) = lookup(MPV_ARGS_ENV) {
            self.args = Some(args);
        }
        if let Some(pre_args) = lookup(MPV_PRE_ARGS_ENV) {
            self.pre_args = Some(pre_args);
        }
        if let Some(dir) = lookup(MPV_CONFIG_DIR_ENV) {
            self.config_dir = Some(PathBuf::from(dir));
        }
        self.normalized()
    }

    pub fn mpv_config_dir(&self) -> Result<PathBuf> {
        match &self.config_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_mpv_config_dir(),
        }
    }

    fn normalized(mut self) -> Self {
        self.args = self.args.filter(|value| !value.trim().is_empty());
        self.pre_args = self.pre_args.filter(|value| !value.trim().is_empty());
        self.config_dir = self
            .config_dir
            .filter(|dir| !dir.as_os_str().is_empty());
        self
    }
}

pub fn resolve_config_path(env_value: Option<OsString>) -> Result<PathBuf> {
    match env_value {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => config_file_path(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PlayerConfig::load_from(&dir.path().join("absent.json")).expect("load");
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            &dir,
            r#"{"args":"--fs,--volume=80","pre_args":"env,DRI_PRIME=1","config_dir":"/opt/mpv"}"#,
        );
        let config = PlayerConfig::load_from(&path).expect("load");
        assert_eq!(config.args.as_deref(), Some("--fs,--volume=80"));
        assert_eq!(config.pre_args.as_deref(), Some("env,DRI_PRIME=1"));
        assert_eq!(config.mpv_config_dir().expect("dir"), PathBuf::from("/opt/mpv"));
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, r#"{"args":"","pre_args":"  "}"#);
        let config = PlayerConfig::load_from(&path).expect("load");
        assert!(config.args.is_none());
        assert!(config.pre_args.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, "{not json");
        assert!(PlayerConfig::load_from(&path).is_err());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let overrides = HashMap::from([
            (MPV_ARGS_ENV, "--no-video".to_string()),
            (MPV_CONFIG_DIR_ENV, "/tmp/mpv-conf".to_string()),
        ]);
        let config = PlayerConfig {
            args: Some("--fs".to_string()),
            pre_args: Some("prime-run".to_string()),
            config_dir: None,
        }
        .with_overrides(|key| overrides.get(key).cloned());

        assert_eq!(config.args.as_deref(), Some("--no-video"));
        assert_eq!(config.pre_args.as_deref(), Some("prime-run"));
        assert_eq!(config.config_dir, Some(PathBuf::from("/tmp/mpv-conf")));
    }

    #[test]
    fn resolve_config_path_prefers_non_empty_env_value() {
        let path = resolve_config_path(Some(OsString::from("/etc/playdispatch.json")))
            .expect("resolve");
        assert_eq!(path, PathBuf::from("/etc/playdispatch.json"));
    }
}
