//! Configuration file loading and merging

use super::schema::Config;
use crate::error::{PolicyError, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_ENV: &str = "SKIA_POLICY_CONFIG";
const CONFIG_FILE: &str = "skia-policy/config.toml";
const BUILTIN_POLICY: &str = include_str!("../builtin-policy.toml");

pub struct ConfigLoader;

impl ConfigLoader {
    /// Where the user's config is looked for when no path is given:
    /// `$SKIA_POLICY_CONFIG`, then the XDG config dir, then `~/.config`.
    pub fn default_config_path() -> PathBuf {
        let config_dir = || {
            env::var_os("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))
        };

        env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| config_dir().map(|dir| dir.join(CONFIG_FILE)))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PolicyError::ConfigLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// The stock policy compiled into the binary
    pub fn load_builtin() -> Result<Config> {
        Ok(toml::from_str(BUILTIN_POLICY)?)
    }

    /// Merge user config on top of built-in config.
    /// Each section the user provides replaces the built-in one wholesale;
    /// rule tables are order-sensitive so they are never interleaved.
    pub fn merge_configs(builtin: Config, user: Config) -> Config {
        Config {
            common: user.common,
            policy: user.policy.or(builtin.policy),
            bypass: user.bypass.or(builtin.bypass),
        }
    }

    /// Built-in policy overlaid with the user's config, if there is one.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used only when a file is present there.
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Config> {
        let user_path = path.or_else(|| {
            let fallback = Self::default_config_path();
            if fallback.exists() {
                Some(fallback)
            } else {
                debug!("No user config at {:?}, using built-in policy", fallback);
                None
            }
        });

        let builtin = Self::load_builtin()?;
        match user_path {
            Some(path) => Ok(Self::merge_configs(builtin, Self::load_from_file(path)?)),
            None => Ok(builtin),
        }
    }
}
