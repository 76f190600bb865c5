//! User configuration, read once at startup from
//! `$MYSH_CONFIG` or `~/.config/mysh/config.toml`.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::{env::Vars, jobs::DEFAULT_CAPACITY};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Print the welcome banner on startup.
    pub banner: bool,
    /// Color the prompt and process notices.
    pub color: bool,
    pub prompt_symbol: String,
    /// Where `mysh.log` goes. Defaults to `mysh` under the temp directory.
    pub log_dir: Option<PathBuf>,
    pub jobs: JobsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            banner: true,
            color: true,
            prompt_symbol: "> ".into(),
            log_dir: None,
            jobs: JobsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobsConfig {
    /// Maximum number of tracked background jobs.
    pub capacity: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    pub fn from_toml(path: &Path, source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load<V: Vars + ?Sized>(vars: &V) -> Result<Self, ConfigError> {
        let Some(path) = config_path(vars) else {
            return Ok(Self::default());
        };

        match fs::read_to_string(&path) {
            Ok(source) => {
                debug!(path = %path.display(), "loading config");
                Self::from_toml(&path, &source)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| env::temp_dir().join("mysh"))
    }
}

pub fn config_path<V: Vars + ?Sized>(vars: &V) -> Option<PathBuf> {
    if let Some(path) = vars.var("MYSH_CONFIG") {
        return Some(path.into());
    }

    vars.var("HOME")
        .map(|home| Path::new(&home).join(".config/mysh/config.toml"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::from_toml(Path::new("c.toml"), "").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.banner);
        assert_eq!(config.jobs.capacity, 100);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            Path::new("c.toml"),
            "color = false\nprompt_symbol = \"$ \"\n\n[jobs]\ncapacity = 8\n",
        )
        .unwrap();

        assert!(!config.color);
        assert!(config.banner);
        assert_eq!(config.prompt_symbol, "$ ");
        assert_eq!(config.jobs.capacity, 8);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml(Path::new("c.toml"), "colour = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("invalid config c.toml"));
    }

    #[test]
    fn path_prefers_override() {
        let vars = HashMap::from([("MYSH_CONFIG", "/etc/mysh.toml"), ("HOME", "/home/u")]);
        assert_eq!(config_path(&vars), Some(PathBuf::from("/etc/mysh.toml")));

        let vars = HashMap::from([("HOME", "/home/u")]);
        assert_eq!(
            config_path(&vars),
            Some(PathBuf::from("/home/u/.config/mysh/config.toml"))
        );
    }

    #[test]
    fn load_reads_file_or_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let vars = HashMap::from([("MYSH_CONFIG", path.display().to_string())]);

        assert_eq!(Config::load(&vars).unwrap(), Config::default());

        fs::write(&path, "banner = false\n").unwrap();
        assert!(!Config::load(&vars).unwrap().banner);
    }
}
