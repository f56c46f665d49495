use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::log::LogLevel;
use crate::paths::DEFAULT_SUFFIX;
use crate::{dlog_debug, Error, Result};

fn default_detect_cycles() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory module locators are resolved against.
    pub root: Option<String>,
    /// Module file suffix, e.g. ".toml".
    pub suffix: Option<String>,
    /// Entry module when none is given on the command line.
    pub main: Option<String>,
    #[serde(default = "default_detect_cycles")]
    pub detect_cycles: bool,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            suffix: None,
            main: None,
            detect_cycles: true,
            log_level: None,
        }
    }
}

impl Config {
    pub fn deft_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".deft"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::deft_dir()?.join("deft.toml"))
    }

    /// Module root: the configured `root` (with `~/` expanded) or the
    /// current directory.
    pub fn effective_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(dir) => Ok(expand_tilde(dir)),
            None => Ok(std::env::current_dir()?),
        }
    }

    pub fn effective_suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX)
    }

    pub fn effective_log_level(&self) -> Result<LogLevel> {
        match &self.log_level {
            Some(level) => level.parse(),
            None => Ok(LogLevel::Info),
        }
    }

    /// Load `~/.deft/deft.toml`, or defaults when it does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        dlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            dlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        dlog_debug!(
            "Config loaded: root={:?}, suffix={:?}, main={:?}, detect_cycles={}",
            config.root,
            config.suffix,
            config.main,
            config.detect_cycles
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let deft_dir = Self::deft_dir()?;
        if !deft_dir.exists() {
            dlog_debug!("Creating deft directory");
            fs::create_dir_all(&deft_dir)?;
        }
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        dlog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
