//! Entry-point discovery.
//!
//! The entry module comes from, in order: the command line, the
//! `DEFT_MAIN` environment variable, the config file's `main`.

use crate::config::Config;
use crate::{dlog_debug, Error, Result};

pub const MAIN_ENV: &str = "DEFT_MAIN";

/// Pick the entry module, reading `DEFT_MAIN` from the environment.
pub fn discover(cli: Option<&str>, config: &Config) -> Result<String> {
    let env = std::env::var(MAIN_ENV).ok();
    discover_with(cli, env.as_deref(), config)
}

/// Pick the entry module from explicit sources. Empty values are skipped.
pub fn discover_with(cli: Option<&str>, env: Option<&str>, config: &Config) -> Result<String> {
    let candidates = [
        ("command line", cli),
        (MAIN_ENV, env),
        ("config", config.main.as_deref()),
    ];
    for (origin, value) in candidates {
        if let Some(entry) = value.map(str::trim).filter(|v| !v.is_empty()) {
            dlog_debug!("Entry point {} from {}", entry, origin);
            return Ok(entry.to_string());
        }
    }
    Err(Error::NoEntryPoint)
}
