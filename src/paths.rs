//! Translation between bare module names and resource locators.
//!
//! A bare name such as `util` maps to `./util.toml`. Anything that already
//! contains `<word><suffix>` is treated as a locator and left alone. The
//! inverse picks the first `<word><suffix>` out of a locator and strips
//! the suffix.

use regex::Regex;

use crate::{Error, Result};

/// Default resource suffix for module files.
pub const DEFAULT_SUFFIX: &str = ".toml";

/// Name/locator translation rules for one suffix.
#[derive(Debug, Clone)]
pub struct PathRules {
    suffix: String,
    located: Regex,
}

impl PathRules {
    /// Build rules for `suffix`, which must start with a dot.
    pub fn new(suffix: &str) -> Result<Self> {
        if suffix.len() < 2 || !suffix.starts_with('.') {
            return Err(Error::Validation(format!(
                "module suffix must look like \".ext\", got {:?}",
                suffix
            )));
        }
        let located = Regex::new(&format!(r"\w*{}", regex::escape(suffix)))?;
        Ok(Self {
            suffix: suffix.to_string(),
            located,
        })
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Whether `input` already names a located resource.
    pub fn is_located(&self, input: &str) -> bool {
        self.located.is_match(input)
    }

    /// Map a bare name to its conventional locator.
    pub fn to_locator(&self, name: &str) -> String {
        if self.is_located(name) {
            name.to_string()
        } else {
            format!("./{}{}", name, self.suffix)
        }
    }

    /// Extract the bare name from a locator.
    pub fn to_name(&self, locator: &str) -> String {
        match self.located.find(locator) {
            Some(m) => m
                .as_str()
                .strip_suffix(self.suffix.as_str())
                .unwrap_or(m.as_str())
                .to_string(),
            None => locator.to_string(),
        }
    }
}

impl Default for PathRules {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIX).expect("default suffix is valid")
    }
}
