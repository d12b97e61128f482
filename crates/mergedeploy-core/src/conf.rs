use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

pub const DEPLOYER_SYMLINKS_CONF: &str = "tools.deployer:symlinks";

/// Namespaced `key=value` settings, read from conf files and command-line overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conf {
    values: BTreeMap<String, String>,
}

impl Conf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_conf_str(raw: &str) -> Result<Self> {
        let mut conf = Self::new();
        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            conf.apply_assignment(line)
                .with_context(|| format!("invalid conf entry on line {}", index + 1))?;
        }
        Ok(conf)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read conf file: {}", path.display()))?;
        Self::from_conf_str(&raw)
            .with_context(|| format!("failed to parse conf file: {}", path.display()))
    }

    /// Applies one `key=value` assignment, as given on the command line.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<()> {
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(anyhow!(
                "conf assignment '{assignment}' must use key=value"
            ));
        };
        self.set(key, value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let key = key.trim();
        validate_conf_key(key)?;
        self.values.insert(key.to_string(), value.trim().to_string());
        Ok(())
    }

    /// Overlays `other` on top of `self`; keys present in both take `other`'s value.
    pub fn merge(&mut self, other: Conf) {
        self.values.extend(other.values);
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        let Some(raw) = self.get_str(key) else {
            return Ok(default);
        };
        parse_conf_bool(raw).ok_or_else(|| {
            anyhow!("conf '{key}' must be a boolean (true/false), got '{raw}'")
        })
    }
}

fn validate_conf_key(key: &str) -> Result<()> {
    let Some((namespace, name)) = key.split_once(':') else {
        return Err(anyhow!(
            "conf key '{key}' must use the <namespace>:<name> form"
        ));
    };
    if namespace.is_empty() || name.is_empty() {
        return Err(anyhow!(
            "conf key '{key}' must use the <namespace>:<name> form"
        ));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(anyhow!("conf key '{key}' must not contain whitespace"));
    }
    Ok(())
}

fn parse_conf_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
