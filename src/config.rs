use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::frame::DEFAULT_MAX_WORDS;
use crate::DEFAULT_DEVICE_PATH;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DeviceConfigFile {
    device: Option<String>,
    read: Option<ReadConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ReadConfigFile {
    max_words: Option<usize>,
    print_payload: Option<bool>,
}

/// Device path and drain options shared by the tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub device_path: String,
    /// Receive buffer capacity in 32-bit words.
    pub max_words: usize,
    pub print_payload: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_path: DEFAULT_DEVICE_PATH.to_string(),
            max_words: DEFAULT_MAX_WORDS,
            print_payload: false,
        }
    }
}

impl DeviceConfig {
    /// Load from a config file (if any), then apply env overrides.
    ///
    /// The tools take the file path from `--config` or `PGPCARD_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply command-line overrides and re-validate.
    pub fn with_overrides(
        mut self,
        device: Option<String>,
        max_words: Option<usize>,
        print_payload: bool,
    ) -> Result<Self> {
        if let Some(device) = device {
            self.device_path = device;
        }
        if let Some(max_words) = max_words {
            self.max_words = max_words;
        }
        if print_payload {
            self.print_payload = true;
        }
        self.validate()?;
        Ok(self)
    }

    fn from_file(file: DeviceConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            device_path: file.device.unwrap_or(defaults.device_path),
            max_words: file
                .read
                .as_ref()
                .and_then(|read| read.max_words)
                .unwrap_or(defaults.max_words),
            print_payload: file
                .read
                .and_then(|read| read.print_payload)
                .unwrap_or(defaults.print_payload),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("PGPCARD_DEVICE") {
            if !device.trim().is_empty() {
                self.device_path = device;
            }
        }
        if let Ok(words) = std::env::var("PGPCARD_MAX_WORDS") {
            self.max_words = words
                .trim()
                .parse()
                .map_err(|_| anyhow!("PGPCARD_MAX_WORDS must be an integer number of words"))?;
        }
        if let Ok(flag) = std::env::var("PGPCARD_PRINT_PAYLOAD") {
            self.print_payload = parse_bool(&flag)
                .ok_or_else(|| anyhow!("PGPCARD_PRINT_PAYLOAD must be a boolean, got {flag:?}"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.device_path.trim().is_empty() {
            return Err(anyhow!("device path must not be empty"));
        }
        if self.max_words == 0 {
            return Err(anyhow!("max_words must be greater than zero"));
        }
        if u32::try_from(self.max_words).is_err() {
            return Err(anyhow!(
                "max_words {} exceeds the driver limit of {} words",
                self.max_words,
                u32::MAX
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<DeviceConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_card_zero() {
        let cfg = DeviceConfig::from_file(DeviceConfigFile::default());
        assert_eq!(cfg.device_path, "/dev/PgpCardG3_0");
        assert_eq!(cfg.max_words, 2 * 1024 * 1024);
        assert!(!cfg.print_payload);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn overrides_are_validated() {
        let cfg = DeviceConfig::default();
        assert!(cfg.clone().with_overrides(None, Some(0), false).is_err());
        assert!(cfg
            .clone()
            .with_overrides(Some(" ".into()), None, false)
            .is_err());
        let cfg = cfg
            .with_overrides(Some("stub://bench".into()), Some(64), true)
            .unwrap();
        assert_eq!(cfg.device_path, "stub://bench");
        assert_eq!(cfg.max_words, 64);
        assert!(cfg.print_payload);
    }
}
