//! Station settings

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use so2_keyer::KeyerConfig;
use so2_rig::{RadioConfig, RadioLinkConfig};
use tracing::info;

/// Everything the station reads at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Keyer serial device and saved keyer options
    pub keyer: KeyerConfig,
    /// Radio transports and drain timing
    pub radios: RadioLinkConfig,
}

impl Default for Settings {
    fn default() -> Self {
        let mut radios = RadioLinkConfig::default();
        radios.radios[0] = Some(RadioConfig::network("localhost", 4532));
        Self {
            keyer: KeyerConfig::default(),
            radios,
        }
    }
}

impl Settings {
    /// Config directory: `$XDG_CONFIG_HOME/so2link`, else `~/.config/so2link`
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("so2link"));
            }
        }
        dirs::home_dir().map(|h| h.join(".config").join("so2link"))
    }

    /// Default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load from `path`, writing the defaults there if the file is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Settings::default();
            settings.save(path)?;
            info!("Wrote default settings to {}", path.display());
            return Ok(settings);
        }

        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Save to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use so2_rig::RigTransport;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("so2link-test-{}-{}", std::process::id(), name))
            .join("settings.json")
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let path = scratch("defaults");
        let _ = std::fs::remove_file(&path);

        let settings = Settings::load_or_create(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());

        let again = Settings::load_or_create(&path).unwrap();
        assert_eq!(again, settings);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file() {
        let path = scratch("partial");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{
                "keyer": {"device": "/dev/ttyUSB0"},
                "radios": {"radios": [null, {"transport": {"type": "serial", "device": "/dev/ttyUSB1", "baud": 38400}}]}
            }"#,
        )
        .unwrap();

        let settings = Settings::load_or_create(&path).unwrap();
        assert_eq!(settings.keyer.device, "/dev/ttyUSB0");
        assert_eq!(settings.keyer.speed_wpm, 28);
        assert!(settings.radios.radios[0].is_none());
        assert_eq!(
            settings.radios.radios[1].as_ref().map(|r| &r.transport),
            Some(&RigTransport::Serial {
                device: "/dev/ttyUSB1".into(),
                baud: 38400
            })
        );
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_garbage_is_an_error() {
        let path = scratch("garbage");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert!(Settings::load_or_create(&path).is_err());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
