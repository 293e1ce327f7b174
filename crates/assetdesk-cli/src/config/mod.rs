//! Configuration management

use anyhow::{Context, Result};
use assetdesk_types::MonitoringConfig;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Zabbix connection, saved only after a successful connection test
    #[serde(default)]
    pub monitoring: Option<MonitoringConfig>,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            access_token: None,
            username: None,
            monitoring: None,
        }
    }
}

pub struct SettingsManager {
    home: PathBuf,
}

impl SettingsManager {
    /// `$ASSETDESK_HOME`, or `~/.assetdesk`
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = std::env::var("ASSETDESK_HOME") {
            return Ok(Self::at(path));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(Self::at(home.join(".assetdesk")))
    }

    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.home.join("settings.json")
    }

    /// Defaults when no settings file exists yet
    pub fn load(&self) -> Result<Settings> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {:?}", path))
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let path = self.settings_path();

        std::fs::create_dir_all(&self.home)
            .with_context(|| format!("Failed to create directory {:?}", self.home))?;

        let content =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

        // Holds the API token and the Zabbix password
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&path)
            .with_context(|| format!("Failed to open settings file {:?}", path))?;

        // `mode` only applies on creation; tighten files left by older versions
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        Ok(())
    }

    /// Load, apply `change`, save
    pub fn update<F>(&self, change: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.load()?;
        change(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }
}
