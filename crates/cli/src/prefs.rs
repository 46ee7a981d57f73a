//! Local preferences of this staff device
//!
//! Explicit load/save against `preferences.json` in the platform config
//! directory. Nothing here is shared with other devices.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PREFS_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    #[default]
    Sales,
}

impl Role {
    /// Owners and admins may delete entries and clear the line
    pub fn is_admin_like(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Admin => write!(f, "admin"),
            Role::Sales => write!(f, "sales"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub role: Role,
    /// Region last switched to from this device
    pub region: Option<String>,
    /// Display name printed above the feed
    pub store_label: String,
    pub show_clock: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            role: Role::default(),
            region: None,
            store_label: "Showroom".to_string(),
            show_clock: true,
        }
    }
}

impl Preferences {
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "queueline")
            .context("Cannot determine a config directory for this user")?;
        Ok(dirs.config_dir().join(PREFS_FILE))
    }

    /// A missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("Invalid preferences file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("Cannot write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("queueline-prefs-{}-{}", std::process::id(), name))
            .join(PREFS_FILE)
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let prefs = Preferences::load(&scratch("missing")).unwrap();
        assert_eq!(prefs, Preferences::default());
        assert!(!prefs.role.is_admin_like());
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch("save");
        let prefs = Preferences {
            role: Role::Admin,
            region: Some("North".to_string()),
            store_label: "Main St".to_string(),
            show_clock: false,
        };
        prefs.save(&path).unwrap();

        assert_eq!(Preferences::load(&path).unwrap(), prefs);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = scratch("partial");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"role": "owner"}"#).unwrap();

        let prefs = Preferences::load(&path).unwrap();
        assert_eq!(prefs.role, Role::Owner);
        assert!(prefs.role.is_admin_like());
        assert!(prefs.show_clock);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
