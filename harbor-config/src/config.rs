//! Terminal host configuration management.
//!
//! Provides configuration loading, saving, and default values for the
//! terminal subsystem. The config is read at backend mount time and again on
//! explicit theme/font-size change signals from the host; there is no file
//! watcher here.

use crate::defaults;
use crate::themes::Theme;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Which rendering backend newly opened terminals should use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Cross-platform software terminal emulator.
    #[default]
    Software,
    /// GPU-accelerated native surface (macOS only; ignored elsewhere).
    NativeSurface,
}

/// Cursor rendering style for the software backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CursorStyle {
    #[default]
    Block,
    Underline,
    Beam,
}

/// Font settings shared by both backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontConfig {
    #[serde(default = "defaults::default_font_family")]
    pub family: String,
    #[serde(default = "defaults::default_font_size")]
    pub size: f32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: defaults::default_font_family(),
            size: defaults::default_font_size(),
        }
    }
}

/// Configuration for the terminal subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Shell to spawn; `None` means resolve from the environment.
    pub shell: Option<String>,

    /// Rendering backend preference for newly opened terminals.
    pub backend: BackendPreference,

    /// Font settings.
    pub font: FontConfig,

    /// Cursor style for the software backend.
    pub cursor_style: CursorStyle,

    /// Scrollback buffer length in lines.
    pub scrollback_lines: usize,

    /// Name of the active color theme.
    pub theme: String,

    /// UI zoom increment per zoom-in/zoom-out step.
    pub zoom_step: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            backend: BackendPreference::default(),
            font: FontConfig::default(),
            cursor_style: CursorStyle::default(),
            scrollback_lines: defaults::default_scrollback_lines(),
            theme: "Harbor Dark".to_string(),
            zoom_step: defaults::default_zoom_step(),
        }
    }
}

impl Config {
    /// Load configuration from the default config path.
    ///
    /// A missing or unparseable file is not fatal: defaults are returned and
    /// the problem is logged.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &std::path::Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Invalid config at {} ({e}); using defaults",
                        path.display()
                    );
                    Config::default()
                }
            },
            Err(_) => {
                log::debug!("No config at {}; using defaults", path.display());
                Config::default()
            }
        }
    }

    /// Save configuration to the default config path.
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&path, contents)
    }

    /// The configuration file path: `<config_dir>/harbor-term/config.toml`.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// The configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("harbor-term")
    }

    /// Resolve the active theme.
    pub fn load_theme(&self) -> Theme {
        Theme::by_name(&self.theme)
    }

    /// Resolve the shell to spawn, falling back to the environment default.
    pub fn resolve_shell(&self) -> String {
        self.shell
            .clone()
            .unwrap_or_else(defaults::default_shell)
    }
}
