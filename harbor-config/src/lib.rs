//! Configuration system for the harbor-term terminal subsystem.
//!
//! This crate provides configuration loading, saving, and default values
//! for the terminal host. It includes:
//!
//! - Terminal configuration types and settings
//! - Theme definitions and color palettes
//! - Default shell resolution

pub mod config;
pub mod defaults;
pub mod themes;

pub use config::{BackendPreference, Config, CursorStyle, FontConfig};
pub use themes::{Color, Theme};
