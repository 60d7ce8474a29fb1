//! Color theme definitions for terminal rendering.

use serde::{Deserialize, Serialize};

/// A color in RGB format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn as_array(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Terminal color theme: foreground/background/cursor plus the 16 ANSI slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Theme {
    pub name: String,
    pub foreground: Color,
    pub background: Color,
    pub cursor: Color,
    pub selection_background: Color,
    /// ANSI palette, indices 0-7 normal and 8-15 bright.
    pub ansi: [Color; 16],
}

impl Theme {
    /// Get an ANSI color by index; out-of-range indices fall back to foreground.
    pub fn ansi_color(&self, index: u8) -> Color {
        self.ansi
            .get(index as usize)
            .copied()
            .unwrap_or(self.foreground)
    }

    /// Default dark theme.
    pub fn harbor_dark() -> Self {
        Self {
            name: "Harbor Dark".to_string(),
            foreground: Color::new(0xd8, 0xd8, 0xd8),
            background: Color::new(0x18, 0x18, 0x18),
            cursor: Color::new(0xd8, 0xd8, 0xd8),
            selection_background: Color::new(0x38, 0x3c, 0x4a),
            ansi: [
                Color::new(0x18, 0x18, 0x18),
                Color::new(0xac, 0x42, 0x42),
                Color::new(0x90, 0xa9, 0x59),
                Color::new(0xf4, 0xbf, 0x75),
                Color::new(0x6a, 0x9f, 0xb5),
                Color::new(0xaa, 0x75, 0x9f),
                Color::new(0x75, 0xb5, 0xaa),
                Color::new(0xd8, 0xd8, 0xd8),
                Color::new(0x6b, 0x6b, 0x6b),
                Color::new(0xc5, 0x55, 0x55),
                Color::new(0xaa, 0xc3, 0x6e),
                Color::new(0xfe, 0xcb, 0x87),
                Color::new(0x82, 0xb8, 0xce),
                Color::new(0xc4, 0x8c, 0xb9),
                Color::new(0x8c, 0xce, 0xc3),
                Color::new(0xf8, 0xf8, 0xf8),
            ],
        }
    }

    /// Default light theme.
    pub fn harbor_light() -> Self {
        Self {
            name: "Harbor Light".to_string(),
            foreground: Color::new(0x38, 0x38, 0x38),
            background: Color::new(0xf8, 0xf8, 0xf8),
            cursor: Color::new(0x38, 0x38, 0x38),
            selection_background: Color::new(0xc8, 0xd2, 0xe0),
            ansi: [
                Color::new(0x18, 0x18, 0x18),
                Color::new(0xab, 0x46, 0x42),
                Color::new(0x53, 0x8a, 0x51),
                Color::new(0xb0, 0x8a, 0x30),
                Color::new(0x45, 0x72, 0xa8),
                Color::new(0x8f, 0x5b, 0x8a),
                Color::new(0x45, 0x8a, 0x83),
                Color::new(0xd8, 0xd8, 0xd8),
                Color::new(0x58, 0x58, 0x58),
                Color::new(0xc5, 0x55, 0x55),
                Color::new(0x68, 0xa0, 0x66),
                Color::new(0xc8, 0xa0, 0x40),
                Color::new(0x5a, 0x88, 0xc0),
                Color::new(0xa8, 0x70, 0xa2),
                Color::new(0x5a, 0xa0, 0x98),
                Color::new(0xff, 0xff, 0xff),
            ],
        }
    }

    /// Look up a built-in theme by name (case-insensitive); unknown names
    /// fall back to the default dark theme.
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "harbor light" | "light" => Self::harbor_light(),
            "harbor dark" | "dark" => Self::harbor_dark(),
            other => {
                log::warn!("Unknown theme '{other}', falling back to Harbor Dark");
                Self::harbor_dark()
            }
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::harbor_dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_color_indexing() {
        let theme = Theme::harbor_dark();
        assert_eq!(theme.ansi_color(0), theme.ansi[0]);
        assert_eq!(theme.ansi_color(15), theme.ansi[15]);
        // Out of range falls back to foreground
        assert_eq!(theme.ansi_color(200), theme.foreground);
    }

    #[test]
    fn by_name_falls_back_to_dark() {
        assert_eq!(Theme::by_name("no-such-theme").name, "Harbor Dark");
        assert_eq!(Theme::by_name("light").name, "Harbor Light");
    }
}
