//! Default values for configuration fields.

pub fn default_font_family() -> String {
    "Menlo".to_string()
}

pub fn default_font_size() -> f32 {
    13.0
}

pub fn default_scrollback_lines() -> usize {
    10_000
}

pub fn default_zoom_step() -> f64 {
    0.1
}

/// Resolve the default shell for spawned terminals.
///
/// Resolution order: `$SHELL`, then `/bin/sh` on Unix. On Windows the
/// `COMSPEC` variable is consulted before falling back to `cmd.exe`.
pub fn default_shell() -> String {
    #[cfg(unix)]
    {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }
    #[cfg(windows)]
    {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shell_is_not_empty() {
        assert!(!default_shell().is_empty());
    }
}
