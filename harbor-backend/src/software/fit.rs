//! Grid fitting: translate a container rect into terminal columns and rows.

use crate::contract::FrameRect;

/// Cell dimensions in logical pixels for the configured font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub width: f64,
    pub height: f64,
}

impl CellMetrics {
    /// Approximate metrics for a monospace font at `size` points.
    ///
    /// Without a real text shaper the standard monospace aspect ratio is
    /// close enough: advance ~0.6em, line height ~1.2em. The exact values
    /// only shift the fitted grid by a column or row, which the shell
    /// handles like any other resize.
    pub fn for_font_size(size: f32) -> Self {
        let size = size as f64;
        Self {
            width: (size * 0.6).max(1.0),
            height: (size * 1.2).max(1.0),
        }
    }

    /// Apply a zoom factor, keeping metrics strictly positive.
    pub fn scaled(&self, zoom: f64) -> Self {
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        Self {
            width: self.width * zoom,
            height: self.height * zoom,
        }
    }
}

/// Largest grid that fits `rect`, clamped to at least 2x2 so emulator and
/// shell never see a degenerate size even while the container is being
/// laid out.
pub fn best_fit(rect: &FrameRect, metrics: &CellMetrics) -> (u16, u16) {
    let cols = (rect.w / metrics.width).floor() as i64;
    let rows = (rect.h / metrics.height).floor() as i64;
    (clamp_dim(cols), clamp_dim(rows))
}

fn clamp_dim(n: i64) -> u16 {
    n.clamp(2, u16::MAX as i64) as u16
}
