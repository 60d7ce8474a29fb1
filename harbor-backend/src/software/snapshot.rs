//! Viewport snapshots for the software backend.
//!
//! Extracts the emulator's visible grid into runs of styled text with all
//! colors resolved to concrete RGB against the active theme, ready for a
//! host to paint without knowing anything about terminal color models.

use alacritty_terminal::event::EventListener;
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::index::{Column, Line};
use alacritty_terminal::term::cell::{Cell, Flags};
use alacritty_terminal::term::{Term, TermMode};
use alacritty_terminal::vte::ansi::{Color as VteColor, NamedColor};

use harbor_config::{Color, Theme};

/// Resolved cell attributes. Inverse video and hidden cells are already
/// applied, so `fg`/`bg` are final paint colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanStyle {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
}

/// A run of consecutive cells sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

/// One viewport row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotLine {
    pub spans: Vec<Span>,
}

impl SnapshotLine {
    /// Plain text of the row, styles discarded.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// The visible grid at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub columns: usize,
    pub rows: usize,
    pub lines: Vec<SnapshotLine>,
    /// Viewport cursor position, `None` when the cursor is hidden or the
    /// view is scrolled back.
    pub cursor: Option<(usize, usize)>,
}

impl Snapshot {
    /// All rows as plain text joined with newlines, for tests and logging.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(SnapshotLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Capture the current viewport of `term`, resolving colors against `theme`.
pub fn capture<L: EventListener>(term: &Term<L>, theme: &Theme) -> Snapshot {
    let grid = term.grid();
    let columns = grid.columns();
    let rows = grid.screen_lines();

    let mut lines = Vec::with_capacity(rows);
    for i in 0..rows {
        let row = &grid[Line(i as i32)];
        let mut line = SnapshotLine::default();
        for col in 0..columns {
            push_cell(&mut line, &row[Column(col)], theme, columns);
        }
        lines.push(line);
    }

    let cursor = if term.mode().contains(TermMode::SHOW_CURSOR) && grid.display_offset() == 0 {
        let point = grid.cursor.point;
        Some((point.column.0, point.line.0.max(0) as usize))
    } else {
        None
    };

    Snapshot {
        columns,
        rows,
        lines,
        cursor,
    }
}

fn push_cell(
    line: &mut SnapshotLine,
    cell: &Cell,
    theme: &Theme,
    num_cols: usize,
) {
    if cell.flags.contains(Flags::WIDE_CHAR_SPACER) {
        return;
    }
    let width: usize = line.spans.iter().map(|s| s.text.chars().count()).sum();
    if width >= num_cols {
        return;
    }

    let style = resolve_style(cell, theme);
    let ch = if cell.c == '\0' { ' ' } else { cell.c };

    match line.spans.last_mut() {
        Some(span) if span.style == style => span.text.push(ch),
        _ => line.spans.push(Span {
            text: ch.to_string(),
            style,
        }),
    }
}

fn resolve_style(cell: &Cell, theme: &Theme) -> SpanStyle {
    let flags = cell.flags;
    let mut fg = resolve_color(cell.fg, theme, true);
    let mut bg = resolve_color(cell.bg, theme, false);

    if flags.contains(Flags::DIM) {
        fg = dim(fg);
    }
    if flags.contains(Flags::INVERSE) {
        std::mem::swap(&mut fg, &mut bg);
    }
    if flags.contains(Flags::HIDDEN) {
        fg = bg;
    }

    SpanStyle {
        fg,
        bg,
        bold: flags.contains(Flags::BOLD),
        italic: flags.contains(Flags::ITALIC),
        underline: flags.intersects(
            Flags::UNDERLINE
                | Flags::DOUBLE_UNDERLINE
                | Flags::UNDERCURL
                | Flags::DOTTED_UNDERLINE
                | Flags::DASHED_UNDERLINE,
        ),
        strikethrough: flags.contains(Flags::STRIKEOUT),
    }
}

/// Resolve a vte color to concrete RGB using the theme palette.
pub fn resolve_color(color: VteColor, theme: &Theme, is_fg: bool) -> Color {
    match color {
        VteColor::Spec(rgb) => Color::new(rgb.r, rgb.g, rgb.b),
        VteColor::Indexed(idx) => indexed_color(idx, theme),
        VteColor::Named(named) => named_color(named, theme, is_fg),
    }
}

fn named_color(named: NamedColor, theme: &Theme, is_fg: bool) -> Color {
    match named {
        NamedColor::Black => theme.ansi_color(0),
        NamedColor::Red => theme.ansi_color(1),
        NamedColor::Green => theme.ansi_color(2),
        NamedColor::Yellow => theme.ansi_color(3),
        NamedColor::Blue => theme.ansi_color(4),
        NamedColor::Magenta => theme.ansi_color(5),
        NamedColor::Cyan => theme.ansi_color(6),
        NamedColor::White => theme.ansi_color(7),
        NamedColor::BrightBlack => theme.ansi_color(8),
        NamedColor::BrightRed => theme.ansi_color(9),
        NamedColor::BrightGreen => theme.ansi_color(10),
        NamedColor::BrightYellow => theme.ansi_color(11),
        NamedColor::BrightBlue => theme.ansi_color(12),
        NamedColor::BrightMagenta => theme.ansi_color(13),
        NamedColor::BrightCyan => theme.ansi_color(14),
        NamedColor::BrightWhite => theme.ansi_color(15),
        NamedColor::Foreground | NamedColor::BrightForeground => theme.foreground,
        NamedColor::Background => theme.background,
        NamedColor::Cursor => theme.cursor,
        NamedColor::DimBlack => dim(theme.ansi_color(0)),
        NamedColor::DimRed => dim(theme.ansi_color(1)),
        NamedColor::DimGreen => dim(theme.ansi_color(2)),
        NamedColor::DimYellow => dim(theme.ansi_color(3)),
        NamedColor::DimBlue => dim(theme.ansi_color(4)),
        NamedColor::DimMagenta => dim(theme.ansi_color(5)),
        NamedColor::DimCyan => dim(theme.ansi_color(6)),
        NamedColor::DimWhite => dim(theme.ansi_color(7)),
        NamedColor::DimForeground => {
            if is_fg {
                dim(theme.foreground)
            } else {
                theme.foreground
            }
        }
    }
}

/// 256-color palette: 16 theme colors, then the 6x6x6 cube, then the
/// grayscale ramp.
fn indexed_color(idx: u8, theme: &Theme) -> Color {
    match idx {
        0..=15 => theme.ansi_color(idx),
        16..=231 => {
            let idx = idx as usize - 16;
            let steps = [0u8, 95, 135, 175, 215, 255];
            Color::new(
                steps[idx / 36],
                steps[(idx / 6) % 6],
                steps[idx % 6],
            )
        }
        232..=255 => {
            let level = 8 + 10 * (idx - 232);
            Color::new(level, level, level)
        }
    }
}

fn dim(c: Color) -> Color {
    Color::new(
        (c.r as u16 * 2 / 3) as u8,
        (c.g as u16 * 2 / 3) as u8,
        (c.b as u16 * 2 / 3) as u8,
    )
}
