//! Key interception and PTY byte encoding for the software backend.
//!
//! Three-way dispatch: a fixed set of host-application shortcuts passes
//! through untouched, a smaller set of terminal-local shortcuts is handled
//! by the backend itself, and everything else is encoded into the byte
//! sequence the shell expects.

/// Keyboard modifiers as the host delivers them. `cmd` is Command on macOS
/// and Super elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub cmd: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        cmd: false,
    };

    pub const CMD: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        cmd: true,
    };
}

/// Key identity, decoupled from any UI toolkit's event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Esc,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub mods: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, mods: Modifiers) -> Self {
        Self { key, mods }
    }
}

/// Shortcuts the backend handles itself instead of forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalAction {
    /// Toggle the in-terminal search bar.
    ToggleSearch,
    /// Clear screen and scrollback.
    Clear,
    /// Copy the selection if one exists, otherwise send SIGINT (^C).
    CopyOrInterrupt,
    /// Paste from the host clipboard.
    Paste,
}

/// Where a key event goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// A host-application shortcut; the backend must not consume it.
    PassThrough,
    /// Handled by the backend itself.
    Local(LocalAction),
    /// Encoded bytes bound for the PTY.
    Forward(Vec<u8>),
    /// Nothing to send (e.g. a bare modifier).
    Ignored,
}

/// Classify a key event.
///
/// `app_cursor` selects the DECCKM arrow-key encoding and comes from the
/// emulator's live mode flags.
pub fn dispose(event: &KeyEvent, app_cursor: bool) -> Disposition {
    if event.mods.cmd {
        return match event.key {
            Key::Char('f') | Key::Char('F') => Disposition::Local(LocalAction::ToggleSearch),
            Key::Char('k') | Key::Char('K') => Disposition::Local(LocalAction::Clear),
            Key::Char('c') | Key::Char('C') => Disposition::Local(LocalAction::CopyOrInterrupt),
            Key::Char('v') | Key::Char('V') => Disposition::Local(LocalAction::Paste),
            // Every other cmd combo belongs to the host application
            // (tab switching, new worktree, settings, ...).
            _ => Disposition::PassThrough,
        };
    }

    match encode_key(event.key, event.mods, app_cursor) {
        Some(bytes) => Disposition::Forward(bytes),
        None => Disposition::Ignored,
    }
}

/// Encode a non-passthrough key into the bytes the shell expects.
pub fn encode_key(key: Key, mods: Modifiers, app_cursor: bool) -> Option<Vec<u8>> {
    // Ctrl+key combos become control characters.
    if mods.ctrl && !mods.alt {
        if let Key::Char(c) = key {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() {
                return Some(vec![(c as u8) - b'a' + 1]);
            }
            match c {
                '[' => return Some(vec![0x1b]),
                '\\' => return Some(vec![0x1c]),
                ']' => return Some(vec![0x1d]),
                ' ' | '@' => return Some(vec![0x00]),
                '?' => return Some(vec![0x7f]),
                _ => {}
            }
        }
    }

    // Alt+char becomes ESC-prefixed.
    if mods.alt && !mods.ctrl {
        if let Key::Char(c) = key {
            let mut bytes = vec![0x1b];
            let mut utf8 = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            return Some(bytes);
        }
    }

    match key {
        Key::Char(c) => {
            let mut utf8 = [0u8; 4];
            Some(c.encode_utf8(&mut utf8).as_bytes().to_vec())
        }
        Key::Enter => Some(vec![b'\r']),
        Key::Tab => {
            if mods.shift {
                Some(b"\x1b[Z".to_vec())
            } else {
                Some(vec![b'\t'])
            }
        }
        Key::Backspace => Some(vec![0x7f]),
        Key::Delete => Some(b"\x1b[3~".to_vec()),
        Key::Esc => Some(vec![0x1b]),
        Key::Up => Some(arrow(b'A', mods, app_cursor)),
        Key::Down => Some(arrow(b'B', mods, app_cursor)),
        Key::Right => Some(arrow(b'C', mods, app_cursor)),
        Key::Left => Some(arrow(b'D', mods, app_cursor)),
        Key::Home => Some(b"\x1b[H".to_vec()),
        Key::End => Some(b"\x1b[F".to_vec()),
        Key::PageUp => Some(b"\x1b[5~".to_vec()),
        Key::PageDown => Some(b"\x1b[6~".to_vec()),
    }
}

/// Arrow-key encoding: CSI normally, SS3 in application-cursor mode,
/// CSI-with-modifier when modifiers are held.
fn arrow(letter: u8, mods: Modifiers, app_cursor: bool) -> Vec<u8> {
    let modifier_code = match (mods.shift, mods.alt, mods.ctrl) {
        (false, false, false) => 0,
        (true, false, false) => 2,
        (false, true, false) => 3,
        (true, true, false) => 4,
        (false, false, true) => 5,
        (true, false, true) => 6,
        (false, true, true) => 7,
        (true, true, true) => 8,
    };

    if modifier_code == 0 {
        if app_cursor {
            vec![0x1b, b'O', letter]
        } else {
            vec![0x1b, b'[', letter]
        }
    } else {
        format!("\x1b[1;{modifier_code}{}", letter as char).into_bytes()
    }
}
