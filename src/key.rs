use std::fmt;

use serde::{Serialize, Serializer};

/// Key codes representing individual decoded keystrokes.
///
/// Control+letter is not a separate code: it is `Char(letter)` carrying
/// [`Modifiers::CTRL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCode {
    /// A literal character key.
    Char(char),
    /// The Escape key, used to exit modes and cancel operations.
    Esc,
    /// Carriage return.
    Enter,
    Tab,
    /// The Backspace key (BS or DEL byte).
    Backspace,
    Space,
    /// The NUL byte, sent by `<C-@>` / `<C-Space>`.
    Nul,
    /// Backspace recovered from the capture marker sequence.
    ExplicitBackspace,
}

bitflags::bitflags! {
    /// Keyboard modifier flags.
    ///
    /// These can be combined to represent multiple modifiers held simultaneously.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Modifiers: u8 {
        const CTRL = 0b0001;
        const META = 0b0010;
    }
}

/// A single decoded keystroke: a key code plus any modifiers held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    /// The key that was pressed.
    pub code: KeyCode,
    /// Modifier keys held during the key press.
    pub mods: Modifiers,
}

impl Key {
    pub const ESC: Key = Key::plain(KeyCode::Esc);
    pub const ENTER: Key = Key::plain(KeyCode::Enter);
    pub const TAB: Key = Key::plain(KeyCode::Tab);
    pub const BACKSPACE: Key = Key::plain(KeyCode::Backspace);
    pub const SPACE: Key = Key::plain(KeyCode::Space);
    pub const NUL: Key = Key::plain(KeyCode::Nul);
    pub const EXPLICIT_BACKSPACE: Key = Key::plain(KeyCode::ExplicitBackspace);

    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            mods: Modifiers::empty(),
        }
    }

    /// An unmodified character key.
    pub const fn char(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    /// A control+character key, e.g. `Key::ctrl('v')` for `<C-v>`.
    pub const fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            mods: Modifiers::CTRL,
        }
    }

    /// Returns the same key with `META` added.
    pub fn with_meta(self) -> Self {
        Self {
            code: self.code,
            mods: self.mods | Modifiers::META,
        }
    }

    /// True when this is exactly the unmodified character `c`.
    pub fn is_char(&self, c: char) -> bool {
        self.mods.is_empty() && self.code == KeyCode::Char(c)
    }

    /// The character of an unmodified character key.
    pub fn as_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) if self.mods.is_empty() => Some(c),
            _ => None,
        }
    }

    /// Escape or `<C-c>`: both abandon whatever the editor was doing.
    pub fn is_interrupt(&self) -> bool {
        *self == Key::ESC || *self == Key::ctrl('c')
    }

    fn named(&self) -> Option<&'static str> {
        match self.code {
            KeyCode::Char(_) => None,
            KeyCode::Esc => Some("Esc"),
            KeyCode::Enter => Some("CR"),
            KeyCode::Tab => Some("Tab"),
            KeyCode::Backspace => Some("BS"),
            KeyCode::Space => Some("Space"),
            KeyCode::Nul => Some("Nul"),
            KeyCode::ExplicitBackspace => Some("kBS"),
        }
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Key::char(c)
    }
}

/// Keys display in editor notation: plain characters verbatim, everything
/// else in angle brackets (`<Esc>`, `<C-v>`, `<M-x>`, `<M-C-a>`).
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(c) = self.as_char() {
            return write!(f, "{c}");
        }
        f.write_str("<")?;
        if self.mods.contains(Modifiers::META) {
            f.write_str("M-")?;
        }
        if self.mods.contains(Modifiers::CTRL) {
            f.write_str("C-")?;
        }
        match (self.code, self.named()) {
            (KeyCode::Char(c), _) => write!(f, "{c}")?,
            (_, Some(name)) => f.write_str(name)?,
            (_, None) => {}
        }
        f.write_str(">")
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parses the angle-bracket notation produced by `Display`.
///
/// Returns `None` for anything that is not a recognised `<...>` form.
pub(crate) fn parse_notation(s: &str) -> Option<Key> {
    let inner = s.strip_prefix('<')?.strip_suffix('>')?;
    let mut mods = Modifiers::empty();
    let mut rest = inner;
    loop {
        if let Some(r) = strip_prefix_ignore_case(rest, "M-") {
            mods |= Modifiers::META;
            rest = r;
        } else if let Some(r) = strip_prefix_ignore_case(rest, "C-") {
            mods |= Modifiers::CTRL;
            rest = r;
        } else {
            break;
        }
    }

    let code = match rest.to_ascii_lowercase().as_str() {
        "esc" => KeyCode::Esc,
        "cr" | "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "bs" => KeyCode::Backspace,
        "space" => KeyCode::Space,
        "nul" => KeyCode::Nul,
        "kbs" => KeyCode::ExplicitBackspace,
        _ => {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if !mods.is_empty() => KeyCode::Char(c),
                _ => return None,
            }
        }
    };
    Some(Key { code, mods })
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    // A bare "<M->" or "<C->" means the key is '-' itself, not a prefix.
    if head.eq_ignore_ascii_case(prefix) && s.len() > prefix.len() {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}
