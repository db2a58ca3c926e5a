use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::key::Key;

/// The editor mode inferred at a point in the keystroke stream.
///
/// Vim is a modal editor where the same keys perform different
/// actions depending on the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Mode {
    /// Normal mode - for navigation and operators.
    #[default]
    Normal,
    /// Insert mode - for typing text.
    Insert,
    /// Command-line mode, entered with `:`.
    Command,
    /// Visual mode, any of characterwise, linewise or blockwise.
    Visual,
    /// Terminal job mode.
    Terminal,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Normal,
        Mode::Insert,
        Mode::Command,
        Mode::Visual,
        Mode::Terminal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Insert => "insert",
            Mode::Command => "command",
            Mode::Visual => "visual",
            Mode::Terminal => "terminal",
        }
    }

    /// Looks up a full mode name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Mode> {
        Mode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }

    /// Normal and Visual are where motions are typed, so the only modes
    /// the repeat-run detector watches.
    pub fn is_motion_mode(self) -> bool {
        matches!(self, Mode::Normal | Mode::Visual)
    }

    fn flag(self) -> ModeSet {
        match self {
            Mode::Normal => ModeSet::NORMAL,
            Mode::Insert => ModeSet::INSERT,
            Mode::Command => ModeSet::COMMAND,
            Mode::Visual => ModeSet::VISUAL,
            Mode::Terminal => ModeSet::TERMINAL,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Mode::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown mode `{name}`")))
    }
}

bitflags::bitflags! {
    /// A set of modes, used for the per-key tally exclusion list.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeSet: u8 {
        const NORMAL   = 0b00001;
        const INSERT   = 0b00010;
        const COMMAND  = 0b00100;
        const VISUAL   = 0b01000;
        const TERMINAL = 0b10000;
    }
}

impl ModeSet {
    pub fn has(self, mode: Mode) -> bool {
        self.contains(mode.flag())
    }

    /// Whether a (possibly unmapped) mode label is in the set. Raw labels
    /// never are.
    pub fn has_label(self, label: &ModeLabel) -> bool {
        label.known().is_some_and(|m| self.has(m))
    }

    pub fn modes(self) -> impl Iterator<Item = Mode> {
        Mode::ALL.into_iter().filter(move |m| self.has(*m))
    }
}

impl From<Mode> for ModeSet {
    fn from(mode: Mode) -> Self {
        mode.flag()
    }
}

impl FromIterator<Mode> for ModeSet {
    fn from_iter<I: IntoIterator<Item = Mode>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ModeSet::empty(), |set, m| set | m.flag())
    }
}

/// Serialized as a list of mode names, e.g. `["insert", "command"]`.
impl Serialize for ModeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.modes())
    }
}

impl<'de> Deserialize<'de> for ModeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let modes = Vec::<Mode>::deserialize(deserializer)?;
        Ok(modes.into_iter().collect())
    }
}

/// The mode attributed to an event.
///
/// Inferred events always carry a known mode. Pre-decoded records may carry
/// a mode code this crate does not map; it is kept verbatim rather than
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModeLabel {
    Known(Mode),
    Raw(String),
}

impl ModeLabel {
    pub fn known(&self) -> Option<Mode> {
        match self {
            ModeLabel::Known(m) => Some(*m),
            ModeLabel::Raw(_) => None,
        }
    }
}

impl From<Mode> for ModeLabel {
    fn from(mode: Mode) -> Self {
        ModeLabel::Known(mode)
    }
}

impl PartialEq<Mode> for ModeLabel {
    fn eq(&self, other: &Mode) -> bool {
        self.known() == Some(*other)
    }
}

impl fmt::Display for ModeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeLabel::Known(m) => fmt::Display::fmt(m, f),
            ModeLabel::Raw(code) => f.write_str(code),
        }
    }
}

impl Serialize for ModeLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A decoded key paired with the mode in effect when it arrived, before
/// any transition the key itself causes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub mode: ModeLabel,
}

impl KeyEvent {
    pub fn new(key: Key, mode: impl Into<ModeLabel>) -> Self {
        Self {
            key,
            mode: mode.into(),
        }
    }
}
