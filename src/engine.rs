use crate::key::Key;
use crate::types::{KeyEvent, Mode};

/// Keys that enter insert mode unless they complete an operator (`di`, `ca`).
const INSERT_ENTRY: [char; 4] = ['i', 'I', 'a', 'A'];
/// Operators whose text-object argument starts with `i` or `a`.
const TEXT_OBJECT_OPERATORS: [char; 2] = ['d', 'c'];
const INSERT_COMMANDS: [char; 5] = ['o', 'O', 'C', 's', 'S'];
/// Visual-mode operators that end the selection.
const VISUAL_OPERATORS: [char; 6] = ['d', 'D', 'p', 'P', 'y', 'Y'];

/// Everything the mode inference carries from one key to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineState {
    pub mode: Mode,
    pub previous_key: Option<Key>,
    /// A `/` or `?` query is being typed.
    pub search_active: bool,
    /// The next key is the argument of a find-character motion.
    pub motion_pending: bool,
}

impl EngineState {
    /// Applies one key. Returns the next state and the mode the key was
    /// typed in.
    ///
    /// Rules are tried in priority order and the first match wins; see the
    /// crate docs for the table.
    pub fn step(self, key: &Key) -> (EngineState, Mode) {
        let before = self.mode;
        let mut next = self;
        next.apply(key);
        next.previous_key = Some(*key);
        (next, before)
    }

    fn previous_is(&self, c: char) -> bool {
        self.previous_key.is_some_and(|k| k.is_char(c))
    }

    fn apply(&mut self, key: &Key) {
        if key.is_interrupt() {
            if !self.motion_pending {
                self.mode = Mode::Normal;
            }
            self.search_active = false;
            self.motion_pending = false;
            return;
        }

        if *key == Key::ENTER {
            if self.mode == Mode::Command {
                self.mode = Mode::Normal;
            }
            self.search_active = false;
            self.motion_pending = false;
            return;
        }

        // Query text, until Esc or CR ends it.
        if self.search_active {
            return;
        }

        // Argument of `t{char}`.
        if self.motion_pending {
            self.motion_pending = false;
            return;
        }

        let normal = self.mode == Mode::Normal;
        let visual = self.mode == Mode::Visual;

        if *key == Key::ctrl('v') {
            self.toggle_visual();
            return;
        }

        let Some(c) = key.as_char() else {
            return;
        };

        match c {
            '/' | '?' if normal || visual => self.search_active = true,
            't' if self.mode == Mode::Command && self.previous_is('l') => {
                self.mode = Mode::Terminal;
            }
            't' if normal || visual => self.motion_pending = true,
            c if normal
                && INSERT_ENTRY.contains(&c)
                && !TEXT_OBJECT_OPERATORS.iter().any(|&op| self.previous_is(op)) =>
            {
                self.mode = Mode::Insert;
            }
            c if normal && INSERT_COMMANDS.contains(&c) => self.mode = Mode::Insert,
            'c' if normal && self.previous_is('c') => self.mode = Mode::Insert,
            ':' if normal || visual => self.mode = Mode::Command,
            'v' | 'V' => self.toggle_visual(),
            c if visual && VISUAL_OPERATORS.contains(&c) => self.mode = Mode::Normal,
            _ => {}
        }
    }

    fn toggle_visual(&mut self) {
        match self.mode {
            Mode::Normal => self.mode = Mode::Visual,
            Mode::Visual => self.mode = Mode::Normal,
            _ => {}
        }
    }
}

/// Infers editor modes from a key stream.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    state: EngineState,
}

#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub mode: Mode,
    pub search_active: bool,
    pub motion_pending: bool,
}

#[derive(Default)]
pub struct EngineBuilder {
    mode: Mode,
}

impl EngineBuilder {
    /// Mode assumed before the first key. Captures normally start in Normal.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            state: EngineState {
                mode: self.mode,
                ..EngineState::default()
            },
        }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            mode: self.state.mode,
            search_active: self.state.search_active,
            motion_pending: self.state.motion_pending,
        }
    }

    /// Feeds one key and returns it paired with the mode it was typed in.
    pub fn handle_key(&mut self, key: Key) -> KeyEvent {
        let (next, before) = self.state.step(&key);
        if next.mode != before {
            tracing::trace!(%key, from = %before, to = %next.mode, "mode transition");
        }
        self.state = next;
        KeyEvent::new(key, before)
    }
}
