use vim_keystats::{Engine, Key, KeyEvent, Mode};

/// Every char of `s` as an unmodified key.
pub fn keys(s: &str) -> Vec<Key> {
    s.chars().map(Key::char).collect()
}

/// Feeds `keys` to a fresh engine and returns the events it emitted.
pub fn run(keys: &[Key]) -> (Engine, Vec<KeyEvent>) {
    let mut eng = Engine::new();
    let events = keys.iter().map(|k| eng.handle_key(*k)).collect();
    (eng, events)
}

/// Mode after typing `s` from Normal.
pub fn mode_after(s: &str) -> Mode {
    run(&keys(s)).0.mode()
}

/// The mode each key of `s` was typed in.
pub fn modes_of(s: &str) -> Vec<Mode> {
    run(&keys(s))
        .1
        .into_iter()
        .map(|e| e.mode.known().expect("inferred modes are always known"))
        .collect()
}
