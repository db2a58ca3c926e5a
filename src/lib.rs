//! Editor mode inference and antipattern detection over captured Vim
//! keystrokes.
//!
//! A capture is decoded into [`Key`]s, each key is attributed the mode it
//! was typed in by the [`Engine`], and the resulting [`KeyEvent`]s feed a
//! frequency tally and an antipattern detector in the same pass:
//!
//! ```
//! use vim_keystats::{AnalyzerConfig, analyze_bytes};
//!
//! let report = analyze_bytes(b"jjjiabc\x1b", &AnalyzerConfig::default());
//! assert_eq!(report.total_events, 8);
//! assert_eq!(report.antipatterns["jjj+"].occurrences, 1);
//! ```
//!
//! # Mode inference
//!
//! No mode signal exists in a raw capture, so modes are guessed from the
//! keys. For each key the first matching rule applies:
//!
//! | key                     | condition                         | effect                          |
//! |-------------------------|-----------------------------------|---------------------------------|
//! | `<Esc>`, `<C-c>`        | no find motion pending            | Normal                          |
//! | `<CR>`                  | Command                           | Normal                          |
//! | anything                | search query open                 | none                            |
//! | anything                | find motion pending               | consumed as its argument        |
//! | `/` `?`                 | Normal, Visual                    | search query opens              |
//! | `t`                     | Command after `l`                 | Terminal                        |
//! | `t`                     | Normal, Visual                    | find motion pending             |
//! | `i` `I` `a` `A`         | Normal, not after `d`/`c`         | Insert                          |
//! | `o` `O` `C` `s` `S`     | Normal                            | Insert                          |
//! | `c`                     | Normal after `c`                  | Insert                          |
//! | `:`                     | Normal, Visual                    | Command                         |
//! | `v` `V` `<C-v>`         | Normal / Visual                   | toggles Visual                  |
//! | `d` `D` `p` `P` `y` `Y` | Visual                            | Normal                          |
//!
//! `<Esc>`, `<C-c>` and `<CR>` also close any query or pending motion.

pub mod analyze;
pub mod antipattern;
pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod key;
pub mod record;
pub mod tally;
pub mod types;

pub use crate::analyze::{Analyzer, AntipatternSummary, Report, analyze_bytes, analyze_records};
pub use crate::antipattern::{AntipatternDetector, AntipatternRecord};
pub use crate::config::{AnalyzerConfig, AnalyzerConfigBuilder, MAX_REPEAT_THRESHOLD, RepeatThresholds};
pub use crate::decode::{Decoded, StreamDecoder, Tokens, decode};
pub use crate::engine::{Engine, EngineBuilder, EngineSnapshot, EngineState};
pub use crate::error::{ConfigError, RecordError};
pub use crate::key::{Key, KeyCode, Modifiers};
pub use crate::record::KeyRecord;
pub use crate::tally::FrequencyTally;
pub use crate::types::{KeyEvent, Mode, ModeLabel, ModeSet};
