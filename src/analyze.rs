use std::collections::BTreeMap;

use serde::Serialize;

use crate::antipattern::{AntipatternDetector, AntipatternRecord};
use crate::config::AnalyzerConfig;
use crate::decode::Tokens;
use crate::engine::Engine;
use crate::key::Key;
use crate::record::records;
use crate::tally::FrequencyTally;
use crate::types::{KeyEvent, ModeLabel};

/// One analysis pass: mode inference, tallies and antipattern detection
/// advancing together over a single key stream.
///
/// Feed either raw keys through [`push_key`](Self::push_key), which infers
/// the mode, or already-attributed events through
/// [`push_event`](Self::push_event). Mixing the two in one pass is allowed
/// but the engine only sees keys pushed through `push_key`.
#[derive(Debug, Clone)]
pub struct Analyzer {
    min_occurrences: u64,
    engine: Engine,
    tally: FrequencyTally,
    detector: AntipatternDetector,
    skipped_records: u64,
}

impl Analyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            min_occurrences: config.min_occurrences,
            engine: Engine::new(),
            tally: FrequencyTally::new(config.excluded_modes, config.always_count),
            detector: AntipatternDetector::new(config.repeat_thresholds.clone()),
            skipped_records: 0,
        }
    }

    /// Infers the mode for `key` and records it.
    pub fn push_key(&mut self, key: Key) -> KeyEvent {
        let event = self.engine.handle_key(key);
        self.push_event(&event);
        event
    }

    /// Records an event whose mode is already known.
    pub fn push_event(&mut self, event: &KeyEvent) {
        self.tally.record(event);
        self.detector.observe(event);
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn finish(self) -> Report {
        let (mode_tally, key_tally, total_events, counted_events) = self.tally.into_parts();
        let report = Report {
            mode_tally,
            key_tally,
            antipatterns: self.detector.finish(),
            total_events,
            counted_events,
            skipped_records: self.skipped_records,
            min_occurrences: self.min_occurrences,
        };
        tracing::debug!(
            events = report.total_events,
            counted = report.counted_events,
            antipatterns = report.antipatterns.len(),
            skipped = report.skipped_records,
            "analysis finished"
        );
        report
    }
}

/// Decodes a raw keystroke capture and infers modes from it.
pub fn analyze_bytes(bytes: &[u8], config: &AnalyzerConfig) -> Report {
    let mut analyzer = Analyzer::new(config);
    for key in Tokens::new(bytes) {
        analyzer.push_key(key);
    }
    analyzer.finish()
}

/// Analyzes a `timestamp,mode,token` log, trusting its mode column.
///
/// Lines that do not parse are skipped and counted in
/// [`Report::skipped_records`].
pub fn analyze_records(text: &str, config: &AnalyzerConfig) -> Report {
    let mut analyzer = Analyzer::new(config);
    for (line, record) in records(text) {
        match record {
            Ok(record) => analyzer.push_event(&KeyEvent::new(record.key, record.mode)),
            Err(err) => {
                tracing::warn!(line, error = %err, "skipping keystroke record");
                analyzer.skipped_records += 1;
            }
        }
    }
    analyzer.finish()
}

/// Aggregates handed to whatever renders them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Events per mode, every event counted.
    pub mode_tally: BTreeMap<ModeLabel, u64>,
    /// Events per key, outside the excluded modes.
    pub key_tally: BTreeMap<Key, u64>,
    pub antipatterns: BTreeMap<String, AntipatternRecord>,
    pub total_events: u64,
    /// Events that reached `key_tally`.
    pub counted_events: u64,
    pub skipped_records: u64,
    pub min_occurrences: u64,
}

/// An antipattern ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AntipatternSummary {
    pub label: String,
    pub occurrences: u64,
    pub total_keypresses: u64,
    pub avg_keypresses: f64,
}

impl Report {
    /// Nothing was decoded.
    pub fn is_empty(&self) -> bool {
        self.total_events == 0
    }

    /// Percentage of all events typed in `mode`.
    pub fn mode_share(&self, mode: impl Into<ModeLabel>) -> f64 {
        let count = self.mode_tally.get(&mode.into()).copied().unwrap_or(0);
        percent(count, self.total_events)
    }

    /// Percentage of counted events that were `key`.
    pub fn key_share(&self, key: Key) -> f64 {
        let count = self.key_tally.get(&key).copied().unwrap_or(0);
        percent(count, self.counted_events)
    }

    /// The `limit` most frequent keys, ties broken by notation.
    pub fn top_keys(&self, limit: usize) -> Vec<(Key, u64)> {
        let mut keys: Vec<(Key, u64)> = self.key_tally.iter().map(|(k, n)| (*k, *n)).collect();
        keys.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));
        keys.truncate(limit);
        keys
    }

    /// Antipatterns seen at least `min_occurrences` times, most frequent
    /// first.
    pub fn reportable_antipatterns(&self) -> Vec<AntipatternSummary> {
        let mut out: Vec<AntipatternSummary> = self
            .antipatterns
            .iter()
            .filter(|(_, rec)| rec.occurrences >= self.min_occurrences)
            .map(|(label, rec)| AntipatternSummary {
                label: label.clone(),
                occurrences: rec.occurrences,
                total_keypresses: rec.total_keypresses,
                avg_keypresses: rec.avg_keypresses(),
            })
            .collect();
        out.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then_with(|| a.label.cmp(&b.label))
        });
        out
    }
}

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 * 100.0 / total as f64
}
