//! Detection of inefficient key sequences.
//!
//! Two families share one table keyed by label:
//!
//! - repeat runs: the same motion key pressed past its threshold in Normal
//!   or Visual mode (`jjj` where `3j` would do), labelled `jjj+`;
//! - compound pairs: two keys with a one-key equivalent, such as `ha`
//!   (that is `i`) or `A<CR>` (that is `o`).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::config::RepeatThresholds;
use crate::key::Key;
use crate::types::{KeyEvent, Mode, ModeLabel};

/// Normal-mode pairs that a single key replaces.
const COMPOUND_PAIRS: [(char, char); 4] = [
    ('h', 'a'), // i
    ('j', 'O'), // o
    ('k', 'o'), // O
    ('l', 'i'), // a
];

/// Insert entries that are pointless when followed straight by `<CR>`.
const LINE_END_ENTRIES: [char; 2] = ['I', 'A'];

/// Occurrence counts for one antipattern label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AntipatternRecord {
    /// Number of times the pattern was flagged.
    pub occurrences: u64,
    /// Keys absorbed into all flagged occurrences.
    pub total_keypresses: u64,
}

impl AntipatternRecord {
    /// Mean keys per occurrence, `0.0` when nothing was flagged.
    pub fn avg_keypresses(&self) -> f64 {
        if self.occurrences == 0 {
            return 0.0;
        }
        self.total_keypresses as f64 / self.occurrences as f64
    }
}

impl Serialize for AntipatternRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("AntipatternRecord", 3)?;
        s.serialize_field("occurrences", &self.occurrences)?;
        s.serialize_field("total_keypresses", &self.total_keypresses)?;
        s.serialize_field("avg_keypresses", &self.avg_keypresses())?;
        s.end()
    }
}

#[derive(Debug, Clone)]
struct Run {
    key: char,
    /// Repeats after the first press.
    length: u32,
    /// Set once the run reaches its threshold.
    label: Option<String>,
}

impl Run {
    fn new(key: char) -> Self {
        Self {
            key,
            length: 0,
            label: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AntipatternDetector {
    thresholds: RepeatThresholds,
    run: Option<Run>,
    previous: Option<(Key, ModeLabel)>,
    records: BTreeMap<String, AntipatternRecord>,
}

impl AntipatternDetector {
    pub fn new(thresholds: RepeatThresholds) -> Self {
        Self {
            thresholds,
            run: None,
            previous: None,
            records: BTreeMap::new(),
        }
    }

    /// Consumes the next event of the stream.
    pub fn observe(&mut self, event: &KeyEvent) {
        match event.mode.known() {
            Some(mode) if mode.is_motion_mode() => {
                self.track_repeat(&event.key);
                if mode == Mode::Normal {
                    self.check_pair(&event.key);
                }
            }
            mode => {
                self.run = None;
                if mode == Some(Mode::Insert) {
                    self.check_insert_entry(&event.key);
                }
            }
        }
        self.previous = Some((event.key, event.mode.clone()));
    }

    pub fn records(&self) -> &BTreeMap<String, AntipatternRecord> {
        &self.records
    }

    pub fn finish(self) -> BTreeMap<String, AntipatternRecord> {
        self.records
    }

    fn track_repeat(&mut self, key: &Key) {
        let Some((c, threshold)) = key
            .as_char()
            .and_then(|c| self.thresholds.get(c).map(|t| (c, t)))
        else {
            self.run = None;
            return;
        };

        let length = match self.run.as_mut() {
            Some(run) if run.key == c => {
                run.length = run.length.saturating_add(1);
                run.length
            }
            _ => {
                self.run = Some(Run::new(c));
                return;
            }
        };

        match length.cmp(&threshold) {
            Ordering::Less => {}
            Ordering::Equal => {
                let label = repeat_label(c, threshold);
                self.register(label.clone(), u64::from(threshold) + 1);
                if let Some(run) = self.run.as_mut() {
                    run.label = Some(label);
                }
            }
            Ordering::Greater => {
                let label = self.run.as_ref().and_then(|run| run.label.as_ref());
                if let Some(record) = label.and_then(|l| self.records.get_mut(l)) {
                    record.total_keypresses += 1;
                }
            }
        }
    }

    fn check_pair(&mut self, key: &Key) {
        let Some((prev, ModeLabel::Known(Mode::Normal))) = &self.previous else {
            return;
        };
        let (Some(p), Some(c)) = (prev.as_char(), key.as_char()) else {
            return;
        };
        if COMPOUND_PAIRS.contains(&(p, c)) {
            self.register(format!("{p}{c}"), 2);
        }
    }

    fn check_insert_entry(&mut self, key: &Key) {
        if *key != Key::ENTER {
            return;
        }
        let Some((prev, prev_mode)) = &self.previous else {
            return;
        };
        // Only the first key typed after entering insert mode counts.
        if *prev_mode == Mode::Insert {
            return;
        }
        if let Some(entry) = prev.as_char()
            && LINE_END_ENTRIES.contains(&entry)
        {
            self.register(format!("{entry}{key}"), 2);
        }
    }

    fn register(&mut self, label: String, keypresses: u64) {
        tracing::debug!(pattern = %label, keypresses, "antipattern");
        let record = self.records.entry(label).or_default();
        record.occurrences += 1;
        record.total_keypresses += keypresses;
    }
}

fn repeat_label(key: char, threshold: u32) -> String {
    let mut label: String = std::iter::repeat_n(key, threshold as usize + 1).collect();
    label.push('+');
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(events: &[(char, Mode)]) -> BTreeMap<String, AntipatternRecord> {
        let mut det = AntipatternDetector::new(RepeatThresholds::default());
        for &(c, mode) in events {
            det.observe(&KeyEvent::new(Key::char(c), mode));
        }
        det.finish()
    }

    fn normal(keys: &str) -> Vec<(char, Mode)> {
        keys.chars().map(|c| (c, Mode::Normal)).collect()
    }

    #[test]
    fn labels_repeat_threshold_plus_one() {
        assert_eq!(repeat_label('h', 2), "hhh+");
        assert_eq!(repeat_label('d', 3), "dddd+");
    }

    #[test]
    fn huge_threshold_never_builds_a_label() {
        let mut thresholds = RepeatThresholds::empty();
        thresholds.set('j', u32::MAX);
        let mut det = AntipatternDetector::new(thresholds);
        for _ in 0..10_000 {
            det.observe(&KeyEvent::new(Key::char('j'), Mode::Normal));
        }
        let run = det.run.as_ref().unwrap();
        assert_eq!(run.length, 9_999);
        assert!(run.label.is_none());
        assert!(det.finish().is_empty());
    }

    #[test]
    fn run_keeps_its_label_past_the_threshold() {
        let mut det = AntipatternDetector::new(RepeatThresholds::default());
        for _ in 0..6 {
            det.observe(&KeyEvent::new(Key::char('k'), Mode::Normal));
        }
        assert_eq!(det.run.as_ref().unwrap().label.as_deref(), Some("kkk+"));
        let rec = det.records()["kkk+"];
        assert_eq!(rec.occurrences, 1);
        assert_eq!(rec.total_keypresses, 6);
    }

    #[test]
    fn below_threshold_is_not_flagged() {
        assert!(detect(&normal("jj")).is_empty());
        assert!(detect(&normal("ddd")).is_empty());
    }

    #[test]
    fn delete_uses_its_own_threshold() {
        let records = detect(&normal("ddddd"));
        let rec = records["dddd+"];
        assert_eq!(rec.occurrences, 1);
        assert_eq!(rec.total_keypresses, 5);
    }

    #[test]
    fn separate_runs_count_separately() {
        let records = detect(&normal("jjjxjjjj"));
        let rec = records["jjj+"];
        assert_eq!(rec.occurrences, 2);
        assert_eq!(rec.total_keypresses, 7);
        assert_eq!(rec.avg_keypresses(), 3.5);
    }

    #[test]
    fn leaving_motion_modes_resets_run() {
        let records = detect(&[
            ('j', Mode::Normal),
            ('j', Mode::Normal),
            ('j', Mode::Insert),
            ('j', Mode::Normal),
        ]);
        assert!(records.is_empty());
    }

    #[test]
    fn visual_runs_count() {
        let records = detect(&[('w', Mode::Visual), ('w', Mode::Visual), ('w', Mode::Visual)]);
        assert_eq!(records["www+"].occurrences, 1);
    }

    #[test]
    fn pairs_need_both_keys_in_normal() {
        assert!(detect(&[('h', Mode::Visual), ('a', Mode::Normal)]).is_empty());
        assert!(detect(&[('h', Mode::Normal), ('a', Mode::Visual)]).is_empty());
        assert_eq!(detect(&normal("jO"))["jO"].total_keypresses, 2);
        assert_eq!(detect(&normal("ko"))["ko"].occurrences, 1);
        assert_eq!(detect(&normal("li"))["li"].occurrences, 1);
    }

    #[test]
    fn append_then_enter() {
        let mut det = AntipatternDetector::new(RepeatThresholds::default());
        det.observe(&KeyEvent::new(Key::char('A'), Mode::Normal));
        det.observe(&KeyEvent::new(Key::ENTER, Mode::Insert));
        let rec = det.records()["A<CR>"];
        assert_eq!(rec.occurrences, 1);
        assert_eq!(rec.total_keypresses, 2);
    }

    #[test]
    fn enter_later_in_insert_is_fine() {
        let mut det = AntipatternDetector::new(RepeatThresholds::default());
        det.observe(&KeyEvent::new(Key::char('A'), Mode::Normal));
        det.observe(&KeyEvent::new(Key::char('x'), Mode::Insert));
        det.observe(&KeyEvent::new(Key::ENTER, Mode::Insert));
        assert!(det.finish().is_empty());
    }

    #[test]
    fn avg_of_empty_record_is_zero() {
        assert_eq!(AntipatternRecord::default().avg_keypresses(), 0.0);
    }

    #[test]
    fn record_serializes_derived_average() {
        let rec = AntipatternRecord {
            occurrences: 2,
            total_keypresses: 7,
        };
        let json = serde_json::to_value(rec).unwrap();
        assert_eq!(json["avg_keypresses"], 3.5);
    }
}
