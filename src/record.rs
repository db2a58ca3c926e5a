//! Pre-decoded keystroke logs: one `timestamp,mode,token` line per key.
//!
//! The mode column is whatever the editor reported when the key was typed,
//! so it is taken as-is instead of being inferred. Codes are the ones
//! `mode()` returns (`n`, `i`, `v`, `no`, `niI`, ...) or full mode names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use unicode_segmentation::UnicodeSegmentation;

use crate::decode::byte_key;
use crate::error::RecordError;
use crate::key::{Key, parse_notation};
use crate::types::{Mode, ModeLabel};

/// One logged keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub timestamp: DateTime<Utc>,
    pub mode: ModeLabel,
    pub key: Key,
}

impl FromStr for KeyRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        // The token goes last so a literal `,` key survives the split.
        let mut fields = line.splitn(3, ',');
        let (Some(ts), Some(mode), Some(token)) = (fields.next(), fields.next(), fields.next())
        else {
            let found = line.split(',').count();
            return Err(RecordError::MissingField(found));
        };

        Ok(Self {
            timestamp: parse_timestamp(ts)?,
            mode: parse_mode(mode),
            key: token.parse()?,
        })
    }
}

impl fmt::Display for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.timestamp.timestamp(), self.mode, self.key)
    }
}

/// Parses Unix seconds (integer or fractional) or an RFC 3339 timestamp.
pub fn parse_timestamp(field: &str) -> Result<DateTime<Utc>, RecordError> {
    let field = field.trim();
    let invalid = || RecordError::InvalidTimestamp(field.to_string());

    if let Ok(secs) = field.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).ok_or_else(invalid);
    }
    if let Ok(secs) = field.parse::<f64>() {
        if !secs.is_finite() {
            return Err(invalid());
        }
        let whole = secs.floor();
        let nanos = (((secs - whole) * 1e9) as u32).min(999_999_999);
        return DateTime::from_timestamp(whole as i64, nanos).ok_or_else(invalid);
    }
    DateTime::parse_from_rfc3339(field)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid())
}

/// Maps an editor mode code or name to a mode; unknown codes pass through.
pub fn parse_mode(field: &str) -> ModeLabel {
    let code = field.trim();
    if let Some(mode) = Mode::from_name(code) {
        return mode.into();
    }

    let mode = match code {
        "^V" | "^S" | "CTRL-V" | "CTRL-S" => Some(Mode::Visual),
        _ => match code.chars().next() {
            Some('n') => Some(Mode::Normal),
            Some('i' | 'R') => Some(Mode::Insert),
            Some('c') => Some(Mode::Command),
            Some('v' | 'V' | '\u{16}' | 's' | 'S' | '\u{13}') => Some(Mode::Visual),
            Some('t') => Some(Mode::Terminal),
            _ => None,
        },
    };
    match mode {
        Some(mode) => mode.into(),
        None => ModeLabel::Raw(code.to_string()),
    }
}

/// Parses a token column: editor notation (`<Esc>`, `<C-v>`), or a single
/// character. Raw control characters map as they would from a byte stream.
impl FromStr for Key {
    type Err = RecordError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token.is_empty() {
            return Err(RecordError::EmptyToken);
        }
        if let Some(key) = parse_notation(token) {
            return Ok(key);
        }

        let mut graphemes = token.graphemes(true);
        let (Some(grapheme), None) = (graphemes.next(), graphemes.next()) else {
            return Err(RecordError::UnknownToken(token.to_string()));
        };
        let mut chars = grapheme.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Ok(byte_key(c as u8)),
            (Some(c), None) => Ok(Key::char(c)),
            _ => Err(RecordError::UnknownToken(token.to_string())),
        }
    }
}

/// Iterates over the non-blank lines of a log, paired with 1-based line
/// numbers.
pub fn records(text: &str) -> impl Iterator<Item = (usize, Result<KeyRecord, RecordError>)> + '_ {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.parse()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_line() {
        let rec: KeyRecord = "1700000000,n,j".parse().unwrap();
        assert_eq!(rec.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(rec.mode, ModeLabel::Known(Mode::Normal));
        assert_eq!(rec.key, Key::char('j'));
    }

    #[test]
    fn comma_token_survives_split() {
        let rec: KeyRecord = "1,n,,".parse().unwrap();
        assert_eq!(rec.key, Key::char(','));
    }

    #[test]
    fn space_and_notation_tokens() {
        assert_eq!("1,i, ".parse::<KeyRecord>().unwrap().key, Key::SPACE);
        assert_eq!("1,i,<Esc>".parse::<KeyRecord>().unwrap().key, Key::ESC);
        assert_eq!("1,n,<C-v>".parse::<KeyRecord>().unwrap().key, Key::ctrl('v'));
        assert_eq!("1,n,\u{1b}".parse::<KeyRecord>().unwrap().key, Key::ESC);
    }

    #[test]
    fn multi_codepoint_grapheme_is_unknown() {
        let err = "e\u{301}".parse::<Key>().unwrap_err();
        assert_eq!(err, RecordError::UnknownToken("e\u{301}".into()));
        assert_eq!("é".parse::<Key>().unwrap(), Key::char('é'));
    }

    #[test]
    fn fractional_and_rfc3339_timestamps() {
        let ts = parse_timestamp("1700000000.5").unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);

        let ts = parse_timestamp("2023-11-14T22:13:20Z").unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);

        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(RecordError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn mode_codes() {
        assert_eq!(parse_mode("n"), Mode::Normal);
        assert_eq!(parse_mode("no"), Mode::Normal);
        assert_eq!(parse_mode("niI"), Mode::Normal);
        assert_eq!(parse_mode("i"), Mode::Insert);
        assert_eq!(parse_mode("Rv"), Mode::Insert);
        assert_eq!(parse_mode("c"), Mode::Command);
        assert_eq!(parse_mode("V"), Mode::Visual);
        assert_eq!(parse_mode("\u{16}"), Mode::Visual);
        assert_eq!(parse_mode("^V"), Mode::Visual);
        assert_eq!(parse_mode("t"), Mode::Terminal);
        assert_eq!(parse_mode("Insert"), Mode::Insert);
        assert_eq!(parse_mode("r?"), ModeLabel::Raw("r?".into()));
        assert_eq!(parse_mode("!"), ModeLabel::Raw("!".into()));
    }

    #[test]
    fn missing_fields() {
        assert_eq!(
            "1700000000,n".parse::<KeyRecord>(),
            Err(RecordError::MissingField(2))
        );
        assert_eq!("1,n,".parse::<KeyRecord>(), Err(RecordError::EmptyToken));
    }

    #[test]
    fn display_round_trips() {
        for line in ["1700000000,normal,j", "5,insert,<CR>", "7,r?,<M-x>"] {
            let rec: KeyRecord = line.parse().unwrap();
            assert_eq!(rec.to_string(), line);
        }
    }

    #[test]
    fn records_skip_blank_lines_and_number_from_one() {
        let parsed: Vec<_> = records("1,n,j\n\n2,n,k\n").collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].0, 1);
        assert_eq!(parsed[1].0, 3);
    }
}
