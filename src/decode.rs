//! Raw keystroke bytes to [`Key`] tokens.
//!
//! Every byte maps to exactly one key through a fixed table, except for one
//! capture artifact: keys the recorder could not represent arrive behind the
//! UTF-8 replacement character (`EF BF BD`). That marker followed by a BS
//! byte is a backspace the editor saw explicitly; followed by `kb` it tags
//! the next key as meta-modified. Any other continuation is not a composite
//! and every buffered byte decodes on its own.
//!
//! Decoding is total: bytes left dangling at the end of input are flushed as
//! ordinary single-byte keys.

use crate::key::Key;

/// UTF-8 encoding of U+FFFD.
const MARKER: &[u8] = &[0xEF, 0xBF, 0xBD];
const MARKER_BACKSPACE: u8 = 0x08;
const MARKER_META: &[u8] = b"kb";
/// One complete `MARKER kb` meta prefix.
const META_PREFIX_LEN: usize = 5;

/// Result of trying to decode one key from the front of a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A key, consuming `usize` bytes.
    Complete(Key, usize),
    /// The bytes are a prefix of a composite; more input is needed.
    Incomplete,
}

/// Maps one byte to its key, ignoring composites.
pub fn byte_key(byte: u8) -> Key {
    match byte {
        0x00 => Key::NUL,
        0x08 | 0x7F => Key::BACKSPACE,
        0x09 => Key::TAB,
        0x0D => Key::ENTER,
        0x1B => Key::ESC,
        b @ 0x01..=0x1A => Key::ctrl((b'a' + b - 1) as char),
        b @ 0x1C..=0x1F => Key::ctrl((b'\\' + b - 0x1C) as char),
        0x20 => Key::SPACE,
        b => Key::char(b as char),
    }
}

/// Length of the run of complete meta prefixes at the front of `bytes`.
fn meta_prefix_len(bytes: &[u8]) -> usize {
    let mut len = 0;
    while bytes[len..].starts_with(MARKER) && bytes[len + MARKER.len()..].starts_with(MARKER_META) {
        len += META_PREFIX_LEN;
    }
    len
}

/// Decodes one key that is not behind a meta prefix.
///
/// Callers strip complete meta prefixes first, so a marker followed by
/// `kb` never reaches here; a marker followed by a lone `k` is waiting for
/// its `b`.
fn decode_base(bytes: &[u8]) -> Decoded {
    let Some(&first) = bytes.first() else {
        return Decoded::Incomplete;
    };

    let head = &bytes[..bytes.len().min(MARKER.len())];
    if !MARKER.starts_with(head) {
        return Decoded::Complete(byte_key(first), 1);
    }
    if head.len() < MARKER.len() {
        return Decoded::Incomplete;
    }

    match bytes.get(MARKER.len()) {
        None => Decoded::Incomplete,
        Some(&MARKER_BACKSPACE) => Decoded::Complete(Key::EXPLICIT_BACKSPACE, MARKER.len() + 1),
        Some(&b) if b == MARKER_META[0] && bytes.len() == MARKER.len() + 1 => Decoded::Incomplete,
        // Not a composite: the marker's first byte stands alone.
        Some(_) => Decoded::Complete(byte_key(first), 1),
    }
}

/// Decodes one key from the front of `bytes`.
///
/// Any number of stacked meta prefixes collapse into a single meta flag on
/// the key that follows them. An empty slice is `Incomplete`.
pub fn decode_next(bytes: &[u8]) -> Decoded {
    let prefix = meta_prefix_len(bytes);
    match decode_base(&bytes[prefix..]) {
        Decoded::Complete(key, n) if prefix > 0 => Decoded::Complete(key.with_meta(), prefix + n),
        decoded => decoded,
    }
}

/// Iterator over the keys of a complete byte buffer.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Set once the tail turned out to be a truncated composite.
    truncated: bool,
}

impl<'a> Tokens<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            truncated: false,
        }
    }
}

impl Iterator for Tokens<'_> {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        let rest = &self.bytes[self.pos..];
        let &first = rest.first()?;
        if !self.truncated {
            match decode_next(rest) {
                Decoded::Complete(key, n) => {
                    self.pos += n;
                    return Some(key);
                }
                Decoded::Incomplete => {
                    // The whole buffer is here, so everything left is one
                    // dangling composite. Emit it byte by byte.
                    tracing::trace!(offset = self.pos, len = rest.len(), "flushing truncated composite");
                    self.truncated = true;
                }
            }
        }
        self.pos += 1;
        Some(byte_key(first))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.bytes.len() - self.pos;
        (left.min(1), Some(left))
    }
}

/// Decodes all keys in `bytes`.
pub fn decode(bytes: &[u8]) -> Vec<Key> {
    Tokens::new(bytes).collect()
}

/// Incremental decoder for input that arrives in chunks.
///
/// Composite prefixes that straddle a chunk boundary are held back until
/// the next [`advance`](Self::advance) or [`flush`](Self::flush). Complete
/// meta prefixes are folded into a counter as soon as they are seen, so a
/// long chain is scanned once however it is split.
#[derive(Debug, Default, Clone)]
pub struct StreamDecoder {
    buf: Vec<u8>,
    meta_prefixes: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every key it completes.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Key> {
        self.buf.extend_from_slice(data);
        let mut keys = Vec::new();
        let mut pos = 0;

        loop {
            let prefix = meta_prefix_len(&self.buf[pos..]);
            self.meta_prefixes += prefix / META_PREFIX_LEN;
            pos += prefix;

            match decode_base(&self.buf[pos..]) {
                Decoded::Complete(key, n) => {
                    let meta = std::mem::take(&mut self.meta_prefixes) > 0;
                    keys.push(if meta { key.with_meta() } else { key });
                    pos += n;
                }
                Decoded::Incomplete => break,
            }
        }

        if pos > 0 {
            self.buf.drain(..pos);
        }
        keys
    }

    /// Are there held-back bytes that might complete with more data?
    pub fn has_pending(&self) -> bool {
        self.meta_prefixes > 0 || !self.buf.is_empty()
    }

    /// Ends the stream, decoding any held-back bytes best-effort.
    pub fn flush(&mut self) -> Vec<Key> {
        let prefixes = std::mem::take(&mut self.meta_prefixes);
        let mut keys: Vec<Key> = MARKER
            .iter()
            .chain(MARKER_META)
            .map(|&b| byte_key(b))
            .cycle()
            .take(prefixes * META_PREFIX_LEN)
            .collect();
        keys.extend(decode(&self.buf));
        self.buf.clear();
        keys
    }
}
