//! Key-Space Codec
//!
//! How logical names map onto the store's flat keyspace, and how application
//! values become wire byte strings.
//!
//! ## Physical keys
//! ```text
//! Dictionary field   {collection}:{field}     e.g. "users:ann"
//! Everything else    {collection}             e.g. "jobs"
//! ```
//! The separator is wire-visible: any other process reading the same store
//! must derive keys the same way. Dictionary field keys also collide with any
//! external key of the same name, so collection names must not be reused
//! across adapter types.

use bytes::Bytes;

/// Separator between a dictionary's collection key and a field name
pub const FIELD_SEPARATOR: char = ':';

/// Physical key for a dictionary field
pub fn field_key(collection: &str, field: &str) -> String {
    format!("{}{}{}", collection, FIELD_SEPARATOR, field)
}

/// Scan pattern covering the dictionary fields matched by `pattern`
///
/// The collection part is matched literally; only `pattern` is a glob.
pub fn field_pattern(collection: &str, pattern: &str) -> String {
    field_key(&escape_pattern(collection), pattern)
}

/// Escape the glob metacharacters `* ? [ ] \` so `text` matches only itself
pub fn escape_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Value Encoding
// =============================================================================

/// Conversion of an application value into the store's byte-string form
///
/// Only byte-level encoding happens here. Structured values must be
/// serialized by the caller first.
pub trait IntoValue {
    fn into_value(self) -> Bytes;
}

impl IntoValue for Bytes {
    fn into_value(self) -> Bytes {
        self
    }
}

impl IntoValue for &Bytes {
    fn into_value(self) -> Bytes {
        self.clone()
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Bytes {
        Bytes::from(self)
    }
}

impl IntoValue for &Vec<u8> {
    fn into_value(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl IntoValue for &[u8] {
    fn into_value(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> IntoValue for &[u8; N] {
    fn into_value(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Bytes {
        Bytes::from(self)
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

// Integers travel as decimal text, the store's native integer form
macro_rules! decimal_into_value {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Bytes {
                    Bytes::from(self.to_string())
                }
            }
        )*
    };
}

decimal_into_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// =============================================================================
// Pattern Matching
// =============================================================================

/// Glob match as used by the store's scan `MATCH` option
///
/// Supports `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and `\` escapes.
pub fn pattern_matches(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Position to resume from after the most recent `*`
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    star = Some((p, t));
                    p += 1;
                    continue;
                }
                b'?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                b'[' => match match_class(pattern, p, text[t]) {
                    Some((true, next)) => {
                        p = next;
                        t += 1;
                        continue;
                    }
                    Some((false, _)) => {}
                    None => {
                        if text[t] == b'[' {
                            p += 1;
                            t += 1;
                            continue;
                        }
                    }
                },
                b'\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == text[t] {
                        p += 2;
                        t += 1;
                        continue;
                    }
                }
                c => {
                    if c == text[t] {
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
            }
        }

        match star {
            Some((star_p, star_t)) => {
                p = star_p + 1;
                t = star_t + 1;
                star = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Match one byte against the class opening at `pattern[open]`
///
/// Returns whether it matched and the index after the closing `]`, or `None`
/// when the class is unterminated (then `[` is treated as a literal).
fn match_class(pattern: &[u8], open: usize, byte: u8) -> Option<(bool, usize)> {
    let mut i = open + 1;
    let negate = pattern.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    while i < pattern.len() {
        let c = pattern[i];
        if c == b']' && !first {
            return Some((matched != negate, i + 1));
        }
        first = false;

        if c == b'\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == byte;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == b'-' && pattern[i + 2] != b']' {
            let (lo, hi) = (c.min(pattern[i + 2]), c.max(pattern[i + 2]));
            matched |= (lo..=hi).contains(&byte);
            i += 3;
        } else {
            matched |= c == byte;
            i += 1;
        }
    }

    None
}
