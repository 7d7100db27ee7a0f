//! L3: the OSC pattern-matching mini-language, including the `#`/`B`
//! numeric and boolean wildcard extensions documented in spec §4.3.1.
//!
//! Grounded on `original_source/cosc.c`'s `cosc_pattern_match` /
//! `cosc_charset_match` / `cosc_stringset_match` / `cosc_signature_match`,
//! translated to safe slice scanning. One deliberate divergence: an empty
//! `[]` character set matches nothing, per spec §4.3.1's prose (the
//! original's `cosc_charset_match` appears to treat an empty set as
//! matching any character, which spec §9 calls out as a likely bug).

use crate::atom;
use crate::error::{OscError, Result};
use crate::value::OscType;

/// Matches `input` against `pattern`, applying the `#`/`B` type-tag
/// extensions only when `is_typetag` is set (an address never has a `,`
/// prefix; a type tag always does).
pub fn match_pattern(input: &[u8], pattern: &[u8]) -> bool {
    let is_typetag = input.first() == Some(&b',') || pattern.first() == Some(&b',');

    let mut s = if input.first() == Some(&b',') { 1 } else { 0 };
    let mut p = if pattern.first() == Some(&b',') { 1 } else { 0 };

    while s < input.len() && input[s] != 0 && p < pattern.len() && pattern[p] != 0 {
        if is_typetag && (input[s] == b'[' || input[s] == b']') {
            s += 1;
            continue;
        }

        match pattern[p] {
            b'?' => {
                p += 1;
                s += 1;
            }
            b'#' => {
                let ok = if is_typetag {
                    OscType::is_numeric_tag(input[s] as char)
                } else {
                    input[s].is_ascii_digit()
                };
                if !ok {
                    return false;
                }
                p += 1;
                s += 1;
            }
            b'B' => {
                if !is_typetag || !OscType::is_bool_tag(input[s] as char) {
                    return false;
                }
                p += 1;
                s += 1;
            }
            b'*' => {
                while p < pattern.len() && pattern[p] == b'*' {
                    p += 1;
                }
                if p >= pattern.len() || pattern[p] == 0 {
                    return true;
                }
                while s < input.len() && input[s] != 0 && input[s] != pattern[p] {
                    s += 1;
                }
                if s >= input.len() || input[s] != pattern[p] {
                    return false;
                }
                p += 1;
                s += 1;
            }
            b'[' => {
                let Some(plen) = charset_match(Some(input[s]), &pattern[p..]) else {
                    return false;
                };
                s += 1;
                p += plen;
            }
            b'{' => {
                let Some((plen, slen)) = stringset_match(&input[s..], &pattern[p..]) else {
                    return false;
                };
                s += slen;
                p += plen;
            }
            c if c == input[s] => {
                p += 1;
                s += 1;
            }
            _ => return false,
        }
    }

    if is_typetag && s < input.len() && input[s] == b']' {
        s += 1;
    }

    // Trailing pattern must be satisfiable against an empty remainder.
    while p < pattern.len() && pattern[p] != 0 {
        match pattern[p] {
            b'*' => p += 1,
            b'[' => match charset_match(None, &pattern[p..]) {
                Some(plen) => p += plen,
                None => return false,
            },
            b'{' => match stringset_match(&[], &pattern[p..]) {
                Some((plen, _)) => p += plen,
                None => return false,
            },
            _ => return false,
        }
    }

    let matched = (s >= input.len() || input[s] == 0) && (p >= pattern.len() || pattern[p] == 0);
    if !matched {
        log::trace!("pattern match failed: trailing pattern or input left unconsumed");
    }
    matched
}

/// Matches a single `character` (`None` for an exhausted input) against a
/// `[...]` character set starting at `set[0]`. Returns how many pattern
/// bytes the set consumed, or `None` on mismatch or a malformed set.
fn charset_match(character: Option<u8>, set: &[u8]) -> Option<usize> {
    if set.len() < 2 || set[0] != b'[' {
        return None;
    }
    let mut i = 1;
    let mut found = false;
    while i < set.len() && set[i] != 0 && set[i] != b']' {
        if Some(set[i]) == character {
            found = true;
        }
        i += 1;
    }
    if i < set.len() && set[i] == b']' {
        let empty = i == 1;
        if found && !empty {
            return Some(i + 1);
        }
        return None;
    }
    None
}

/// Matches `input` against a `{a,b,c}` alternative list starting at
/// `set[0]`. Returns (pattern bytes consumed, input bytes consumed) on a
/// match.
fn stringset_match(input: &[u8], set: &[u8]) -> Option<(usize, usize)> {
    if set.len() < 2 || set[0] != b'{' {
        return None;
    }
    let mut i = 1;
    while i < set.len() && set[i] != 0 && set[i] != b'}' {
        let start = i;
        while i < set.len() && set[i] != 0 && set[i] != b'}' && set[i] != b',' {
            i += 1;
        }
        let alt = &set[start..i];
        if input.starts_with(alt) {
            while i < set.len() && set[i] != 0 && set[i] != b'}' {
                i += 1;
            }
            if i < set.len() && set[i] == b'}' {
                return Some((i + 1, alt.len()));
            }
            return None;
        }
        i += 1;
    }
    if i < set.len() && set[i] == b'}' {
        Some((i + 1, 0))
    } else {
        None
    }
}

/// Reads a (possibly length-prefixed) signature out of `buffer` and matches
/// its address against `addr_pattern` and its type tag against
/// `type_pattern`. Both must match for the signature to match.
pub fn match_signature(
    buffer: &[u8],
    prefixed: bool,
    addr_pattern: &[u8],
    type_pattern: &[u8],
) -> Result<bool> {
    let body = if prefixed {
        if buffer.len() < 12 {
            return Err(OscError::Overrun {
                needed: 12,
                available: buffer.len(),
            });
        }
        let (prefix, _) = atom::decode_i32(buffer)?;
        if prefix < 8 || prefix as i64 > (atom::SIZE_MAX as i64 - 8) || prefix % 4 != 0 {
            log::trace!("rejected signature prefix {prefix}");
            return Err(OscError::PacketSize {
                size: prefix as i64,
            });
        }
        &buffer[4..]
    } else {
        if buffer.len() < 8 {
            return Err(OscError::Overrun {
                needed: 8,
                available: buffer.len(),
            });
        }
        buffer
    };

    let (address, addr_len) = atom::decode_string(body)?;
    let type_tag = &body[addr_len..];

    Ok(match_pattern(address.as_bytes(), addr_pattern)
        && match_pattern(strip_trailing_nuls(type_tag), type_pattern))
}

fn strip_trailing_nuls(buf: &[u8]) -> &[u8] {
    match buf.iter().position(|&b| b == 0) {
        Some(i) => &buf[..i],
        None => buf,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(a: &str, b: &str) -> bool {
        match_pattern(a.as_bytes(), b.as_bytes())
    }

    #[test]
    fn literal_match() {
        assert!(m("/hello/world", "/hello/world"));
    }

    #[test]
    fn question_mark_wildcard() {
        assert!(m("/hello/world", "/hell?/wo?ld"));
    }

    #[test]
    fn character_set() {
        assert!(m("/hello/world", "/hell[xoy]/world"));
    }

    #[test]
    fn string_set() {
        assert!(m("/hello/world", "/hello/{abc,world,xyz}"));
    }

    #[test]
    fn star_wildcard() {
        assert!(m("/hello/world", "/hello/*"));
    }

    #[test]
    fn numeric_typetag_wildcard() {
        assert!(m(",if", ",##"));
    }

    #[test]
    fn empty_charset_matches_nothing() {
        assert!(!m("/a", "/[]"));
    }

    #[test]
    fn mismatched_literal_fails() {
        assert!(!m("/hello/world", "/hello/there"));
    }
}
