//! L3: address, type-tag, and pattern character-class validators.
//!
//! Grounded on `original_source/cosc.c`'s `cosc_address_validate` /
//! `cosc_typetag_validate` / `cosc_pattern_validate`.

/// True if `c` may appear in an OSC address (any byte above the space
/// character except the reserved OSC metacharacters).
pub fn is_address_char(c: u8) -> bool {
    !matches!(c, 0..=0x20 | b'#' | b'*' | b',' | b'?' | b'[' | b']' | b'{' | b'}')
}

/// True if `c` is one of the 15 OSC type-tag letters (not counting the
/// array brackets, which are accepted in a type tag but are not types).
pub fn is_type_tag_char(c: u8) -> bool {
    matches!(
        c,
        b'i' | b'r' | b'f' | b'c' | b'm' | b'h' | b't' | b'd' | b's' | b'S' | b'b' | b'T' | b'F'
            | b'N' | b'I'
    )
}

/// True if `c` may appear in a pattern: any address-valid character, plus
/// the OSC metacharacters and this implementation's `#`/`B` extensions.
pub fn is_pattern_char(c: u8) -> bool {
    is_address_char(c) || matches!(c, b'*' | b'?' | b'[' | b']' | b'{' | b'}' | b'#' | b'B')
}

/// Validates an address: every byte up to the first NUL (or `s.len()`)
/// must be address-valid. Returns the offset of the first bad byte.
pub fn validate_address(s: &[u8]) -> Result<(), usize> {
    validate_run(s, is_address_char)
}

/// Validates a pattern using the pattern character class. Brackets and
/// braces must additionally be balanced and not nested.
pub fn validate_pattern(s: &[u8]) -> Result<(), usize> {
    validate_bracketed_run(s, is_pattern_char)
}

fn validate_run(s: &[u8], valid: impl Fn(u8) -> bool) -> Result<(), usize> {
    for (i, &b) in s.iter().enumerate() {
        if b == 0 {
            break;
        }
        if !valid(b) {
            log::trace!("rejected byte {b:#04x} at offset {i}");
            return Err(i);
        }
    }
    Ok(())
}

fn validate_bracketed_run(s: &[u8], valid: impl Fn(u8) -> bool) -> Result<(), usize> {
    let mut open: u8 = 0;
    for (i, &b) in s.iter().enumerate() {
        if b == 0 {
            break;
        }
        if !valid(b) {
            log::trace!("rejected byte {b:#04x} at offset {i}");
            return Err(i);
        }
        match b {
            b'[' | b'{' => {
                if open != 0 {
                    log::trace!("nested bracket {} at offset {i}", b as char);
                    return Err(i);
                }
                open = b;
            }
            b']' | b'}' => {
                let expected = if b == b']' { b'[' } else { b'{' };
                if open != expected {
                    log::trace!("mismatched closing bracket {} at offset {i}", b as char);
                    return Err(i);
                }
                open = 0;
            }
            _ => {}
        }
    }
    if open != 0 {
        log::trace!("unclosed bracket {} in run of {} bytes", open as char, s.len());
        return Err(s.iter().position(|&b| b == 0).unwrap_or(s.len()));
    }
    Ok(())
}

/// Validates a type tag string: must start with `,`, contain only
/// type-tag-valid characters plus array brackets, with at most one level
/// of bracket nesting and no unclosed `[`.
pub fn validate_type_tag(s: &[u8]) -> Result<(), usize> {
    if s.is_empty() || s[0] != b',' {
        log::trace!("type tag missing leading comma");
        return Err(0);
    }
    let mut in_array = false;
    for (i, &b) in s[1..].iter().enumerate() {
        let i = i + 1;
        if b == 0 {
            break;
        }
        match b {
            b'[' => {
                if in_array {
                    log::trace!("nested array bracket at offset {i}");
                    return Err(i);
                }
                in_array = true;
            }
            b']' => {
                if !in_array {
                    log::trace!("unmatched ']' at offset {i}");
                    return Err(i);
                }
                in_array = false;
            }
            c if is_type_tag_char(c) => {}
            _ => {
                log::trace!("invalid type-tag byte {b:#04x} at offset {i}");
                return Err(i);
            }
        }
    }
    if in_array {
        log::trace!("unclosed array in type tag");
        return Err(s.iter().position(|&b| b == 0).unwrap_or(s.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_rejects_reserved_metacharacters_at_their_offset() {
        assert_eq!(validate_address(b"/he#llo/world").unwrap_err(), 3);
    }

    #[test]
    fn address_accepts_ordinary_path() {
        assert_eq!(validate_address(b"/hello/world"), Ok(()));
    }

    #[test]
    fn type_tag_requires_leading_comma() {
        assert_eq!(validate_type_tag(b"if").unwrap_err(), 0);
    }

    #[test]
    fn type_tag_rejects_nested_arrays() {
        assert_eq!(validate_type_tag(b",[i[f]]").unwrap_err(), 3);
    }

    #[test]
    fn type_tag_rejects_unclosed_array() {
        assert!(validate_type_tag(b",[if").is_err());
    }

    #[test]
    fn pattern_allows_brackets_and_braces_unnested() {
        assert_eq!(validate_pattern(b"/hell[xoy]/{a,b}"), Ok(()));
    }
}
