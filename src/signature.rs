//! L4.1: message signature (address + type tag) codec, with an optional
//! back-patched length prefix for bundle-embedded messages.
//!
//! Grounded on `original_source/cosc.c`'s `cosc_write_signature` /
//! `cosc_read_signature`.

use crate::atom;
use crate::error::{OscError, Result};

/// The smallest a signature's length prefix may be: an empty address
/// (`"\0\0\0\0"`) plus the empty type tag (`",\0\0\0"`).
pub const MIN_PREFIX: i32 = 8;

fn check_prefix(psize: i32) -> Result<()> {
    if psize < MIN_PREFIX || psize as i64 > atom::SIZE_MAX as i64 - MIN_PREFIX as i64 || psize % 4 != 0 {
        return Err(OscError::PacketSize { size: psize as i64 });
    }
    Ok(())
}

/// The encoded length of a signature: the address string, the type-tag
/// string, and (if `prefixed`) a 4-byte length prefix.
pub fn signature_encoded_len(address: &str, type_tag: &str, prefixed: bool) -> usize {
    let body = atom::string_encoded_len(address) + atom::string_encoded_len(type_tag);
    if prefixed {
        4 + body
    } else {
        body
    }
}

/// Encodes a signature. When `prefixed`, the 4-byte prefix holding the
/// body's length (not counting the prefix itself) is back-patched after
/// both strings are written, matching how a streaming message level
/// reserves its length word up front and fills it in on close.
pub fn encode_signature(address: &str, type_tag: &str, prefixed: bool, buf: &mut [u8]) -> Result<usize> {
    let total = signature_encoded_len(address, type_tag, prefixed);
    if buf.len() < total {
        return Err(OscError::Overrun {
            needed: total,
            available: buf.len(),
        });
    }
    let mut req = 0;
    if prefixed {
        req += 4;
    }
    req += atom::encode_string(address, &mut buf[req..])?;
    req += atom::encode_string(type_tag, &mut buf[req..])?;
    if prefixed {
        let body_len = (req - 4) as i32;
        check_prefix(body_len)?;
        atom::encode_i32(body_len, &mut buf[..4])?;
    }
    Ok(req)
}

/// Decodes a signature, returning `(address, type_tag, bytes consumed)`.
pub fn decode_signature(buf: &[u8], prefixed: bool) -> Result<(String, String, usize)> {
    let mut req = 0;
    if prefixed {
        if buf.len() < 4 {
            return Err(OscError::Overrun {
                needed: 4,
                available: buf.len(),
            });
        }
        let (psize, _) = atom::decode_i32(buf)?;
        check_prefix(psize)?;
        if psize as usize > buf.len() - 4 {
            return Err(OscError::Overrun {
                needed: psize as usize + 4,
                available: buf.len(),
            });
        }
        req += 4;
    }
    let (address, sz) = atom::decode_string(&buf[req..])?;
    req += sz;
    let (type_tag, sz) = atom::decode_string(&buf[req..])?;
    req += sz;
    Ok((address, type_tag, req))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_without_prefix() {
        let mut buf = [0u8; 32];
        let n = encode_signature("/foo", ",if", false, &mut buf).unwrap();
        let (addr, tag, consumed) = decode_signature(&buf, false).unwrap();
        assert_eq!(addr, "/foo");
        assert_eq!(tag, ",if");
        assert_eq!(consumed, n);
    }

    #[test]
    fn prefix_is_back_patched_with_the_body_length() {
        let mut buf = [0u8; 32];
        let n = encode_signature("/foo", ",if", true, &mut buf).unwrap();
        let (psize, _) = atom::decode_i32(&buf).unwrap();
        assert_eq!(psize as usize, n - 4);

        let (addr, tag, consumed) = decode_signature(&buf, true).unwrap();
        assert_eq!(addr, "/foo");
        assert_eq!(tag, ",if");
        assert_eq!(consumed, n);
    }

    #[test]
    fn decode_rejects_a_prefix_below_the_minimum() {
        let mut buf = [0u8; 12];
        atom::encode_i32(4, &mut buf).unwrap();
        assert!(matches!(
            decode_signature(&buf, true),
            Err(OscError::PacketSize { size: 4 })
        ));
    }
}
