//! L4.2: bundle header (`#bundle` marker + NTP time tag) codec.
//!
//! Grounded on `original_source/cosc.c`'s `cosc_write_bundle` /
//! `cosc_read_bundle`.

use crate::atom;
use crate::error::{OscError, Result};
use crate::timetag::TimeTag;

/// The literal 8-byte bundle tag, including its NUL terminator.
pub const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";

/// The encoded length of a bundle header: the tag, the time tag, and (if
/// `prefixed`) a 4-byte length prefix.
pub fn bundle_header_encoded_len(prefixed: bool) -> usize {
    if prefixed {
        20
    } else {
        16
    }
}

/// Encodes a bundle header. Unlike a message signature's prefix, a
/// bundle's length prefix is supplied by the caller rather than
/// back-patched here: the bundle's total size depends on the child
/// packets written after this header, which this function has no view of.
pub fn encode_bundle_header(time_tag: TimeTag, prefix: Option<i32>, buf: &mut [u8]) -> Result<usize> {
    if let Some(psize) = prefix {
        if psize as i64 > atom::SIZE_MAX as i64 - 16 {
            return Err(OscError::SizeMax { limit: atom::SIZE_MAX });
        }
    }
    let total = bundle_header_encoded_len(prefix.is_some());
    if buf.len() < total {
        return Err(OscError::Overrun {
            needed: total,
            available: buf.len(),
        });
    }
    let mut req = 0;
    if let Some(psize) = prefix {
        atom::encode_i32(psize, &mut buf[..4])?;
        req += 4;
    }
    buf[req..req + 8].copy_from_slice(BUNDLE_TAG);
    atom::encode_u64(time_tag.as_u64(), &mut buf[req + 8..req + 16])?;
    Ok(req + 16)
}

/// Decodes a bundle header, returning `(time tag, bytes consumed)`.
pub fn decode_bundle_header(buf: &[u8], prefixed: bool) -> Result<(TimeTag, usize)> {
    let total = bundle_header_encoded_len(prefixed);
    if buf.len() < total {
        return Err(OscError::Overrun {
            needed: total,
            available: buf.len(),
        });
    }
    let mut req = 0;
    if prefixed {
        let (psize, _) = atom::decode_i32(buf)?;
        if psize < 16 || psize as i64 > atom::SIZE_MAX as i64 - 16 || psize % 4 != 0 {
            return Err(OscError::PacketSize { size: psize as i64 });
        }
        if psize as usize > buf.len() - 4 {
            return Err(OscError::Overrun {
                needed: psize as usize + 4,
                available: buf.len(),
            });
        }
        req += 4;
    }
    if &buf[req..req + 8] != BUNDLE_TAG {
        return Err(OscError::Type { offset: req });
    }
    let (raw, _) = atom::decode_u64(&buf[req + 8..req + 16])?;
    Ok((TimeTag::from(raw), req + 16))
}
