//! L2: atom codecs for the primitive OSC wire types.
//!
//! Every atom codec follows the same three-entry-point shape (spec §9,
//! OQ-1): `encoded_len` for a dry-run size, `encode` to write into a
//! caller-supplied buffer, `decode` to parse one out of a buffer. All three
//! enforce the same padding and size-ceiling rules a real write would.

use crate::byteio;
use crate::error::{OscError, Result};

/// The largest size, in bytes, any single encode operation may produce:
/// `2^31 - 4`.
pub const SIZE_MAX: usize = 0x7fff_fffc;

/// Number of NUL pad bytes (1-4) a NUL-terminated string of `len` payload
/// bytes needs: unlike a blob, a string is padded even when `len` is
/// already a multiple of 4, since the terminator itself must be present.
pub fn string_pad(len: usize) -> usize {
    4 - (len & 3)
}

/// Number of pad bytes (0-3) a blob of `len` payload bytes needs to reach
/// the next 4-byte boundary. Zero when `len` is already aligned.
pub fn blob_pad(len: usize) -> usize {
    string_pad(len) & 3
}

/// Total on-wire length of a string atom's payload: `len` bytes plus its
/// forced 1-4 byte NUL pad.
pub fn string_padded_len(len: usize) -> usize {
    len + string_pad(len)
}

/// Total on-wire length of a blob atom's payload (size prefix not
/// included): `len` bytes plus 0-3 alignment pad bytes.
pub fn blob_padded_len(len: usize) -> usize {
    len + blob_pad(len)
}

fn check_size_max(total: usize) -> Result<()> {
    if total > SIZE_MAX {
        Err(OscError::SizeMax { limit: SIZE_MAX })
    } else {
        Ok(())
    }
}

fn overrun(needed: usize, available: usize) -> OscError {
    OscError::Overrun { needed, available }
}

fn zero_pad(buf: &mut [u8], at: usize, n: usize) {
    buf[at..at + n].fill(0);
}

// --- int32 / uint32 / float32 --------------------------------------------

/// Size in bytes of any 32-bit atom (`i`, `r`, `f`, `c`, `m`).
pub const WIDTH_32: usize = 4;
/// Size in bytes of any 64-bit atom (`h`, `t`, `d`).
pub const WIDTH_64: usize = 8;

macro_rules! fixed_width_atom {
    ($encode:ident, $decode:ident, $ty:ty, $width:expr, $load:path, $store:path) => {
        #[doc = concat!("Encodes a `", stringify!($ty), "` atom, returning the bytes written.")]
        pub fn $encode(value: $ty, buf: &mut [u8]) -> Result<usize> {
            if buf.len() < $width {
                return Err(overrun($width, buf.len()));
            }
            $store(&mut buf[..$width], value)?;
            Ok($width)
        }

        #[doc = concat!("Decodes a `", stringify!($ty), "` atom, returning the value and bytes consumed.")]
        pub fn $decode(buf: &[u8]) -> Result<($ty, usize)> {
            if buf.len() < $width {
                return Err(overrun($width, buf.len()));
            }
            Ok(($load(&buf[..$width])?, $width))
        }
    };
}

fixed_width_atom!(encode_i32, decode_i32, i32, WIDTH_32, byteio::load_i32, byteio::store_i32);
fixed_width_atom!(encode_u32, decode_u32, u32, WIDTH_32, byteio::load_u32, byteio::store_u32);
fixed_width_atom!(encode_f32, decode_f32, f32, WIDTH_32, byteio::load_f32, byteio::store_f32);
fixed_width_atom!(encode_i64, decode_i64, i64, WIDTH_64, byteio::load_i64, byteio::store_i64);
fixed_width_atom!(encode_u64, decode_u64, u64, WIDTH_64, byteio::load_u64, byteio::store_u64);
fixed_width_atom!(encode_f64, decode_f64, f64, WIDTH_64, byteio::load_f64, byteio::store_f64);

// --- char ------------------------------------------------------------------

/// Encodes a `c` atom: the 7-bit value in the first of 4 bytes, rest NUL.
pub fn encode_char(value: char, buf: &mut [u8]) -> Result<usize> {
    if buf.len() < WIDTH_32 {
        return Err(overrun(WIDTH_32, buf.len()));
    }
    let mut tmp = [0u8; 4];
    tmp[0] = value as u32 as u8;
    buf[..4].copy_from_slice(&tmp);
    Ok(WIDTH_32)
}

/// Decodes a `c` atom.
pub fn decode_char(buf: &[u8]) -> Result<(char, usize)> {
    if buf.len() < WIDTH_32 {
        return Err(overrun(WIDTH_32, buf.len()));
    }
    Ok((buf[0] as char, WIDTH_32))
}

// --- midi --------------------------------------------------------------

/// Encodes an `m` atom: four opaque bytes copied verbatim.
pub fn encode_midi(value: [u8; 4], buf: &mut [u8]) -> Result<usize> {
    if buf.len() < WIDTH_32 {
        return Err(overrun(WIDTH_32, buf.len()));
    }
    buf[..4].copy_from_slice(&value);
    Ok(WIDTH_32)
}

/// Decodes an `m` atom.
pub fn decode_midi(buf: &[u8]) -> Result<([u8; 4], usize)> {
    if buf.len() < WIDTH_32 {
        return Err(overrun(WIDTH_32, buf.len()));
    }
    let mut out = [0u8; 4];
    out.copy_from_slice(&buf[..4]);
    Ok((out, WIDTH_32))
}

// --- string --------------------------------------------------------------

/// The encoded length of a string atom: the string bytes, a NUL terminator,
/// and padding out to a 4-byte boundary.
pub fn string_encoded_len(s: &str) -> usize {
    string_padded_len(s.len())
}

/// Encodes an `s`/`S` atom: `s`'s bytes (which must not contain a NUL),
/// followed by 1-4 NUL pad bytes.
pub fn encode_string(s: &str, buf: &mut [u8]) -> Result<usize> {
    let total = string_encoded_len(s);
    check_size_max(total)?;
    if buf.len() < total {
        return Err(overrun(total, buf.len()));
    }
    buf[..s.len()].copy_from_slice(s.as_bytes());
    zero_pad(buf, s.len(), total - s.len());
    Ok(total)
}

/// Decodes an `s`/`S` atom: the string is the maximal leading NUL-free run;
/// the string length plus 1-4 padding bytes must fit in `buf`.
pub fn decode_string(buf: &[u8]) -> Result<(String, usize)> {
    let nul_at = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(OscError::Overrun {
            needed: buf.len() + 1,
            available: buf.len(),
        })?;
    let total = string_padded_len(nul_at);
    if buf.len() < total {
        return Err(overrun(total, buf.len()));
    }
    let s = std::str::from_utf8(&buf[..nul_at])
        .map_err(|_| OscError::Type { offset: 0 })?
        .to_owned();
    Ok((s, total))
}

// --- blob ------------------------------------------------------------------

/// The encoded length of a blob atom: a 4-byte size prefix, the payload,
/// and padding out to a 4-byte boundary.
pub fn blob_encoded_len(data: &[u8]) -> usize {
    4 + blob_padded_len(data.len())
}

/// Encodes a `b` atom: an `int32` size prefix, the payload, then padding.
pub fn encode_blob(data: &[u8], buf: &mut [u8]) -> Result<usize> {
    let total = blob_encoded_len(data);
    check_size_max(total)?;
    if data.len() > i32::MAX as usize {
        return Err(OscError::SizeMax { limit: SIZE_MAX });
    }
    if buf.len() < total {
        return Err(overrun(total, buf.len()));
    }
    byteio::store_i32(&mut buf[..4], data.len() as i32)?;
    buf[4..4 + data.len()].copy_from_slice(data);
    zero_pad(buf, 4 + data.len(), total - 4 - data.len());
    Ok(total)
}

/// Decodes a `b` atom. The size prefix must be non-negative and the padded
/// payload must fit within `buf`.
pub fn decode_blob(buf: &[u8]) -> Result<(Vec<u8>, usize)> {
    let (size, _) = decode_i32(buf)?;
    if size < 0 {
        return Err(OscError::PacketSize { size: size as i64 });
    }
    let size = size as usize;
    if size > SIZE_MAX - 4 {
        return Err(OscError::SizeMax { limit: SIZE_MAX });
    }
    let total = 4 + blob_padded_len(size);
    if buf.len() < total {
        return Err(overrun(total, buf.len()));
    }
    Ok((buf[4..4 + size].to_vec(), total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn string_round_trips_and_pads_with_nul() {
        let mut buf = [0xffu8; 8];
        let n = encode_string("abc", &mut buf).unwrap();
        assert_eq!(n, 4);
        assert_eq!(&buf[..4], b"abc\0");

        let (s, consumed) = decode_string(&buf).unwrap();
        assert_eq!(s, "abc");
        assert_eq!(consumed, 4);
    }

    #[test]
    fn string_of_exact_multiple_of_four_gets_a_full_pad_word() {
        let mut buf = [0xffu8; 8];
        let n = encode_string("abcd", &mut buf).unwrap();
        assert_eq!(n, 8);
        assert_eq!(&buf[4..8], [0, 0, 0, 0]);
    }

    #[test]
    fn blob_round_trips() {
        let data = b"Hello World!";
        let mut buf = [0u8; 32];
        let n = encode_blob(data, &mut buf).unwrap();
        assert_eq!(n, 4 + blob_padded_len(data.len()));

        let (decoded, consumed) = decode_blob(&buf).unwrap();
        assert_eq!(decoded, data);
        assert_eq!(consumed, n);
    }

    #[test]
    fn blob_rejects_negative_size_prefix() {
        let mut buf = [0u8; 8];
        byteio::store_i32(&mut buf, -1).unwrap();
        assert_matches!(decode_blob(&buf), Err(OscError::PacketSize { size: -1 }));
    }

    #[test]
    fn char_atom_zero_fills_the_remaining_bytes() {
        let mut buf = [0xffu8; 4];
        encode_char('A', &mut buf).unwrap();
        assert_eq!(buf, [b'A', 0, 0, 0]);
    }

    #[test]
    fn dry_run_length_matches_a_real_encode() {
        let s = "Hello World!";
        let mut buf = vec![0u8; string_encoded_len(s)];
        let written = encode_string(s, &mut buf).unwrap();
        assert_eq!(written, string_encoded_len(s));
    }

    #[test]
    fn every_scalar_round_trips() {
        let mut buf = [0u8; 8];
        encode_i32(0x1234_5678, &mut buf).unwrap();
        assert_eq!(decode_i32(&buf).unwrap(), (0x1234_5678, 4));

        encode_u32(0x8765_4321, &mut buf).unwrap();
        assert_eq!(decode_u32(&buf).unwrap(), (0x8765_4321, 4));

        encode_i64(0x1234_5678_1234_5678, &mut buf).unwrap();
        assert_eq!(decode_i64(&buf).unwrap(), (0x1234_5678_1234_5678, 8));
    }
}
