//! L1: big-endian load/store of the primitive wire widths OSC uses.
//!
//! Floats are reinterpreted bit patterns, not numeric conversions — a NaN or
//! signalling payload round-trips exactly.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::error::{OscError, Result};

fn overrun(needed: usize, available: usize) -> OscError {
    OscError::Overrun { needed, available }
}

macro_rules! primitive_io {
    ($load:ident, $store:ident, $ty:ty, $width:expr, $read:ident, $write:ident) => {
        #[doc = concat!("Loads a big-endian `", stringify!($ty), "` from the front of `buf`.")]
        pub fn $load(buf: &[u8]) -> Result<$ty> {
            if buf.len() < $width {
                return Err(overrun($width, buf.len()));
            }
            let mut cursor = Cursor::new(buf);
            Ok(cursor.$read::<BigEndian>().expect("length checked above"))
        }

        #[doc = concat!("Stores a big-endian `", stringify!($ty), "` at the front of `buf`.")]
        pub fn $store(buf: &mut [u8], value: $ty) -> Result<()> {
            if buf.len() < $width {
                return Err(overrun($width, buf.len()));
            }
            let mut cursor = Cursor::new(buf);
            cursor
                .$write::<BigEndian>(value)
                .expect("length checked above");
            Ok(())
        }
    };
}

primitive_io!(load_u32, store_u32, u32, 4, read_u32, write_u32);
primitive_io!(load_i32, store_i32, i32, 4, read_i32, write_i32);
primitive_io!(load_u64, store_u64, u64, 8, read_u64, write_u64);
primitive_io!(load_i64, store_i64, i64, 8, read_i64, write_i64);
primitive_io!(load_f32, store_f32, f32, 4, read_f32, write_f32);
primitive_io!(load_f64, store_f64, f64, 8, read_f64, write_f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_width() {
        let mut buf = [0u8; 8];
        store_u32(&mut buf, 0x1234_5678).unwrap();
        assert_eq!(load_u32(&buf).unwrap(), 0x1234_5678);

        store_i64(&mut buf, -1).unwrap();
        assert_eq!(load_i64(&buf).unwrap(), -1);
        assert_eq!(buf, [0xff; 8]);
    }

    #[test]
    fn float_bit_pattern_is_preserved() {
        let mut buf = [0u8; 4];
        let nan = f32::from_bits(0x7fc0_0001);
        store_f32(&mut buf, nan).unwrap();
        assert_eq!(load_f32(&buf).unwrap().to_bits(), nan.to_bits());
    }

    #[test]
    fn rejects_short_buffers() {
        let buf = [0u8; 2];
        assert_eq!(
            load_u32(&buf).unwrap_err(),
            OscError::Overrun {
                needed: 4,
                available: 2
            }
        );
    }
}
