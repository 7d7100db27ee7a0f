//! L5: the streaming serial writer and reader (spec §4.5).
//!
//! Grounded on `original_source/cosc.h`'s `cosc_writer_*`/`cosc_reader_*`
//! family and `struct cosc_serial`. Per spec §9's redesign note, the
//! original's single struct distinguished by a nullable buffer pointer
//! becomes two distinct types here ([`OscWriter`] and [`OscReader`]), so a
//! direction mismatch is unrepresentable rather than an `EINVAL` at
//! runtime — this crate's [`crate::error::OscError`] has no `EINVAL`
//! variant for that reason.

mod level;
mod reader;
mod writer;

pub use level::{Level, LevelKind};
pub use reader::OscReader;
pub use writer::OscWriter;

use bitflags::bitflags;

bitflags! {
    /// Flags controlling a serial's top-level framing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SerialFlags: u32 {
        /// The first top-level bundle or message is prefixed with a
        /// packet length. Without this flag, at most one top-level packet
        /// may be written/read per serial lifetime.
        const PSIZE = 1;
    }
}

/// Scans `buf[tt_start + index .. tt_end]` forward over any `[`/`]`
/// structural characters, returning the (possibly updated) cursor index,
/// array-start bookkeeping, and the next real type-tag character — or
/// `None` once the type tag is exhausted. Shared by the writer and the
/// reader: value operations only ever see "the next non-bracket type-tag
/// character", per spec §4.5.
pub(crate) fn scan_to_type(
    buf: &[u8],
    tt_start: usize,
    tt_end: usize,
    mut index: usize,
    mut array_start: Option<usize>,
) -> (usize, Option<usize>, Option<char>) {
    loop {
        if tt_start + index >= tt_end {
            return (index, array_start, None);
        }
        match buf[tt_start + index] {
            b'[' => {
                index += 1;
                array_start = Some(index);
            }
            b']' => {
                index += 1;
                array_start = None;
            }
            c => return (index, array_start, Some(c as char)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom;
    use crate::timetag::TimeTag;

    #[test]
    fn get_size_tracks_the_sum_of_committed_top_level_operations() {
        let mut buf = [0u8; 128];
        let mut levels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut levels, SerialFlags::PSIZE);

        let mut total = 0;
        writer.open_message("/a", ",i").unwrap();
        writer.int32(1).unwrap();
        total += writer.close(true).unwrap();
        assert_eq!(writer.get_size(), total);

        writer.open_message("/bb", ",f").unwrap();
        writer.float32(2.0).unwrap();
        total += writer.close(true).unwrap();
        assert_eq!(writer.get_size(), total);
    }

    #[test]
    fn bundle_children_are_each_preceded_by_a_valid_length_prefix() {
        let mut buf = [0u8; 256];
        let mut levels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut levels, SerialFlags::PSIZE);
        writer.open_bundle(TimeTag::IMMEDIATE).unwrap();
        for i in 0..3 {
            writer.open_message("/child", ",i").unwrap();
            writer.int32(i).unwrap();
            writer.close(true).unwrap();
        }
        let total = writer.close(true).unwrap();

        // Bundle header: 4-byte outer prefix + "#bundle\0" (8) + time tag (8).
        let mut offset = 4 + 8 + 8;
        while offset < total {
            let (child_len, _) = atom::decode_i32(&buf[offset..]).unwrap();
            assert!(child_len >= 8);
            assert_eq!(child_len % 4, 0);
            offset += 4 + child_len as usize;
        }
        assert_eq!(offset, total);
    }
}
