//! The streaming reader half of L5.
//!
//! Grounded on `original_source/cosc.h`'s `cosc_reader_*` family.

use super::level::{Level, LevelKind};
use super::{scan_to_type, SerialFlags};
use crate::atom;
use crate::bundle;
use crate::error::{OscError, Result};
use crate::message::{self, Message};
use crate::signature;
use crate::timetag::TimeTag;
use crate::value::OscType;

/// Reads OSC packets out of a borrowed buffer one level and one value at
/// a time. String and scalar values are copied out; blob bytes are
/// returned as zero-copy slices borrowed from the original buffer.
pub struct OscReader<'buf, 'lvl> {
    buf: &'buf [u8],
    levels: &'lvl mut [Level],
    depth: usize,
    cursor: usize,
    committed: usize,
    flags: SerialFlags,
    read_top_level: bool,
}

impl<'buf, 'lvl> OscReader<'buf, 'lvl> {
    pub fn new(buf: &'buf [u8], levels: &'lvl mut [Level], flags: SerialFlags) -> Self {
        OscReader {
            buf,
            levels,
            depth: 0,
            cursor: 0,
            committed: 0,
            flags,
            read_top_level: false,
        }
    }

    pub fn reset(&mut self) {
        self.depth = 0;
        self.cursor = 0;
        self.committed = 0;
        self.read_top_level = false;
    }

    /// Bytes consumed so far from every fully-closed top-level packet.
    pub fn get_size(&self) -> usize {
        self.committed
    }

    pub fn get_buffer_size(&self) -> usize {
        self.buf.len()
    }

    pub fn get_msgtype(&self) -> Result<Option<char>> {
        let level = self.top()?;
        if level.kind != LevelKind::Message {
            return Err(OscError::LevelType);
        }
        let (_, _, c) = scan_to_type(self.buf, level.tt_start, level.tt_end, level.tt_index, level.array_start);
        Ok(c)
    }

    /// Whether the innermost bundle level has more child packets before
    /// its declared (or, if unprefixed, whole-buffer) extent ends.
    pub fn has_more(&self) -> Result<bool> {
        let level = self.top()?;
        if level.kind != LevelKind::Bundle {
            return Err(OscError::LevelType);
        }
        let end = level.size_max.unwrap_or(self.buf.len());
        Ok(self.cursor < end)
    }

    fn top(&self) -> Result<&Level> {
        if self.depth == 0 {
            Err(OscError::LevelType)
        } else {
            Ok(&self.levels[self.depth - 1])
        }
    }

    fn top_mut(&mut self) -> Result<&mut Level> {
        if self.depth == 0 {
            Err(OscError::LevelType)
        } else {
            Ok(&mut self.levels[self.depth - 1])
        }
    }

    /// Whether the next bundle/message pop needs a length prefix.
    /// `allow_blob` distinguishes `open_bundle` (enclosing level must be a
    /// bundle) from `open_message` (a blob enclosing level is also valid:
    /// spec §8.2 S7 opens a nested *message* inside an open blob, never a
    /// nested bundle, so only `open_message` accepts it).
    fn needs_prefix(&self, allow_blob: bool) -> Result<bool> {
        if self.depth == 0 {
            Ok(self.flags.contains(SerialFlags::PSIZE))
        } else {
            match self.levels[self.depth - 1].kind {
                LevelKind::Bundle => Ok(true),
                LevelKind::Blob if allow_blob => Ok(true),
                LevelKind::Blob | LevelKind::Message => Err(OscError::LevelType),
            }
        }
    }

    fn check_top_level_guard(&self) -> Result<()> {
        if self.depth == 0 && self.read_top_level && !self.flags.contains(SerialFlags::PSIZE) {
            return Err(OscError::PrefixFlag);
        }
        Ok(())
    }

    pub fn open_bundle(&mut self) -> Result<TimeTag> {
        self.check_top_level_guard()?;
        let prefixed = self.needs_prefix(false)?;
        if self.depth >= self.levels.len() {
            return Err(OscError::LevelMax { max: self.levels.len() });
        }
        log::debug!("opening bundle level at depth {} (prefixed = {prefixed})", self.depth);
        let start = self.cursor;
        let psize = if prefixed {
            let (p, _) = atom::decode_i32(&self.buf[start..])?;
            Some(p)
        } else {
            None
        };
        let (tag, n) = bundle::decode_bundle_header(&self.buf[start..], prefixed)?;
        let content_start = start + if prefixed { 4 } else { 0 };
        let mut level = Level::bundle(content_start, if prefixed { Some(start) } else { None });
        level.size_max = psize.map(|p| content_start + p as usize);
        self.levels[self.depth] = level;
        self.depth += 1;
        self.cursor += n;
        Ok(tag)
    }

    pub fn open_message(&mut self) -> Result<(String, String)> {
        self.check_top_level_guard()?;
        let prefixed = self.needs_prefix(true)?;
        if self.depth >= self.levels.len() {
            return Err(OscError::LevelMax { max: self.levels.len() });
        }
        let start = self.cursor;
        let psize = if prefixed {
            let (p, _) = atom::decode_i32(&self.buf[start..])?;
            Some(p)
        } else {
            None
        };
        let (address, type_tag, n) = signature::decode_signature(&self.buf[start..], prefixed)?;
        log::debug!("opening message level at depth {} ({address}, {type_tag})", self.depth);

        let content_start = start + if prefixed { 4 } else { 0 };
        let tt_str_at = start + n - (type_tag.len() + atom::string_pad(type_tag.len()));
        let mut level = Level::message(
            content_start,
            if prefixed { Some(start) } else { None },
            tt_str_at + 1,
            tt_str_at + type_tag.len(),
        );
        level.size_max = psize.map(|p| content_start + p as usize);
        self.levels[self.depth] = level;
        self.depth += 1;
        self.cursor += n;
        Ok((address, type_tag))
    }

    pub fn open_blob(&mut self) -> Result<usize> {
        if self.depth == 0 || self.levels[self.depth - 1].kind != LevelKind::Message {
            return Err(OscError::LevelType);
        }
        let (idx, arr, ch) = {
            let level = &self.levels[self.depth - 1];
            scan_to_type(self.buf, level.tt_start, level.tt_end, level.tt_index, level.array_start)
        };
        match ch {
            None => return Err(OscError::LevelType),
            Some('b') => {
                let level = &mut self.levels[self.depth - 1];
                level.tt_index = idx + 1;
                level.array_start = arr;
            }
            Some(c) => return Err(OscError::MsgType { expected: c, found: 'b' }),
        }

        if self.depth >= self.levels.len() {
            return Err(OscError::LevelMax { max: self.levels.len() });
        }
        log::debug!("opening blob level at depth {}", self.depth);
        let start = self.cursor;
        let (size, _) = atom::decode_i32(&self.buf[start..])?;
        if size < 0 {
            log::trace!("rejected negative blob size {size}");
            return Err(OscError::PacketSize { size: size as i64 });
        }
        let size = size as usize;
        if size > atom::SIZE_MAX - 4 {
            log::trace!("rejected oversized blob size {size}");
            return Err(OscError::SizeMax { limit: atom::SIZE_MAX });
        }
        let padded_end = start + 4 + atom::blob_padded_len(size);
        if self.buf.len() < padded_end {
            return Err(OscError::Overrun {
                needed: padded_end,
                available: self.buf.len(),
            });
        }
        let mut level = Level::blob(start + 4, Some(start));
        level.size_max = Some(start + 4 + size);
        self.levels[self.depth] = level;
        self.depth += 1;
        self.cursor += 4;
        Ok(size)
    }

    fn count_remaining_tag_chars(&self) -> usize {
        let level = &self.levels[self.depth - 1];
        let mut idx = level.tt_index;
        let mut arr = level.array_start;
        let mut count = 0;
        loop {
            let (ni, na, ch) = scan_to_type(self.buf, level.tt_start, level.tt_end, idx, arr);
            match ch {
                None => break,
                Some(_) => {
                    count += 1;
                    idx = ni + 1;
                    arr = na;
                }
            }
        }
        count
    }

    /// Pops the top level. `finalize = true` consumes (discards) any
    /// unread values, blob payload, or bundle children; `finalize = false`
    /// fails with [`OscError::Unfinished`] if anything is left unread.
    pub fn close(&mut self, finalize: bool) -> Result<usize> {
        let level = *self.top()?;
        log::debug!("closing {:?} level at depth {} (finalize = {finalize})", level.kind, self.depth - 1);

        match level.kind {
            LevelKind::Message => {
                let (_, _, ch) =
                    scan_to_type(self.buf, level.tt_start, level.tt_end, level.tt_index, level.array_start);
                if ch.is_some() {
                    if !finalize {
                        return Err(OscError::Unfinished {
                            missing: self.count_remaining_tag_chars(),
                        });
                    }
                    loop {
                        match self.skip() {
                            Ok(_) => continue,
                            Err(OscError::LevelType) => break,
                            Err(e) => return Err(e),
                        }
                    }
                }
            }
            LevelKind::Blob => {
                let payload_end = level.size_max.unwrap_or(self.cursor);
                if self.cursor < payload_end {
                    if !finalize {
                        return Err(OscError::Unfinished {
                            missing: payload_end - self.cursor,
                        });
                    }
                    self.cursor = payload_end;
                }
                let size = payload_end - level.start;
                let padded_end = level.start + atom::blob_padded_len(size);
                self.cursor = padded_end;
            }
            LevelKind::Bundle => {
                let end = level.size_max.unwrap_or(self.cursor);
                if self.cursor < end {
                    if !finalize {
                        return Err(OscError::Unfinished { missing: end - self.cursor });
                    }
                    self.cursor = end;
                }
            }
        }

        let observed = self.cursor - level.start;
        self.depth -= 1;
        if self.depth == 0 {
            self.committed = self.cursor;
            self.read_top_level = true;
        }
        Ok(observed + if level.prefix_at.is_some() { 4 } else { 0 })
    }

    /// Decodes and discards the next type-tag value, advancing the
    /// cursor by however many bytes it actually occupied.
    pub fn skip(&mut self) -> Result<usize> {
        let level = self.top()?;
        if level.kind != LevelKind::Message {
            return Err(OscError::LevelType);
        }
        let (idx, arr, ch) = scan_to_type(self.buf, level.tt_start, level.tt_end, level.tt_index, level.array_start);
        let c = ch.ok_or(OscError::LevelType)?;
        let (_, sz) = message::decode_one_value(c, &self.buf[self.cursor..])?;
        self.cursor += sz;
        let level = self.top_mut()?;
        level.tt_index = idx + 1;
        level.array_start = arr;
        Ok(sz)
    }

    pub fn repeat(&mut self) -> Result<()> {
        let level = self.top()?;
        if level.kind != LevelKind::Message {
            return Err(OscError::LevelType);
        }
        let start = level
            .array_start
            .ok_or(OscError::MsgType { expected: ']', found: '\0' })?;
        let at_close = level.tt_start + level.tt_index < level.tt_end
            && self.buf[level.tt_start + level.tt_index] == b']';
        if !at_close {
            return Err(OscError::MsgType { expected: ']', found: '\0' });
        }
        let level = self.top_mut()?;
        level.tt_index = start;
        Ok(())
    }

    fn read_value(&mut self, type_char: char) -> Result<OscType> {
        let level = self.top()?;
        if level.kind != LevelKind::Message {
            return Err(OscError::LevelType);
        }
        let (idx, arr, ch) = scan_to_type(self.buf, level.tt_start, level.tt_end, level.tt_index, level.array_start);
        let c = ch.ok_or(OscError::LevelType)?;
        if c != type_char {
            return Err(OscError::MsgType { expected: c, found: type_char });
        }
        let (value, sz) = message::decode_one_value(type_char, &self.buf[self.cursor..])?;
        self.cursor += sz;
        let level = self.top_mut()?;
        level.tt_index = idx + 1;
        level.array_start = arr;
        Ok(value)
    }

    pub fn int32(&mut self) -> Result<i32> {
        match self.read_value('i')? {
            OscType::Int(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn uint32(&mut self) -> Result<u32> {
        match self.read_value('r')? {
            OscType::Color(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn float32(&mut self) -> Result<f32> {
        match self.read_value('f')? {
            OscType::Float(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn int64(&mut self) -> Result<i64> {
        match self.read_value('h')? {
            OscType::Int64(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn uint64(&mut self) -> Result<u64> {
        match self.read_value('t')? {
            OscType::Time(t) => Ok(t.as_u64()),
            _ => unreachable!(),
        }
    }

    pub fn float64(&mut self) -> Result<f64> {
        match self.read_value('d')? {
            OscType::Double(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn char_value(&mut self) -> Result<char> {
        match self.read_value('c')? {
            OscType::Char(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn midi(&mut self) -> Result<[u8; 4]> {
        match self.read_value('m')? {
            OscType::Midi(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn string(&mut self) -> Result<String> {
        match self.read_value('s')? {
            OscType::String(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn symbol(&mut self) -> Result<String> {
        match self.read_value('S')? {
            OscType::Symbol(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    /// Decodes an entire blob in one call, allocating. To borrow a blob's
    /// bytes without copying, use [`OscReader::open_blob`] and
    /// [`OscReader::bytes`] instead.
    pub fn blob(&mut self) -> Result<Vec<u8>> {
        match self.read_value('b')? {
            OscType::Blob(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    /// Decodes a value as an [`OscType`] whose variant matches whatever
    /// the next type-tag character happens to be.
    pub fn value(&mut self) -> Result<OscType> {
        let level = self.top()?;
        if level.kind != LevelKind::Message {
            return Err(OscError::LevelType);
        }
        let (idx, arr, ch) = scan_to_type(self.buf, level.tt_start, level.tt_end, level.tt_index, level.array_start);
        let c = ch.ok_or(OscError::LevelType)?;
        let (value, sz) = message::decode_one_value(c, &self.buf[self.cursor..])?;
        self.cursor += sz;
        let level = self.top_mut()?;
        level.tt_index = idx + 1;
        level.array_start = arr;
        Ok(value)
    }

    /// Borrows `len` raw bytes from an open blob level without copying.
    pub fn bytes(&mut self, len: usize) -> Result<&'buf [u8]> {
        let level = *self.top()?;
        if level.kind != LevelKind::Blob {
            return Err(OscError::LevelType);
        }
        let max = level.size_max.unwrap_or(self.buf.len());
        let start = self.cursor;
        if start + len > max {
            return Err(OscError::Overrun {
                needed: start + len,
                available: max,
            });
        }
        let slice = &self.buf[start..start + len];
        self.cursor += len;
        Ok(slice)
    }

    /// Decodes a complete, self-contained message without pushing a
    /// level.
    pub fn message(&mut self) -> Result<Message> {
        self.check_top_level_guard()?;
        let prefixed = self.needs_prefix(true)?;
        let start = self.cursor;
        let (msg, n) = message::decode_message(&self.buf[start..], prefixed)?;
        self.cursor += n;
        if self.depth == 0 {
            self.committed = self.cursor;
            self.read_top_level = true;
        }
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::super::writer::OscWriter;
    use super::*;

    #[test]
    fn reads_back_a_simple_message() {
        let mut buf = [0u8; 32];
        let mut wlevels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut wlevels, SerialFlags::empty());
        writer.open_message("/x", ",is").unwrap();
        writer.int32(5).unwrap();
        writer.string("hi").unwrap();
        let n = writer.close(true).unwrap();

        let mut rlevels = [Level::default(); 4];
        let mut reader = OscReader::new(&buf[..n], &mut rlevels, SerialFlags::empty());
        let (address, type_tag) = reader.open_message().unwrap();
        assert_eq!(address, "/x");
        assert_eq!(type_tag, ",is");
        assert_eq!(reader.int32().unwrap(), 5);
        assert_eq!(reader.string().unwrap(), "hi");
        reader.close(false).unwrap();
    }

    #[test]
    fn nested_bundle_round_trips_through_has_more() {
        let mut buf = [0u8; 128];
        let mut wlevels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut wlevels, SerialFlags::PSIZE);
        writer.open_bundle(TimeTag::IMMEDIATE).unwrap();
        writer.open_message("/a", ",i").unwrap();
        writer.int32(1).unwrap();
        writer.close(true).unwrap();
        writer.open_message("/b", ",i").unwrap();
        writer.int32(2).unwrap();
        writer.close(true).unwrap();
        let n = writer.close(true).unwrap();

        let mut rlevels = [Level::default(); 4];
        let mut reader = OscReader::new(&buf[..n], &mut rlevels, SerialFlags::PSIZE);
        reader.open_bundle().unwrap();
        assert!(reader.has_more().unwrap());
        let (addr, _) = reader.open_message().unwrap();
        assert_eq!(addr, "/a");
        assert_eq!(reader.int32().unwrap(), 1);
        reader.close(false).unwrap();
        assert!(reader.has_more().unwrap());
        let (addr, _) = reader.open_message().unwrap();
        assert_eq!(addr, "/b");
        assert_eq!(reader.int32().unwrap(), 2);
        reader.close(false).unwrap();
        assert!(!reader.has_more().unwrap());
        reader.close(false).unwrap();
    }

    #[test]
    fn open_bundle_inside_a_blob_level_is_rejected() {
        let mut buf = [0u8; 64];
        let mut wlevels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut wlevels, SerialFlags::empty());
        writer.open_message("/x", ",b").unwrap();
        writer.open_blob().unwrap();
        writer.bytes(b"ab").unwrap();
        writer.close(true).unwrap();
        let n = writer.close(true).unwrap();

        let mut rlevels = [Level::default(); 4];
        let mut reader = OscReader::new(&buf[..n], &mut rlevels, SerialFlags::empty());
        reader.open_message().unwrap();
        reader.open_blob().unwrap();
        assert!(matches!(reader.open_bundle(), Err(OscError::LevelType)));
    }

    #[test]
    fn blob_bytes_are_borrowed_without_copying() {
        let mut buf = [0u8; 32];
        let mut wlevels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut wlevels, SerialFlags::empty());
        writer.open_message("/x", ",b").unwrap();
        writer.open_blob().unwrap();
        writer.bytes(b"abc").unwrap();
        writer.close(true).unwrap();
        let n = writer.close(true).unwrap();

        let mut rlevels = [Level::default(); 4];
        let mut reader = OscReader::new(&buf[..n], &mut rlevels, SerialFlags::empty());
        reader.open_message().unwrap();
        let size = reader.open_blob().unwrap();
        assert_eq!(size, 3);
        let payload = reader.bytes(3).unwrap();
        assert_eq!(payload, b"abc");
        reader.close(false).unwrap();
        reader.close(false).unwrap();
    }

    #[test]
    fn close_without_finalize_reports_unread_values() {
        let mut buf = [0u8; 32];
        let mut wlevels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut wlevels, SerialFlags::empty());
        writer.open_message("/x", ",if").unwrap();
        writer.int32(1).unwrap();
        writer.float32(2.0).unwrap();
        let n = writer.close(true).unwrap();

        let mut rlevels = [Level::default(); 4];
        let mut reader = OscReader::new(&buf[..n], &mut rlevels, SerialFlags::empty());
        reader.open_message().unwrap();
        assert_eq!(reader.int32().unwrap(), 1);
        assert!(matches!(reader.close(false), Err(OscError::Unfinished { missing: 1 })));
    }
}
