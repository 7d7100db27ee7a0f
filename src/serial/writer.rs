//! The streaming writer half of L5.
//!
//! Grounded on `original_source/cosc.h`'s `cosc_writer_*` family.

use super::level::{Level, LevelKind};
use super::{scan_to_type, SerialFlags};
use crate::atom;
use crate::bundle;
use crate::error::{OscError, Result};
use crate::message::{self, Message};
use crate::timetag::TimeTag;
use crate::value::OscType;

/// Writes OSC packets into a caller-supplied buffer one level and one
/// value at a time, without allocating. The level stack (`levels`) bounds
/// how deeply bundles may nest; `SerialFlags::PSIZE` controls whether the
/// very first top-level packet gets a length prefix.
pub struct OscWriter<'buf, 'lvl> {
    buf: &'buf mut [u8],
    levels: &'lvl mut [Level],
    depth: usize,
    cursor: usize,
    committed: usize,
    flags: SerialFlags,
    wrote_top_level: bool,
}

impl<'buf, 'lvl> OscWriter<'buf, 'lvl> {
    pub fn new(buf: &'buf mut [u8], levels: &'lvl mut [Level], flags: SerialFlags) -> Self {
        OscWriter {
            buf,
            levels,
            depth: 0,
            cursor: 0,
            committed: 0,
            flags,
            wrote_top_level: false,
        }
    }

    /// Empties the level stack and rewinds the cursor without touching
    /// the buffer's contents.
    pub fn reset(&mut self) {
        self.depth = 0;
        self.cursor = 0;
        self.committed = 0;
        self.wrote_top_level = false;
    }

    /// Bytes committed so far: the total size of every fully-closed
    /// top-level packet. A packet still being written doesn't count until
    /// its matching `close`.
    pub fn get_size(&self) -> usize {
        self.committed
    }

    pub fn get_buffer_size(&self) -> usize {
        self.buf.len()
    }

    /// The innermost message level's next type-tag character, `None` if
    /// its type tag is exhausted.
    pub fn get_msgtype(&self) -> Result<Option<char>> {
        let level = self.top()?;
        if level.kind != LevelKind::Message {
            return Err(OscError::LevelType);
        }
        let (_, _, c) = scan_to_type(self.buf, level.tt_start, level.tt_end, level.tt_index, level.array_start);
        Ok(c)
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

    /// Whether the next bundle/message push needs a length prefix.
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
        if self.depth == 0 && self.wrote_top_level && !self.flags.contains(SerialFlags::PSIZE) {
            return Err(OscError::PrefixFlag);
        }
        Ok(())
    }

    /// Pushes a bundle level, writing `#bundle\0` and `time_tag`.
    pub fn open_bundle(&mut self, time_tag: TimeTag) -> Result<usize> {
        self.check_top_level_guard()?;
        let prefixed = self.needs_prefix(false)?;
        if self.depth >= self.levels.len() {
            return Err(OscError::LevelMax { max: self.levels.len() });
        }
        log::debug!("opening bundle level at depth {} (prefixed = {prefixed})", self.depth);
        let start = self.cursor;
        let prefix = if prefixed { Some(0) } else { None };
        let n = bundle::encode_bundle_header(time_tag, prefix, &mut self.buf[start..])?;
        let prefix_at = prefix.map(|_| start);
        let content_start = start + if prefixed { 4 } else { 0 };
        self.levels[self.depth] = Level::bundle(content_start, prefix_at);
        self.depth += 1;
        self.cursor += n;
        Ok(n)
    }

    /// Pushes a message level, writing `address` and `type_tag` (which
    /// must start with `,`). Subsequent value operations are dispatched
    /// against `type_tag`.
    pub fn open_message(&mut self, address: &str, type_tag: &str) -> Result<usize> {
        self.check_top_level_guard()?;
        let prefixed = self.needs_prefix(true)?;
        if self.depth >= self.levels.len() {
            return Err(OscError::LevelMax { max: self.levels.len() });
        }
        if type_tag.as_bytes().first() != Some(&b',') {
            return Err(OscError::Type { offset: 0 });
        }

        log::debug!("opening message level at depth {} ({address}, {type_tag})", self.depth);
        let start = self.cursor;
        let mut req = 0;
        if prefixed {
            if self.buf.len() < start + 4 {
                return Err(OscError::Overrun {
                    needed: start + 4,
                    available: self.buf.len(),
                });
            }
            atom::encode_i32(0, &mut self.buf[start..start + 4])?;
            req += 4;
        }
        req += atom::encode_string(address, &mut self.buf[start + req..])?;
        let tt_str_at = start + req;
        req += atom::encode_string(type_tag, &mut self.buf[start + req..])?;

        let prefix_at = if prefixed { Some(start) } else { None };
        let content_start = start + if prefixed { 4 } else { 0 };
        self.levels[self.depth] = Level::message(content_start, prefix_at, tt_str_at + 1, tt_str_at + type_tag.len());
        self.depth += 1;
        self.cursor += req;
        Ok(req)
    }

    /// Pushes a blob level. Only valid when the enclosing message level's
    /// next type-tag character is `b`.
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
        if self.buf.len() < start + 4 {
            return Err(OscError::Overrun {
                needed: start + 4,
                available: self.buf.len(),
            });
        }
        atom::encode_i32(0, &mut self.buf[start..start + 4])?;
        self.levels[self.depth] = Level::blob(start + 4, Some(start));
        self.depth += 1;
        self.cursor += 4;
        Ok(4)
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

    /// Pops the top level, patching its length prefix (if any) with the
    /// observed size. `finalize = true` pads any undelivered message
    /// payload (or blob alignment) with zeros; `finalize = false` fails
    /// with [`OscError::Unfinished`] if anything is missing.
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
                let observed = self.cursor - level.start;
                let pad = (4 - (observed & 3)) & 3;
                if pad != 0 {
                    if !finalize {
                        return Err(OscError::Unfinished { missing: pad });
                    }
                    if self.buf.len() < self.cursor + pad {
                        return Err(OscError::Overrun {
                            needed: self.cursor + pad,
                            available: self.buf.len(),
                        });
                    }
                    self.buf[self.cursor..self.cursor + pad].fill(0);
                    self.cursor += pad;
                }
            }
            LevelKind::Bundle => {}
        }

        let observed = self.cursor - level.start;
        if let Some(prefix_at) = level.prefix_at {
            atom::encode_i32(observed as i32, &mut self.buf[prefix_at..prefix_at + 4])?;
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.committed = self.cursor;
            self.wrote_top_level = true;
        }
        Ok(observed + if level.prefix_at.is_some() { 4 } else { 0 })
    }

    /// Writes the zero/empty form of the next type-tag character and
    /// advances the cursor.
    pub fn skip(&mut self) -> Result<usize> {
        let level = self.top()?;
        if level.kind != LevelKind::Message {
            return Err(OscError::LevelType);
        }
        let (idx, arr, ch) = scan_to_type(self.buf, level.tt_start, level.tt_end, level.tt_index, level.array_start);
        let c = ch.ok_or(OscError::LevelType)?;
        let start = self.cursor;
        let sz = message::encode_one_value(c, None, &mut self.buf[start..])?;
        self.cursor += sz;
        let level = self.top_mut()?;
        level.tt_index = idx + 1;
        level.array_start = arr;
        Ok(sz)
    }

    /// Rewinds the message-level type-tag cursor to just after the
    /// innermost `[`, so the next value operations re-emit the array.
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

    fn write_value(&mut self, type_char: char, value: Option<&OscType>) -> Result<usize> {
        let level = self.top()?;
        if level.kind != LevelKind::Message {
            return Err(OscError::LevelType);
        }
        let (idx, arr, ch) = scan_to_type(self.buf, level.tt_start, level.tt_end, level.tt_index, level.array_start);
        let c = ch.ok_or(OscError::LevelType)?;
        if c != type_char {
            return Err(OscError::MsgType { expected: c, found: type_char });
        }
        let start = self.cursor;
        let sz = message::encode_one_value(type_char, value, &mut self.buf[start..])?;
        self.cursor += sz;
        let level = self.top_mut()?;
        level.tt_index = idx + 1;
        level.array_start = arr;
        Ok(sz)
    }

    pub fn int32(&mut self, value: i32) -> Result<usize> {
        self.write_value('i', Some(&OscType::Int(value)))
    }

    pub fn uint32(&mut self, value: u32) -> Result<usize> {
        self.write_value('r', Some(&OscType::Color(value)))
    }

    pub fn float32(&mut self, value: f32) -> Result<usize> {
        self.write_value('f', Some(&OscType::Float(value)))
    }

    pub fn int64(&mut self, value: i64) -> Result<usize> {
        self.write_value('h', Some(&OscType::Int64(value)))
    }

    pub fn uint64(&mut self, value: u64) -> Result<usize> {
        self.write_value('t', Some(&OscType::Time(TimeTag::from(value))))
    }

    pub fn float64(&mut self, value: f64) -> Result<usize> {
        self.write_value('d', Some(&OscType::Double(value)))
    }

    pub fn char_value(&mut self, value: char) -> Result<usize> {
        self.write_value('c', Some(&OscType::Char(value)))
    }

    pub fn midi(&mut self, value: [u8; 4]) -> Result<usize> {
        self.write_value('m', Some(&OscType::Midi(value)))
    }

    pub fn string(&mut self, value: &str) -> Result<usize> {
        self.write_value('s', Some(&OscType::String(value.to_string())))
    }

    pub fn symbol(&mut self, value: &str) -> Result<usize> {
        self.write_value('S', Some(&OscType::Symbol(value.to_string())))
    }

    /// Writes an entire blob in one call. To stream a blob's bytes
    /// without allocating, use [`OscWriter::open_blob`] and
    /// [`OscWriter::bytes`] instead.
    pub fn blob(&mut self, value: &[u8]) -> Result<usize> {
        self.write_value('b', Some(&OscType::Blob(value.to_vec())))
    }

    /// Writes a value already wrapped as an [`OscType`].
    pub fn value(&mut self, value: &OscType) -> Result<usize> {
        self.write_value(value.type_tag(), Some(value))
    }

    /// Writes raw bytes into an open blob level. Not subject to padding
    /// or type-tag dispatch.
    pub fn bytes(&mut self, value: &[u8]) -> Result<usize> {
        let level = self.top()?;
        if level.kind != LevelKind::Blob {
            return Err(OscError::LevelType);
        }
        let start = self.cursor;
        if self.buf.len() < start + value.len() {
            return Err(OscError::Overrun {
                needed: start + value.len(),
                available: self.buf.len(),
            });
        }
        self.buf[start..start + value.len()].copy_from_slice(value);
        self.cursor += value.len();
        Ok(value.len())
    }

    /// Writes a complete, self-contained message without pushing a level
    /// (no subsequent value operations are needed or accepted).
    pub fn message(&mut self, msg: &Message) -> Result<usize> {
        self.check_top_level_guard()?;
        let prefixed = self.needs_prefix(true)?;
        let start = self.cursor;
        let n = message::encode_message(msg, prefixed, &mut self.buf[start..])?;
        self.cursor += n;
        if self.depth == 0 {
            self.committed = self.cursor;
            self.wrote_top_level = true;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_message_with_prefix_matches_s1() {
        let mut buf = [0u8; 32];
        let mut levels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut levels, SerialFlags::PSIZE);
        writer.open_message("abc", ",").unwrap();
        let n = writer.close(true).unwrap();
        assert_eq!(n, 12);
        assert_eq!(&buf[..12], &[0, 0, 0, 8, b'a', b'b', b'c', 0, b',', 0, 0, 0]);
    }

    #[test]
    fn skip_fills_missing_scalars_with_defaults() {
        let mut buf = [0u8; 32];
        let mut levels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut levels, SerialFlags::empty());
        writer.open_message("/x", ",if").unwrap();
        writer.int32(7).unwrap();
        writer.close(true).unwrap();
        let (decoded, _) = crate::message::decode_message(&buf, false).unwrap();
        assert_eq!(decoded.values, vec![OscType::Int(7), OscType::Float(0.0)]);
    }

    #[test]
    fn close_without_finalize_reports_missing_count() {
        let mut buf = [0u8; 32];
        let mut levels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut levels, SerialFlags::empty());
        writer.open_message("/x", ",if").unwrap();
        writer.int32(7).unwrap();
        assert!(matches!(
            writer.close(false),
            Err(OscError::Unfinished { missing: 1 })
        ));
    }

    #[test]
    fn second_top_level_packet_requires_psize() {
        let mut buf = [0u8; 64];
        let mut levels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut levels, SerialFlags::empty());
        writer.open_message("/a", ",").unwrap();
        writer.close(true).unwrap();
        assert!(matches!(writer.open_message("/b", ","), Err(OscError::PrefixFlag)));
    }

    #[test]
    fn open_bundle_inside_a_blob_level_is_rejected() {
        let mut buf = [0u8; 64];
        let mut levels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut levels, SerialFlags::empty());
        writer.open_message("/x", ",b").unwrap();
        writer.open_blob().unwrap();
        assert!(matches!(writer.open_bundle(TimeTag::IMMEDIATE), Err(OscError::LevelType)));
    }

    #[test]
    fn repeat_replays_an_array() {
        let mut buf = [0u8; 64];
        let mut levels = [Level::default(); 4];
        let mut writer = OscWriter::new(&mut buf, &mut levels, SerialFlags::empty());
        writer.open_message("/x", ",[f]").unwrap();
        writer.float32(1.0).unwrap();
        writer.repeat().unwrap();
        writer.float32(2.0).unwrap();
        let n = writer.close(true).unwrap();
        let (decoded, sz) = crate::message::decode_message(&buf[..n], false).unwrap();
        assert_eq!(sz, n);
        assert_eq!(decoded.values, vec![OscType::Float(1.0), OscType::Float(2.0)]);
    }
}
