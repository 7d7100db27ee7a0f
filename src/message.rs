//! L4.3/4.4: type-tag-driven value arrays and the composite message codec.
//!
//! Grounded on `original_source/cosc.c`'s `cosc_write_value` /
//! `cosc_read_value`, `cosc_write_values` / `cosc_read_values`, and
//! `cosc_write_message` / `cosc_read_message`. One deliberate departure: the
//! original pads a partially-supplied trailing array iteration with
//! zero/empty members before stopping (see its `cosc_write_values`); spec
//! §8.2 S4's worked example instead elides the whole trailing iteration when
//! too few values remain to complete it, which is what this module
//! implements (see DESIGN.md, OQ-5).

use crate::atom;
use crate::error::{OscError, Result};
use crate::signature;
use crate::timetag::TimeTag;
use crate::value::OscType;

fn check_ceiling(total: usize) -> Result<()> {
    if total > atom::SIZE_MAX {
        Err(OscError::SizeMax { limit: atom::SIZE_MAX })
    } else {
        Ok(())
    }
}

pub(crate) fn encode_one_value(tag_char: char, value: Option<&OscType>, buf: &mut [u8]) -> Result<usize> {
    if let Some(v) = value {
        if v.type_tag() != tag_char {
            return Err(OscError::MsgType {
                expected: tag_char,
                found: v.type_tag(),
            });
        }
    }
    match tag_char {
        'i' => atom::encode_i32(if let Some(OscType::Int(i)) = value { *i } else { 0 }, buf),
        'r' => atom::encode_u32(if let Some(OscType::Color(c)) = value { *c } else { 0 }, buf),
        'f' => atom::encode_f32(if let Some(OscType::Float(f)) = value { *f } else { 0.0 }, buf),
        'h' => atom::encode_i64(if let Some(OscType::Int64(h)) = value { *h } else { 0 }, buf),
        't' => atom::encode_u64(
            if let Some(OscType::Time(t)) = value { t.as_u64() } else { 0 },
            buf,
        ),
        'd' => atom::encode_f64(if let Some(OscType::Double(d)) = value { *d } else { 0.0 }, buf),
        'c' => atom::encode_char(if let Some(OscType::Char(c)) = value { *c } else { '\0' }, buf),
        'm' => atom::encode_midi(if let Some(OscType::Midi(m)) = value { *m } else { [0; 4] }, buf),
        's' => atom::encode_string(
            if let Some(OscType::String(s)) = value { s.as_str() } else { "" },
            buf,
        ),
        'S' => atom::encode_string(
            if let Some(OscType::Symbol(s)) = value { s.as_str() } else { "" },
            buf,
        ),
        'b' => atom::encode_blob(
            if let Some(OscType::Blob(b)) = value { b.as_slice() } else { &[] },
            buf,
        ),
        'T' | 'F' | 'N' | 'I' => Ok(0),
        _ => Err(OscError::Type { offset: 0 }),
    }
}

/// The encoded length `encode_one_value` would produce for `tag_char`,
/// without writing anything — used to check the size ceiling ahead of the
/// write itself.
fn value_encoded_len(tag_char: char, value: Option<&OscType>) -> Result<usize> {
    Ok(match tag_char {
        'i' | 'r' | 'f' | 'c' | 'm' => atom::WIDTH_32,
        'h' | 't' | 'd' => atom::WIDTH_64,
        's' => atom::string_encoded_len(if let Some(OscType::String(s)) = value { s } else { "" }),
        'S' => atom::string_encoded_len(if let Some(OscType::Symbol(s)) = value { s } else { "" }),
        'b' => atom::blob_encoded_len(if let Some(OscType::Blob(b)) = value { b } else { &[] }),
        'T' | 'F' | 'N' | 'I' => 0,
        _ => return Err(OscError::Type { offset: 0 }),
    })
}

pub(crate) fn decode_one_value(tag_char: char, buf: &[u8]) -> Result<(OscType, usize)> {
    match tag_char {
        'i' => atom::decode_i32(buf).map(|(v, n)| (OscType::Int(v), n)),
        'r' => atom::decode_u32(buf).map(|(v, n)| (OscType::Color(v), n)),
        'f' => atom::decode_f32(buf).map(|(v, n)| (OscType::Float(v), n)),
        'h' => atom::decode_i64(buf).map(|(v, n)| (OscType::Int64(v), n)),
        't' => atom::decode_u64(buf).map(|(v, n)| (OscType::Time(TimeTag::from(v)), n)),
        'd' => atom::decode_f64(buf).map(|(v, n)| (OscType::Double(v), n)),
        'c' => atom::decode_char(buf).map(|(v, n)| (OscType::Char(v), n)),
        'm' => atom::decode_midi(buf).map(|(v, n)| (OscType::Midi(v), n)),
        's' => atom::decode_string(buf).map(|(v, n)| (OscType::String(v), n)),
        'S' => atom::decode_string(buf).map(|(v, n)| (OscType::Symbol(v), n)),
        'b' => atom::decode_blob(buf).map(|(v, n)| (OscType::Blob(v), n)),
        'T' => Ok((OscType::True, 0)),
        'F' => Ok((OscType::False, 0)),
        'N' => Ok((OscType::Nil, 0)),
        'I' => Ok((OscType::Infinitum, 0)),
        _ => Err(OscError::Type { offset: 0 }),
    }
}

/// Encodes `values` against `type_tag` (e.g. `",i[fff]"`), returning the
/// bytes written and the number of `values` elements consumed. A `[...]`
/// run repeats for as long as enough values remain to fill a whole
/// iteration; once too few remain, the trailing partial iteration is
/// elided rather than zero-padded.
pub fn encode_values(type_tag: &str, values: &[OscType], buf: &mut [u8]) -> Result<(usize, usize)> {
    let tag = type_tag.as_bytes();
    if tag.is_empty() || tag[0] != b',' {
        return Err(OscError::Type { offset: 0 });
    }

    let mut tlen = 1;
    let mut vlen = 0;
    let mut req = 0;
    let mut array_start: Option<usize> = None;

    while tlen < tag.len() && tag[tlen] != 0 {
        match tag[tlen] {
            b'[' => {
                if array_start.is_some() {
                    return Err(OscError::Type { offset: tlen });
                }
                tlen += 1;
                array_start = Some(tlen);
            }
            b']' => {
                let start = array_start.ok_or(OscError::Type { offset: tlen })?;
                let iter_len = tlen - start;
                if iter_len == 0 || vlen + iter_len > values.len() {
                    tlen += 1;
                    array_start = None;
                } else {
                    tlen = start;
                }
            }
            c => {
                let value = values.get(vlen);
                let value_len = value_encoded_len(c as char, value)?;
                if value_len > atom::SIZE_MAX - req {
                    return Err(OscError::SizeMax { limit: atom::SIZE_MAX });
                }
                let sz = encode_one_value(c as char, value, &mut buf[req..])?;
                req += sz;
                tlen += 1;
                if sz > 0 {
                    vlen += 1;
                }
            }
        }
    }
    if array_start.is_some() {
        return Err(OscError::Type { offset: tlen });
    }
    Ok((req, vlen))
}

/// Decodes values out of `buf` per `type_tag`. A `[...]` run repeats until
/// either the type tag ends or the buffer can no longer supply a whole
/// iteration, at which point the run stops gracefully (the buffer running
/// out mid-iteration is not an error: it is how a truncated trailing array
/// iteration is detected).
pub fn decode_values(type_tag: &str, buf: &[u8]) -> Result<(Vec<OscType>, usize)> {
    let tag = type_tag.as_bytes();
    if tag.is_empty() || tag[0] != b',' {
        return Err(OscError::Type { offset: 0 });
    }

    let mut tlen = 1;
    let mut req = 0;
    let mut array_start: Option<usize> = None;
    let mut values = Vec::new();

    while tlen < tag.len() && tag[tlen] != 0 {
        match tag[tlen] {
            b'[' => {
                if array_start.is_some() {
                    return Err(OscError::Type { offset: tlen });
                }
                tlen += 1;
                array_start = Some(tlen);
            }
            b']' => {
                let start = array_start.ok_or(OscError::Type { offset: tlen })?;
                if start == tlen {
                    tlen += 1;
                    array_start = None;
                    continue;
                }
                match decode_run(&tag[start..tlen], &buf[req..]) {
                    Ok((items, consumed)) => {
                        values.extend(items);
                        req += consumed;
                        tlen = start;
                    }
                    Err(OscError::Overrun { .. }) => {
                        tlen += 1;
                        array_start = None;
                    }
                    Err(e) => return Err(e),
                }
            }
            c => {
                let (value, sz) = decode_one_value(c as char, &buf[req..])?;
                values.push(value);
                req += sz;
                tlen += 1;
            }
        }
    }
    if array_start.is_some() {
        return Err(OscError::Type { offset: tlen });
    }
    Ok((values, req))
}

fn decode_run(tag_chars: &[u8], buf: &[u8]) -> Result<(Vec<OscType>, usize)> {
    let mut items = Vec::with_capacity(tag_chars.len());
    let mut req = 0;
    for &c in tag_chars {
        let (value, sz) = decode_one_value(c as char, &buf[req..])?;
        items.push(value);
        req += sz;
    }
    Ok((items, req))
}

/// A full OSC message: an address, a type tag (which may name `[...]`
/// arrays), and the values it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub address: String,
    pub type_tag: String,
    pub values: Vec<OscType>,
}

/// Encodes a message. When `prefixed`, a 4-byte length prefix covering
/// everything after it (signature and values) is written first and
/// back-patched once the true total is known — the signature's own
/// internal back-patch only accounts for itself, so this overwrites it
/// with the grand total.
pub fn encode_message(message: &Message, prefixed: bool, buf: &mut [u8]) -> Result<usize> {
    let mut req = signature::encode_signature(&message.address, &message.type_tag, prefixed, buf)?;
    check_ceiling(req)?;
    let (sz, _) = encode_values(&message.type_tag, &message.values, &mut buf[req..])?;
    if sz > atom::SIZE_MAX - req {
        return Err(OscError::SizeMax { limit: atom::SIZE_MAX });
    }
    req += sz;
    if prefixed {
        atom::encode_i32((req - 4) as i32, &mut buf[..4])?;
    }
    Ok(req)
}

/// Decodes a message.
pub fn decode_message(buf: &[u8], prefixed: bool) -> Result<(Message, usize)> {
    let (address, type_tag, mut req) = signature::decode_signature(buf, prefixed)?;
    let (values, sz) = decode_values(&type_tag, &buf[req..])?;
    if sz > atom::SIZE_MAX - req {
        return Err(OscError::SizeMax { limit: atom::SIZE_MAX });
    }
    req += sz;
    Ok((
        Message {
            address,
            type_tag,
            values,
        },
        req,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_values_round_trip() {
        let values = vec![OscType::Int(42), OscType::Float(1.5), OscType::String("hi".into())];
        let mut buf = [0u8; 64];
        let (n, consumed) = encode_values(",ifs", &values, &mut buf).unwrap();
        assert_eq!(consumed, 3);
        let (decoded, sz) = decode_values(",ifs", &buf[..n]).unwrap();
        assert_eq!(decoded, values);
        assert_eq!(sz, n);
    }

    #[test]
    fn nilary_tags_consume_no_bytes_and_no_values() {
        let values = [OscType::True, OscType::Nil];
        let mut buf = [0u8; 4];
        let (n, consumed) = encode_values(",TN", &values, &mut buf).unwrap();
        assert_eq!(n, 0);
        assert_eq!(consumed, 0);
        let (decoded, sz) = decode_values(",TN", &buf).unwrap();
        assert_eq!(decoded, vec![OscType::True, OscType::Nil]);
        assert_eq!(sz, 0);
    }

    #[test]
    fn array_repeats_for_every_full_group_of_supplied_values() {
        let mut values = vec![OscType::Int(10)];
        values.extend((0..30).map(|_| OscType::Float(1.0)));
        let mut buf = [0u8; 256];
        let (n, consumed) = encode_values(",i[fff]", &values, &mut buf).unwrap();
        assert_eq!(n, 4 + 12 * 10);
        assert_eq!(consumed, 31);

        let (decoded, sz) = decode_values(",i[fff]", &buf[..n]).unwrap();
        assert_eq!(sz, n);
        assert_eq!(decoded.len(), 31);
        assert_eq!(decoded[0], OscType::Int(10));
        assert!(decoded[1..].iter().all(|v| *v == OscType::Float(1.0)));
    }

    #[test]
    fn trailing_partial_array_iteration_is_elided_not_padded() {
        let mut values = vec![OscType::Int(10)];
        values.extend((0..28).map(|_| OscType::Float(1.0)));
        let mut buf = [0u8; 256];
        let (n, consumed) = encode_values(",i[fff]", &values, &mut buf).unwrap();
        assert_eq!(n, 4 + 12 * 9);
        assert_eq!(consumed, 1 + 27);
    }

    #[test]
    fn decode_elides_a_truncated_trailing_iteration() {
        let values = vec![OscType::Int(10), OscType::Float(1.0), OscType::Float(2.0), OscType::Float(3.0)];
        let mut buf = [0u8; 64];
        let (n, _) = encode_values(",i[fff]", &values, &mut buf).unwrap();
        // Truncate the buffer mid-way through a would-be second iteration.
        let truncated = &buf[..n + 4];
        let (decoded, sz) = decode_values(",i[fff]", truncated).unwrap();
        assert_eq!(decoded, values);
        assert_eq!(sz, n);
    }

    #[test]
    fn value_type_mismatch_is_rejected() {
        let values = vec![OscType::Float(1.0)];
        let mut buf = [0u8; 8];
        assert!(matches!(
            encode_values(",i", &values, &mut buf),
            Err(OscError::MsgType {
                expected: 'i',
                found: 'f'
            })
        ));
    }

    #[test]
    fn message_round_trips_with_prefix() {
        let msg = Message {
            address: "/synth/freq".to_string(),
            type_tag: ",if".to_string(),
            values: vec![OscType::Int(1), OscType::Float(440.0)],
        };
        let mut buf = [0u8; 64];
        let n = encode_message(&msg, true, &mut buf).unwrap();
        let (decoded, consumed) = decode_message(&buf, true).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(consumed, n);
    }

    #[test]
    fn message_round_trips_without_prefix() {
        let msg = Message {
            address: "/ping".to_string(),
            type_tag: ",".to_string(),
            values: vec![],
        };
        let mut buf = [0u8; 32];
        let n = encode_message(&msg, false, &mut buf).unwrap();
        let (decoded, consumed) = decode_message(&buf, false).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(consumed, n);
    }
}
