//! Strict decoding of canonical CBOR.
//!
//! Only what [`to_canonical_cbor`](crate::to_canonical_cbor) can produce is
//! accepted, so a decoded value re-encodes to the exact input bytes.

use crate::encoder::{
    FALSE, FLOAT64, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_TAG, MAJOR_TEXT,
    MAJOR_UNSIGNED, NULL, TRUE,
};
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::cmp::Ordering;

/// Longest byte string, text string, array or map accepted.
const MAX_LEN: u64 = 256 * 1024 * 1024;

/// Deepest nesting of arrays and maps accepted.
const MAX_DEPTH: usize = 128;

/// Decodes exactly one value from `bytes`.
///
/// # Errors
///
/// Fails on truncated or trailing input, on anything a canonical encoder
/// would not write (long-form heads, unsorted or repeated map keys, narrow
/// floats, negative zero), and on items with no [`Value`] counterpart such
/// as tags and indefinite lengths.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut reader = Reader { rest: bytes };
    let value = reader.value(0)?;
    match reader.rest.len() {
        0 => Ok(value),
        count => Err(CodecError::TrailingBytes { count }),
    }
}

struct Reader<'a> {
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> CodecResult<u8> {
        let (&first, rest) = self.rest.split_first().ok_or(CodecError::UnexpectedEnd)?;
        self.rest = rest;
        Ok(first)
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if n > self.rest.len() {
            return Err(CodecError::UnexpectedEnd);
        }
        let (taken, rest) = self.rest.split_at(n);
        self.rest = rest;
        Ok(taken)
    }

    fn fixed<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    /// Reads the argument that follows an initial byte with additional
    /// info `info`, insisting on the shortest form.
    fn argument(&mut self, info: u8) -> CodecResult<u64> {
        let (arg, smallest) = match info {
            0..=23 => return Ok(info.into()),
            24 => (u64::from(self.byte()?), 24),
            25 => (u64::from(u16::from_be_bytes(self.fixed()?)), 0x100),
            26 => (u64::from(u32::from_be_bytes(self.fixed()?)), 0x1_0000),
            27 => (u64::from_be_bytes(self.fixed()?), 0x1_0000_0000),
            31 => return Err(CodecError::unsupported("indefinite-length item")),
            _ => return Err(CodecError::unsupported(format!("reserved additional info {info}"))),
        };
        if arg < smallest {
            return Err(CodecError::non_canonical("argument not in shortest form"));
        }
        Ok(arg)
    }

    fn length(&mut self, info: u8) -> CodecResult<usize> {
        let claimed = self.argument(info)?;
        let too_large = CodecError::TooLarge {
            claimed,
            limit: MAX_LEN,
        };
        if claimed > MAX_LEN {
            return Err(too_large);
        }
        usize::try_from(claimed).map_err(|_| too_large)
    }

    fn value(&mut self, depth: usize) -> CodecResult<Value> {
        let initial = self.byte()?;
        let (major, info) = (initial >> 5, initial & 0x1f);
        match major {
            MAJOR_UNSIGNED => i64::try_from(self.argument(info)?)
                .map(Value::Integer)
                .map_err(|_| CodecError::IntegerOverflow),
            MAJOR_NEGATIVE => i64::try_from(self.argument(info)?)
                .map(|n| Value::Integer(!n))
                .map_err(|_| CodecError::IntegerOverflow),
            MAJOR_BYTES => {
                let len = self.length(info)?;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            MAJOR_TEXT => {
                let len = self.length(info)?;
                let text = std::str::from_utf8(self.take(len)?).map_err(|_| CodecError::InvalidUtf8)?;
                Ok(Value::Text(text.to_owned()))
            }
            MAJOR_ARRAY => {
                let len = self.length(info)?;
                let depth = nested(depth)?;
                // every item takes at least a byte
                let mut items = Vec::with_capacity(len.min(self.rest.len()));
                for _ in 0..len {
                    items.push(self.value(depth)?);
                }
                Ok(Value::Array(items))
            }
            MAJOR_MAP => {
                let len = self.length(info)?;
                self.map(len, nested(depth)?)
            }
            MAJOR_TAG => Err(CodecError::unsupported("tagged item")),
            _ => self.simple(info),
        }
    }

    fn map(&mut self, len: usize, depth: usize) -> CodecResult<Value> {
        let mut entries = Vec::with_capacity(len.min(self.rest.len() / 2));
        let mut previous: Option<&'a [u8]> = None;
        for _ in 0..len {
            let before = self.rest;
            let key = self.value(depth)?;
            let encoded = &before[..before.len() - self.rest.len()];
            if let Some(previous) = previous {
                match previous.cmp(encoded) {
                    Ordering::Less => {}
                    Ordering::Equal => return Err(CodecError::DuplicateKey),
                    Ordering::Greater => {
                        return Err(CodecError::non_canonical("map keys out of order"))
                    }
                }
            }
            previous = Some(encoded);
            entries.push((key, self.value(depth)?));
        }
        Ok(Value::Map(entries))
    }

    fn simple(&mut self, info: u8) -> CodecResult<Value> {
        match info {
            FALSE => Ok(Value::Bool(false)),
            TRUE => Ok(Value::Bool(true)),
            NULL => Ok(Value::Null),
            FLOAT64 => {
                let f = f64::from_bits(u64::from_be_bytes(self.fixed()?));
                if !f.is_finite() {
                    return Err(CodecError::NonFiniteFloat);
                }
                if f == 0.0 && f.is_sign_negative() {
                    return Err(CodecError::non_canonical("negative zero"));
                }
                Ok(Value::Float(f))
            }
            25 | 26 => Err(CodecError::non_canonical("float narrower than 64 bits")),
            23 => Err(CodecError::unsupported("undefined")),
            31 => Err(CodecError::unsupported("break outside indefinite item")),
            _ => Err(CodecError::unsupported(format!("simple value {info}"))),
        }
    }
}

fn nested(depth: usize) -> CodecResult<usize> {
    if depth >= MAX_DEPTH {
        return Err(CodecError::TooDeep { limit: MAX_DEPTH });
    }
    Ok(depth + 1)
}
