//! Deterministic CBOR encoding (RFC 8949 §4.2.1).
//!
//! - Every head uses the shortest argument width.
//! - Map entries are ordered by the bytewise order of their encoded keys,
//!   and a repeated key is an error.
//! - Floats are always written as 64-bit, with `-0.0` folded into `0.0`.
//!   NaN and infinities are rejected.
//! - No tags and no indefinite lengths.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

pub(crate) const MAJOR_UNSIGNED: u8 = 0;
pub(crate) const MAJOR_NEGATIVE: u8 = 1;
pub(crate) const MAJOR_BYTES: u8 = 2;
pub(crate) const MAJOR_TEXT: u8 = 3;
pub(crate) const MAJOR_ARRAY: u8 = 4;
pub(crate) const MAJOR_MAP: u8 = 5;
pub(crate) const MAJOR_TAG: u8 = 6;
pub(crate) const MAJOR_SIMPLE: u8 = 7;

pub(crate) const FALSE: u8 = 20;
pub(crate) const TRUE: u8 = 21;
pub(crate) const NULL: u8 = 22;
pub(crate) const FLOAT64: u8 = 27;

/// Encodes `value` to its canonical CBOR bytes.
///
/// Values that compare equal encode identically, which is what index
/// postings rely on.
///
/// # Errors
///
/// Fails on a non-finite float or a map with a repeated key.
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    write_value(&mut out, value)?;
    Ok(out)
}

/// Writes an item head: the major type in the top three bits, then `arg`
/// in the narrowest form that holds it.
#[allow(clippy::cast_possible_truncation)]
fn write_head(out: &mut Vec<u8>, major: u8, arg: u64) {
    let major = major << 5;
    match arg {
        0..=23 => out.push(major | arg as u8),
        24..=0xff => out.extend_from_slice(&[major | 24, arg as u8]),
        0x100..=0xffff => {
            out.push(major | 25);
            out.extend_from_slice(&(arg as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(major | 26);
            out.extend_from_slice(&(arg as u32).to_be_bytes());
        }
        _ => {
            out.push(major | 27);
            out.extend_from_slice(&arg.to_be_bytes());
        }
    }
}

pub(crate) const fn simple(code: u8) -> u8 {
    (MAJOR_SIMPLE << 5) | code
}

fn write_len(out: &mut Vec<u8>, major: u8, len: usize) {
    write_head(out, major, len as u64);
}

#[allow(clippy::cast_sign_loss)]
fn write_value(out: &mut Vec<u8>, value: &Value) -> CodecResult<()> {
    match value {
        Value::Null => out.push(simple(NULL)),
        Value::Bool(false) => out.push(simple(FALSE)),
        Value::Bool(true) => out.push(simple(TRUE)),
        // a negative n is carried as -1 - n, which `!n` computes without overflow
        Value::Integer(n) if *n < 0 => write_head(out, MAJOR_NEGATIVE, !*n as u64),
        Value::Integer(n) => write_head(out, MAJOR_UNSIGNED, *n as u64),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(CodecError::NonFiniteFloat);
            }
            let f = if *f == 0.0 { 0.0 } else { *f };
            out.push(simple(FLOAT64));
            out.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        Value::Bytes(bytes) => {
            write_len(out, MAJOR_BYTES, bytes.len());
            out.extend_from_slice(bytes);
        }
        Value::Text(text) => {
            write_len(out, MAJOR_TEXT, text.len());
            out.extend_from_slice(text.as_bytes());
        }
        Value::Array(items) => {
            write_len(out, MAJOR_ARRAY, items.len());
            for item in items {
                write_value(out, item)?;
            }
        }
        Value::Map(entries) => write_map(out, entries)?,
    }
    Ok(())
}

fn write_map(out: &mut Vec<u8>, entries: &[(Value, Value)]) -> CodecResult<()> {
    let mut keyed = entries
        .iter()
        .map(|(k, v)| Ok((to_canonical_cbor(k)?, v)))
        .collect::<CodecResult<Vec<_>>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    if keyed.windows(2).any(|pair| pair[0].0 == pair[1].0) {
        return Err(CodecError::DuplicateKey);
    }

    write_len(out, MAJOR_MAP, keyed.len());
    for (key, value) in keyed {
        out.extend_from_slice(&key);
        write_value(out, value)?;
    }
    Ok(())
}
