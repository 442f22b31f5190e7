//! Canonical CBOR encoding for [`Value`].
//!
//! Every value kind has exactly one wire form, so a given logical value
//! always produces the same bytes. Exact-number kinds ride on CBOR tags:
//! the registered tags 4 (decimal fraction), 30 (rational), and 37 (UUID),
//! plus application tags in the first-come-first-served space for the kinds
//! CBOR has no registered shape for.

use indexmap::IndexMap;

use crate::value::{Complex, Decimal, Rational, Span, Timestamp, Value};

use ciborium::value::Value as Cbor;

const TAG_DECIMAL: u64 = 4;
const TAG_RATIONAL: u64 = 30;
const TAG_UUID: u64 = 37;
// Application tags, first-come-first-served range.
const TAG_COMPLEX: u64 = 43_000;
const TAG_CHAR: u64 = 43_001;
const TAG_TIMESTAMP: u64 = 43_002;
const TAG_SPAN: u64 = 43_003;

/// Error type for encoding failures.
#[derive(Debug, thiserror::Error)]
#[error("value could not be encoded: {0}")]
pub struct EncodeError(#[from] ciborium::ser::Error<std::io::Error>);

/// Error type for decoding failures.
///
/// A corrupt record is always surfaced, never treated as absent.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed record: {0}")]
    Malformed(#[from] ciborium::de::Error<std::io::Error>),
    #[error("unknown tag {0}")]
    UnknownTag(u64),
    #[error("integer out of range")]
    IntRange,
    #[error("invalid {0} payload")]
    BadPayload(&'static str),
}

/// Encodes a value to its canonical byte form.
///
/// Numeric canonicalization ([`Value::canonicalized`]) is applied first, so
/// an integer-valued float, complex, decimal, or rational is stored as an
/// integer.
pub fn encode(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let canonical = value.clone().canonicalized();
    let mut buf = Vec::new();
    ciborium::ser::into_writer(&to_cbor(&canonical), &mut buf)?;
    Ok(buf)
}

/// Decodes a stored record back into a value.
pub fn decode(bytes: &[u8]) -> Result<Value, DecodeError> {
    let raw: Cbor = ciborium::de::from_reader(bytes)?;
    from_cbor(raw)
}

/// Decodes a record that may be absent. `None` (nothing stored) maps to
/// `Ok(None)`; stored bytes decode as in [`decode`].
pub fn decode_maybe(bytes: Option<&[u8]>) -> Result<Option<Value>, DecodeError> {
    bytes.map(decode).transpose()
}

pub(crate) fn to_cbor(value: &Value) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Int(i) => Cbor::Integer((*i).into()),
        Value::Float(f) => Cbor::Float(*f),
        Value::Complex(c) => tagged(
            TAG_COMPLEX,
            Cbor::Array(vec![Cbor::Float(c.re), Cbor::Float(c.im)]),
        ),
        Value::Decimal(d) => tagged(
            TAG_DECIMAL,
            Cbor::Array(vec![
                Cbor::Integer(d.exponent.into()),
                Cbor::Integer(d.mantissa.into()),
            ]),
        ),
        Value::Rational(r) => tagged(
            TAG_RATIONAL,
            Cbor::Array(vec![
                Cbor::Integer(r.numer().into()),
                Cbor::Integer(r.denom().into()),
            ]),
        ),
        Value::Char(c) => tagged(TAG_CHAR, Cbor::Text(c.to_string())),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Bytes(b) => Cbor::Bytes(b.clone()),
        Value::Timestamp(t) => tagged(
            TAG_TIMESTAMP,
            Cbor::Array(vec![
                Cbor::Integer(t.secs.into()),
                Cbor::Integer(t.nanos.into()),
            ]),
        ),
        Value::Span(s) => tagged(
            TAG_SPAN,
            Cbor::Array(vec![
                Cbor::Integer(s.secs.into()),
                Cbor::Integer(s.nanos.into()),
            ]),
        ),
        Value::Uuid(u) => tagged(TAG_UUID, Cbor::Bytes(u.as_bytes().to_vec())),
        Value::Seq(items) => Cbor::Array(items.iter().map(to_cbor).collect()),
        Value::Map(entries) => Cbor::Map(
            entries
                .iter()
                .map(|(k, v)| (to_cbor(k), to_cbor(v)))
                .collect(),
        ),
    }
}

fn tagged(tag: u64, inner: Cbor) -> Cbor {
    Cbor::Tag(tag, Box::new(inner))
}

pub(crate) fn from_cbor(raw: Cbor) -> Result<Value, DecodeError> {
    Ok(match raw {
        Cbor::Null => Value::Null,
        Cbor::Bool(b) => Value::Bool(b),
        Cbor::Integer(i) => Value::Int(i64::try_from(i).map_err(|_| DecodeError::IntRange)?),
        Cbor::Float(f) => Value::Float(f),
        Cbor::Text(s) => Value::Text(s),
        Cbor::Bytes(b) => Value::Bytes(b),
        Cbor::Array(items) => Value::Seq(
            items
                .into_iter()
                .map(from_cbor)
                .collect::<Result<_, _>>()?,
        ),
        Cbor::Map(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for (k, v) in entries {
                map.insert(from_cbor(k)?, from_cbor(v)?);
            }
            Value::Map(map)
        }
        Cbor::Tag(tag, inner) => from_tagged(tag, *inner)?,
        _ => return Err(DecodeError::BadPayload("item")),
    })
}

fn from_tagged(tag: u64, inner: Cbor) -> Result<Value, DecodeError> {
    match tag {
        TAG_DECIMAL => {
            let [e, m] = array(inner, "decimal")?;
            let exponent = i32::try_from(int(e, "decimal")?)
                .map_err(|_| DecodeError::BadPayload("decimal"))?;
            Ok(Value::Decimal(Decimal::new(int(m, "decimal")?, exponent)))
        }
        TAG_RATIONAL => {
            let [n, d] = array(inner, "rational")?;
            Rational::new(int(n, "rational")?, int(d, "rational")?)
                .map(Value::Rational)
                .ok_or(DecodeError::BadPayload("rational"))
        }
        TAG_UUID => match inner {
            Cbor::Bytes(b) => {
                let bytes: [u8; 16] =
                    b.try_into().map_err(|_| DecodeError::BadPayload("uuid"))?;
                Ok(Value::Uuid(uuid::Uuid::from_bytes(bytes)))
            }
            _ => Err(DecodeError::BadPayload("uuid")),
        },
        TAG_COMPLEX => {
            let [re, im] = array(inner, "complex")?;
            Ok(Value::Complex(Complex::new(
                float(re, "complex")?,
                float(im, "complex")?,
            )))
        }
        TAG_CHAR => match inner {
            Cbor::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(DecodeError::BadPayload("char")),
                }
            }
            _ => Err(DecodeError::BadPayload("char")),
        },
        TAG_TIMESTAMP => {
            let [secs, nanos] = array(inner, "timestamp")?;
            Ok(Value::Timestamp(Timestamp::new(
                int(secs, "timestamp")?,
                subsec(nanos, "timestamp")?,
            )))
        }
        TAG_SPAN => {
            let [secs, nanos] = array(inner, "span")?;
            Ok(Value::Span(Span::new(
                int(secs, "span")?,
                subsec(nanos, "span")?,
            )))
        }
        other => Err(DecodeError::UnknownTag(other)),
    }
}

fn array(inner: Cbor, what: &'static str) -> Result<[Cbor; 2], DecodeError> {
    match inner {
        Cbor::Array(items) => {
            <[Cbor; 2]>::try_from(items).map_err(|_| DecodeError::BadPayload(what))
        }
        _ => Err(DecodeError::BadPayload(what)),
    }
}

fn int(item: Cbor, what: &'static str) -> Result<i64, DecodeError> {
    match item {
        Cbor::Integer(i) => i64::try_from(i).map_err(|_| DecodeError::IntRange),
        _ => Err(DecodeError::BadPayload(what)),
    }
}

fn subsec(item: Cbor, what: &'static str) -> Result<u32, DecodeError> {
    u32::try_from(int(item, what)?).map_err(|_| DecodeError::BadPayload(what))
}

fn float(item: Cbor, what: &'static str) -> Result<f64, DecodeError> {
    match item {
        Cbor::Float(f) => Ok(f),
        _ => Err(DecodeError::BadPayload(what)),
    }
}
