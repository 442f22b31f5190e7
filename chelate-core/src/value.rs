use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::codec;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// A value storable in a chelate.
///
/// This is a closed tagged-variant model: rather than serializing arbitrary
/// host objects, every supported kind is enumerated here and carries its own
/// canonical encoding (see [`crate::codec`]).
///
/// `Value` implements `Eq` and `Hash` so it can serve as a map key — both for
/// the per-instance cache and for the `Map` variant itself. Floats compare
/// and hash by bit pattern, which makes the impls lawful at the cost of
/// `Float(0.0) != Float(-0.0)`; integer-valued floats are narrowed to `Int`
/// by [`Value::canonicalized`] before they ever reach a key position.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(Complex),
    Decimal(Decimal),
    Rational(Rational),
    Char(char),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(Timestamp),
    Span(Span),
    Uuid(uuid::Uuid),
    Seq(Vec<Value>),
    Map(IndexMap<Value, Value>),
}

impl Value {
    /// Applies numeric canonicalization: a float, complex, decimal, or
    /// rational value exactly equal to an `i64` is narrowed to `Int`.
    ///
    /// NaN and infinities are kept unchanged, as are values whose integral
    /// form does not fit `i64`. Narrowing applies to the top-level value
    /// only, never inside `Seq` or `Map`.
    pub fn canonicalized(self) -> Value {
        match self {
            Value::Float(f) => match float_to_i64(f) {
                Some(i) => Value::Int(i),
                None => Value::Float(f),
            },
            Value::Complex(c) => match c.as_int() {
                Some(i) => Value::Int(i),
                None => Value::Complex(c),
            },
            Value::Decimal(d) => match d.as_int() {
                Some(i) => Value::Int(i),
                None => Value::Decimal(d),
            },
            Value::Rational(r) => match r.as_int() {
                Some(i) => Value::Int(i),
                None => Value::Rational(r),
            },
            other => other,
        }
    }
}

/// Converts a float to the equal `i64`, if one exists.
///
/// Returns `None` for NaN, infinities, non-integral values, and integral
/// values outside the `i64` range.
pub(crate) fn float_to_i64(f: f64) -> Option<i64> {
    // 2^63 as f64; values in [-2^63, 2^63) cast losslessly once integral.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    if !(-LIMIT..LIMIT).contains(&f) {
        return None;
    }
    Some(f as i64)
}

/// A complex number with `f64` parts.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }

    /// The equal `i64`, if the imaginary part is zero and the real part is
    /// an in-range integer.
    pub fn as_int(&self) -> Option<i64> {
        if self.im == 0.0 {
            float_to_i64(self.re)
        } else {
            None
        }
    }
}

impl PartialEq for Complex {
    fn eq(&self, other: &Self) -> bool {
        self.re.to_bits() == other.re.to_bits() && self.im.to_bits() == other.im.to_bits()
    }
}

impl Eq for Complex {}

impl Hash for Complex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.re.to_bits().hash(state);
        self.im.to_bits().hash(state);
    }
}

/// A decimal number `mantissa * 10^exponent`.
///
/// Equality is representational: `Decimal::new(10, -1)` and
/// `Decimal::new(1, 0)` denote the same number but compare unequal.
/// Integer-valued decimals are narrowed to `Int` by canonicalization, which
/// removes the ambiguity for every value that can appear as a map key in
/// canonical form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decimal {
    pub mantissa: i64,
    pub exponent: i32,
}

impl Decimal {
    pub fn new(mantissa: i64, exponent: i32) -> Self {
        Decimal { mantissa, exponent }
    }

    /// The equal `i64`, if one exists. Scaling that overflows `i64` yields
    /// `None`, leaving the decimal unchanged under canonicalization.
    pub fn as_int(&self) -> Option<i64> {
        if self.exponent >= 0 {
            if self.mantissa == 0 {
                return Some(0);
            }
            let scale = 10i64.checked_pow(u32::try_from(self.exponent).ok()?)?;
            self.mantissa.checked_mul(scale)
        } else {
            match 10i64.checked_pow(self.exponent.unsigned_abs()) {
                Some(scale) => (self.mantissa % scale == 0).then(|| self.mantissa / scale),
                // 10^|exponent| exceeds i64: only zero is integral.
                None => (self.mantissa == 0).then_some(0),
            }
        }
    }
}

/// A rational number, normalized so `denom > 0` and gcd(numer, denom) == 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    numer: i64,
    denom: i64,
}

impl Rational {
    /// Builds a normalized rational. Returns `None` for a zero denominator
    /// or when normalization leaves the parts outside `i64`.
    pub fn new(numer: i64, denom: i64) -> Option<Self> {
        if denom == 0 {
            return None;
        }
        let mut n = i128::from(numer);
        let mut d = i128::from(denom);
        if d < 0 {
            n = -n;
            d = -d;
        }
        let g = gcd(n.unsigned_abs(), d.unsigned_abs()) as i128;
        Some(Rational {
            numer: i64::try_from(n / g).ok()?,
            denom: i64::try_from(d / g).ok()?,
        })
    }

    pub fn numer(&self) -> i64 {
        self.numer
    }

    pub fn denom(&self) -> i64 {
        self.denom
    }

    /// The equal `i64`, if the denominator divides the numerator.
    pub fn as_int(&self) -> Option<i64> {
        (self.numer % self.denom == 0).then(|| self.numer / self.denom)
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// An instant as seconds and subsecond nanoseconds relative to the Unix
/// epoch. Negative `secs` denote instants before the epoch; `nanos` always
/// count forward from `secs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn new(secs: i64, nanos: u32) -> Self {
        Timestamp {
            secs: secs.saturating_add(i64::from(nanos / NANOS_PER_SEC)),
            nanos: nanos % NANOS_PER_SEC,
        }
    }
}

/// A signed duration as seconds and subsecond nanoseconds. The sign lives on
/// `secs`; `nanos` always count forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub secs: i64,
    pub nanos: u32,
}

impl Span {
    pub fn new(secs: i64, nanos: u32) -> Self {
        Span {
            secs: secs.saturating_add(i64::from(nanos / NANOS_PER_SEC)),
            nanos: nanos % NANOS_PER_SEC,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Complex(a), Complex(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (Rational(a), Rational(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Text(a), Text(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (Span(a), Span(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            (Seq(a), Seq(b)) => a == b,
            // IndexMap equality is order-independent.
            (Map(a), Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use Value::*;
        match self {
            Null => state.write_u8(0),
            Bool(b) => {
                state.write_u8(1);
                b.hash(state);
            }
            Int(i) => {
                state.write_u8(2);
                i.hash(state);
            }
            Float(f) => {
                state.write_u8(3);
                f.to_bits().hash(state);
            }
            Complex(c) => {
                state.write_u8(4);
                c.hash(state);
            }
            Decimal(d) => {
                state.write_u8(5);
                d.hash(state);
            }
            Rational(r) => {
                state.write_u8(6);
                r.hash(state);
            }
            Char(c) => {
                state.write_u8(7);
                c.hash(state);
            }
            Text(s) => {
                state.write_u8(8);
                s.hash(state);
            }
            Bytes(b) => {
                state.write_u8(9);
                b.hash(state);
            }
            Timestamp(t) => {
                state.write_u8(10);
                t.hash(state);
            }
            Span(s) => {
                state.write_u8(11);
                s.hash(state);
            }
            Uuid(u) => {
                state.write_u8(12);
                u.hash(state);
            }
            Seq(items) => {
                state.write_u8(13);
                items.hash(state);
            }
            Map(entries) => {
                // Order-independent, to stay consistent with IndexMap's
                // order-independent equality: combine per-entry hashes
                // commutatively.
                state.write_u8(14);
                let mut acc: u64 = 0;
                for (k, v) in entries {
                    let mut entry = std::collections::hash_map::DefaultHasher::new();
                    k.hash(&mut entry);
                    v.hash(&mut entry);
                    acc ^= entry.finish();
                }
                state.write_u64(acc);
                state.write_usize(entries.len());
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Complex(c) => {
                if c.im.is_sign_negative() {
                    write!(f, "{}-{}i", c.re, -c.im)
                } else {
                    write!(f, "{}+{}i", c.re, c.im)
                }
            }
            Value::Decimal(d) => write!(f, "{}e{}", d.mantissa, d.exponent),
            Value::Rational(r) => write!(f, "{}/{}", r.numer, r.denom),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Timestamp(t) => write!(f, "@{}.{:09}", t.secs, t.nanos),
            Value::Span(s) => write!(f, "{}.{:09}s", s.secs, s.nanos),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        codec::to_cbor(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = ciborium::value::Value::deserialize(deserializer)?;
        codec::from_cbor(raw).map_err(serde::de::Error::custom)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(u: uuid::Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<Complex> for Value {
    fn from(c: Complex) -> Self {
        Value::Complex(c)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<Rational> for Value {
    fn from(r: Rational) -> Self {
        Value::Rational(r)
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Span> for Value {
    fn from(s: Span) -> Self {
        Value::Span(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

impl From<IndexMap<Value, Value>> for Value {
    fn from(entries: IndexMap<Value, Value>) -> Self {
        Value::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_float_narrows() {
        assert_eq!(Value::Float(3.0).canonicalized(), Value::Int(3));
        assert_eq!(Value::Float(-0.0).canonicalized(), Value::Int(0));
    }

    #[test]
    fn non_integral_float_kept() {
        assert_eq!(Value::Float(2.5).canonicalized(), Value::Float(2.5));
    }

    #[test]
    fn nan_and_infinity_kept() {
        match Value::Float(f64::NAN).canonicalized() {
            Value::Float(f) => assert!(f.is_nan()),
            other => panic!("expected float, got {:?}", other),
        }
        assert_eq!(
            Value::Float(f64::INFINITY).canonicalized(),
            Value::Float(f64::INFINITY)
        );
        assert_eq!(
            Value::Float(f64::NEG_INFINITY).canonicalized(),
            Value::Float(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn huge_integral_float_kept() {
        // Integral but far outside i64.
        assert_eq!(Value::Float(1e30).canonicalized(), Value::Float(1e30));
    }

    #[test]
    fn complex_with_zero_imaginary_narrows() {
        assert_eq!(
            Value::Complex(Complex::new(4.0, 0.0)).canonicalized(),
            Value::Int(4)
        );
        assert_eq!(
            Value::Complex(Complex::new(4.0, -0.0)).canonicalized(),
            Value::Int(4)
        );
    }

    #[test]
    fn complex_with_imaginary_kept() {
        let c = Complex::new(4.0, 2.0);
        assert_eq!(Value::Complex(c).canonicalized(), Value::Complex(c));
    }

    #[test]
    fn decimal_narrowing() {
        assert_eq!(Value::Decimal(Decimal::new(10, -1)).canonicalized(), Value::Int(1));
        assert_eq!(Value::Decimal(Decimal::new(3, 2)).canonicalized(), Value::Int(300));
        let d = Decimal::new(25, -1); // 2.5
        assert_eq!(Value::Decimal(d).canonicalized(), Value::Decimal(d));
    }

    #[test]
    fn decimal_zero_narrows_at_any_scale() {
        assert_eq!(Value::Decimal(Decimal::new(0, 100)).canonicalized(), Value::Int(0));
        assert_eq!(Value::Decimal(Decimal::new(0, -100)).canonicalized(), Value::Int(0));
    }

    #[test]
    fn decimal_overflow_kept() {
        let d = Decimal::new(i64::MAX, 3);
        assert_eq!(Value::Decimal(d).canonicalized(), Value::Decimal(d));
    }

    #[test]
    fn rational_normalizes() {
        let r = Rational::new(2, -4).unwrap();
        assert_eq!((r.numer(), r.denom()), (-1, 2));
        assert!(Rational::new(1, 0).is_none());
    }

    #[test]
    fn rational_narrowing() {
        assert_eq!(
            Value::Rational(Rational::new(6, 3).unwrap()).canonicalized(),
            Value::Int(2)
        );
        let r = Rational::new(1, 3).unwrap();
        assert_eq!(Value::Rational(r).canonicalized(), Value::Rational(r));
    }

    #[test]
    fn nan_values_compare_equal_bitwise() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn map_equality_ignores_order() {
        let mut a = IndexMap::new();
        a.insert(Value::from("x"), Value::from(1i64));
        a.insert(Value::from("y"), Value::from(2i64));
        let mut b = IndexMap::new();
        b.insert(Value::from("y"), Value::from(2i64));
        b.insert(Value::from("x"), Value::from(1i64));
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn map_hash_ignores_order() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of(v: &Value) -> u64 {
            let mut h = DefaultHasher::new();
            v.hash(&mut h);
            h.finish()
        }

        let mut a = IndexMap::new();
        a.insert(Value::from("x"), Value::from(1i64));
        a.insert(Value::from("y"), Value::from(2i64));
        let mut b = IndexMap::new();
        b.insert(Value::from("y"), Value::from(2i64));
        b.insert(Value::from("x"), Value::from(1i64));
        assert_eq!(hash_of(&Value::Map(a)), hash_of(&Value::Map(b)));
    }

    #[test]
    fn timestamp_normalizes_nanos() {
        assert_eq!(Timestamp::new(1, 1_500_000_000), Timestamp::new(2, 500_000_000));
    }

    #[test]
    fn display_renders_plain_mapping() {
        let mut m = IndexMap::new();
        m.insert(Value::from("10"), Value::from("ten"));
        m.insert(Value::from(5i64), Value::Seq(vec![Value::Bool(true)]));
        assert_eq!(Value::Map(m).to_string(), r#"{"10": "ten", 5: [true]}"#);
    }
}
