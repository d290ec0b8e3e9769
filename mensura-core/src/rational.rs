//! Exact rational numbers using dashu
//!
//! Uses dashu-ratio (RBig) for exact fraction arithmetic. Conversion
//! factors are products of many decimal constants (prefixes, imperial
//! definitions, catalog constants), so keeping them as reduced fractions
//! means a chain of factors never drifts.
//!
//! A `NaN` sentinel stands in for "no value": division by zero returns it
//! instead of panicking, and every operation propagates it.

use std::cmp::Ordering;
use std::fmt;

use dashu_float::DBig;
use dashu_int::{IBig, UBig};
use dashu_ratio::RBig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error type for rational parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RationalError {
    #[error("Invalid number format: {0}")]
    ParseError(String),

    #[error("Undefined constant: {0}")]
    UndefinedConstant(String),
}

/// Significant digits of the decimal surface (IEEE decimal128 context,
/// round half to even)
pub const DECIMAL_DIGITS: usize = 34;

/// Largest decimal exponent accepted when parsing; beyond it the power of
/// ten alone would not fit in memory
pub const MAX_DECIMAL_EXPONENT: i64 = 10_000;

/// Digits expanded before handing a value to the f64 parser
const DOUBLE_DIGITS: usize = 20;

/// Exact fraction, always reduced, sign carried by the numerator.
///
/// `None` inside is the NaN sentinel.
#[derive(Debug, Clone)]
pub struct Rational {
    inner: Option<RBig>,
}

impl Rational {
    // ========== Construction ==========

    pub fn zero() -> Self {
        Self { inner: Some(RBig::ZERO) }
    }

    pub fn one() -> Self {
        Self { inner: Some(RBig::ONE) }
    }

    /// The "no value" sentinel
    pub fn nan() -> Self {
        Self { inner: None }
    }

    /// Create from i64
    pub fn from_i64(n: i64) -> Self {
        Self::from_int(IBig::from(n))
    }

    /// Create from an arbitrary precision integer
    pub fn from_int(n: IBig) -> Self {
        Self { inner: Some(RBig::from(n)) }
    }

    /// Create from numerator/denominator; a zero denominator gives NaN
    pub fn from_ratio(numerator: i64, denominator: i64) -> Self {
        Self::from_bigints(IBig::from(numerator), IBig::from(denominator))
    }

    /// Create from big numerator/denominator, reducing
    pub fn from_bigints(numerator: IBig, denominator: IBig) -> Self {
        if denominator == IBig::ZERO {
            return Self::nan();
        }
        let (numerator, denominator) = if denominator < IBig::ZERO {
            (-numerator, -denominator)
        } else {
            (numerator, denominator)
        };
        match UBig::try_from(denominator) {
            Ok(den) => Self { inner: Some(RBig::from_parts(numerator, den)) },
            Err(_) => Self::nan(),
        }
    }

    /// 10^exp, exact
    pub fn pow10(exp: i64) -> Self {
        let magnitude = IBig::from(10u8).pow(exp.unsigned_abs() as usize);
        if exp >= 0 {
            Self::from_int(magnitude)
        } else {
            Self::from_bigints(IBig::ONE, magnitude)
        }
    }

    /// Parse a number expression.
    ///
    /// Supports: "123", "-3.14", "1.5e-3", "1,000", "1/3", "12*0.0254",
    /// "NaN". Named constants are rejected; see [`Rational::parse_with`].
    pub fn from_str(s: &str) -> Result<Self, RationalError> {
        Self::parse_with(s, |_| None)
    }

    /// Parse a number expression, resolving non-numeric factors through
    /// `constants`.
    ///
    /// Grammar: `product ("/" product)?`, `product = item ("*" item)*`,
    /// `item = decimal | constant-name`.
    pub fn parse_with<F>(s: &str, constants: F) -> Result<Self, RationalError>
    where
        F: Fn(&str) -> Option<Rational>,
    {
        let s = s.trim();
        if s == "NaN" {
            return Ok(Self::nan());
        }
        let cleaned = s.replace(',', "");
        let mut parts = cleaned.split('/');
        let numerator = match parts.next() {
            Some(p) => Self::parse_product(p, &constants, s)?,
            None => return Err(RationalError::ParseError(s.to_string())),
        };
        let result = match parts.next() {
            Some(p) => numerator.div(&Self::parse_product(p, &constants, s)?),
            None => numerator,
        };
        if parts.next().is_some() {
            return Err(RationalError::ParseError(s.to_string()));
        }
        Ok(result)
    }

    fn parse_product<F>(part: &str, constants: &F, whole: &str) -> Result<Self, RationalError>
    where
        F: Fn(&str) -> Option<Rational>,
    {
        let mut result = Self::one();
        for item in part.split('*') {
            let item = item.trim();
            if item.is_empty() {
                return Err(RationalError::ParseError(whole.to_string()));
            }
            let starts_numeric = item
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.');
            let value = if starts_numeric {
                Self::parse_decimal(item)
                    .ok_or_else(|| RationalError::ParseError(whole.to_string()))?
            } else {
                constants(item).ok_or_else(|| RationalError::UndefinedConstant(item.to_string()))?
            };
            result = result.mul(&value);
        }
        Ok(result)
    }

    /// Exact decimal with optional exponent: "-12.5e3"
    fn parse_decimal(s: &str) -> Option<Self> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (mantissa, exponent) = match body.find(|c: char| c == 'e' || c == 'E') {
            Some(pos) => (&body[..pos], body[pos + 1..].parse::<i64>().ok()?),
            None => (body, 0),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return None;
        }

        let digits = format!("{}{}", int_part, frac_part);
        let mut numerator: IBig = digits.parse().ok()?;
        if negative {
            numerator = -numerator;
        }
        let scale = exponent.checked_sub(frac_part.len() as i64)?;
        if scale.abs() > MAX_DECIMAL_EXPONENT {
            return None;
        }
        Some(Self::from_int(numerator).mul(&Self::pow10(scale)))
    }

    /// Create from f64 through its shortest round-trip decimal form, so
    /// 1.27 becomes exactly 127/100. Non-finite input gives NaN.
    pub fn from_f64(f: f64) -> Self {
        if !f.is_finite() {
            return Self::nan();
        }
        Self::parse_decimal(&format!("{}", f)).unwrap_or_else(Self::nan)
    }

    /// Create from an arbitrary precision decimal (exact)
    pub fn from_decimal(d: &DBig) -> Self {
        let (significand, exponent) = d.clone().into_repr().into_parts();
        Self::from_int(significand).mul(&Self::pow10(exponent as i64))
    }

    // ========== Predicates ==========

    pub fn is_nan(&self) -> bool {
        self.inner.is_none()
    }

    pub fn is_zero(&self) -> bool {
        matches!(&self.inner, Some(r) if *r == RBig::ZERO)
    }

    pub fn is_negative(&self) -> bool {
        matches!(&self.inner, Some(r) if *r < RBig::ZERO)
    }

    pub fn is_one(&self) -> bool {
        matches!(&self.inner, Some(r) if *r == RBig::ONE)
    }

    pub fn is_integer(&self) -> bool {
        matches!(&self.inner, Some(r) if *r.denominator() == UBig::ONE)
    }

    /// Numerator, `None` for NaN
    pub fn numerator(&self) -> Option<&IBig> {
        self.inner.as_ref().map(|r| r.numerator())
    }

    /// Denominator (always positive), `None` for NaN
    pub fn denominator(&self) -> Option<&UBig> {
        self.inner.as_ref().map(|r| r.denominator())
    }

    // ========== Arithmetic ==========

    fn combine<F>(&self, other: &Self, op: F) -> Self
    where
        F: FnOnce(&RBig, &RBig) -> RBig,
    {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Self { inner: Some(op(a, b)) },
            _ => Self::nan(),
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a * b)
    }

    /// Division; a zero divisor gives NaN
    pub fn div(&self, other: &Self) -> Self {
        if other.is_zero() {
            return Self::nan();
        }
        self.combine(other, |a, b| a / b)
    }

    pub fn reciprocal(&self) -> Self {
        Self::one().div(self)
    }

    pub fn negate(&self) -> Self {
        Self { inner: self.inner.as_ref().map(|r| -r.clone()) }
    }

    pub fn abs(&self) -> Self {
        if self.is_negative() {
            self.negate()
        } else {
            self.clone()
        }
    }

    /// Integer power by repeated squaring; negative exponents invert
    pub fn pow(&self, exp: i32) -> Self {
        let mut base = match &self.inner {
            Some(r) => r.clone(),
            None => return Self::nan(),
        };
        let mut remaining = exp.unsigned_abs();
        let mut acc = RBig::ONE;
        while remaining > 0 {
            if remaining & 1 == 1 {
                acc = &acc * &base;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = &base * &base;
            }
        }
        let result = Self { inner: Some(acc) };
        if exp < 0 {
            result.reciprocal()
        } else {
            result
        }
    }

    /// Largest integer <= self
    pub fn floor(&self) -> Self {
        let r = match &self.inner {
            Some(r) => r,
            None => return Self::nan(),
        };
        let numerator = r.numerator();
        let denominator = IBig::from(r.denominator().clone());
        let quotient = numerator / &denominator;
        let inexact = numerator % &denominator != IBig::ZERO;
        if inexact && *numerator < IBig::ZERO {
            Self::from_int(quotient - IBig::ONE)
        } else {
            Self::from_int(quotient)
        }
    }

    // ========== Approximation ==========

    /// Round to `digits` significant decimal digits, half to even.
    ///
    /// Returns `(significand, exponent)` with trailing zeros stripped, or
    /// `None` for NaN.
    pub fn to_decimal_parts(&self, digits: usize) -> Option<(IBig, isize)> {
        let r = self.inner.as_ref()?;
        let digits = digits.max(1) as isize;
        if *r.numerator() == IBig::ZERO {
            return Some((IBig::ZERO, 0));
        }
        let negative = *r.numerator() < IBig::ZERO;
        let n = if negative { -r.numerator().clone() } else { r.numerator().clone() };
        let d = IBig::from(r.denominator().clone());

        let digit_len = |x: &IBig| x.to_string().len() as isize;
        let ten_pow = |e: isize| IBig::from(10u8).pow(e as usize);

        // q = n * 10^shift / d must have exactly `digits` digits
        let mut shift = digits - (digit_len(&n) - digit_len(&d)) - 1;
        let (mut q, rem, den) = loop {
            let (num, den) = if shift >= 0 {
                (&n * ten_pow(shift), d.clone())
            } else {
                (n.clone(), &d * ten_pow(-shift))
            };
            let q = &num / &den;
            let len = digit_len(&q);
            if len > digits {
                shift -= 1;
            } else if len < digits {
                shift += 1;
            } else {
                let rem = &num % &den;
                break (q, rem, den);
            }
        };

        let two = IBig::from(2u8);
        let round_up = match (&rem * &two).cmp(&den) {
            Ordering::Greater => true,
            Ordering::Equal => &q % &two != IBig::ZERO,
            Ordering::Less => false,
        };
        if round_up {
            q += IBig::ONE;
        }

        let ten = IBig::from(10u8);
        let mut exponent = -shift;
        while &q % &ten == IBig::ZERO {
            q = &q / &ten;
            exponent += 1;
        }
        if negative {
            q = -q;
        }
        Some((q, exponent))
    }

    /// Nearest f64; NaN maps to `f64::NAN`, out of range to infinity
    pub fn to_f64(&self) -> f64 {
        match self.to_decimal_parts(DOUBLE_DIGITS) {
            Some((significand, exponent)) => format!("{}e{}", significand, exponent)
                .parse::<f64>()
                .unwrap_or(f64::NAN),
            None => f64::NAN,
        }
    }

    /// Decimal in the fixed 34-digit context, `None` for NaN
    pub fn to_decimal(&self) -> Option<DBig> {
        self.to_decimal_parts(DECIMAL_DIGITS)
            .map(|(significand, exponent)| DBig::from_parts(significand, exponent))
    }

    /// Plain decimal rendering with at most `digits` significant digits
    pub fn to_decimal_string(&self, digits: usize) -> String {
        let (significand, exponent) = match self.to_decimal_parts(digits) {
            Some(parts) => parts,
            None => return "NaN".to_string(),
        };
        let negative = significand < IBig::ZERO;
        let magnitude = (if negative { -significand } else { significand }).to_string();
        let body = if exponent >= 0 {
            format!("{}{}", magnitude, "0".repeat(exponent as usize))
        } else {
            let frac_len = (-exponent) as usize;
            if magnitude.len() > frac_len {
                let split = magnitude.len() - frac_len;
                format!("{}.{}", &magnitude[..split], &magnitude[split..])
            } else {
                format!("0.{}{}", "0".repeat(frac_len - magnitude.len()), magnitude)
            }
        };
        if negative {
            format!("-{}", body)
        } else {
            body
        }
    }
}

// ========== Trait Implementations ==========

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            None => write!(f, "NaN"),
            Some(r) if *r.denominator() == UBig::ONE => write!(f, "{}", r.numerator()),
            Some(r) => write!(f, "{}/{}", r.numerator(), r.denominator()),
        }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Self::from_i64(n)
    }
}

impl PartialEq for Rational {
    /// NaN is unequal to everything, itself included
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl Serialize for Rational {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Rational {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
