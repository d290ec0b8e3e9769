//! Conversion rules between a unit and its base unit

use std::cmp::Ordering;
use std::fmt;

use mensura_core::Rational;
use serde::Serialize;

use crate::special::SpecialKind;

/// How to get from a unit to its base unit.
///
/// Linear and affine units use `base = value * factor + offset`. A special
/// unit carries zero factor and offset and delegates to its transform;
/// `special_inverse` marks the reciprocal direction of that transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionInfo {
    pub factor: Rational,
    pub offset: Rational,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special: Option<SpecialKind>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub special_inverse: bool,
}

impl ConversionInfo {
    pub fn identity() -> Self {
        Self::linear(Rational::one())
    }

    pub fn linear(factor: Rational) -> Self {
        Self::new(factor, Rational::zero())
    }

    pub fn new(factor: Rational, offset: Rational) -> Self {
        Self { factor, offset, special: None, special_inverse: false }
    }

    pub fn special(kind: SpecialKind) -> Self {
        Self {
            factor: Rational::zero(),
            offset: Rational::zero(),
            special: Some(kind),
            special_inverse: false,
        }
    }

    pub fn is_special(&self) -> bool {
        self.special.is_some()
    }

    pub fn has_offset(&self) -> bool {
        !self.offset.is_zero()
    }

    /// Unit value to base value
    pub fn convert(&self, value: &Rational) -> Rational {
        match self.special {
            Some(kind) if self.special_inverse => kind.from_base(value),
            Some(kind) => kind.to_base(value),
            None => value.mul(&self.factor).add(&self.offset),
        }
    }

    /// Base value to unit value
    pub fn convert_backwards(&self, value: &Rational) -> Rational {
        match self.special {
            Some(kind) if self.special_inverse => kind.to_base(value),
            Some(kind) => kind.from_base(value),
            None => value.sub(&self.offset).div(&self.factor),
        }
    }

    /// The rule for the opposite direction
    pub fn invert(&self) -> Self {
        if self.is_special() {
            return Self { special_inverse: !self.special_inverse, ..self.clone() };
        }
        let factor = self.factor.reciprocal();
        let offset = self.offset.negate().div(&self.factor);
        Self::new(factor, offset)
    }

    /// Magnitude ordering: factor, then offset; specials sort last
    pub fn compare_magnitude(&self, other: &Self) -> Ordering {
        match (self.is_special(), other.is_special()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self
                .factor
                .partial_cmp(&other.factor)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.offset.partial_cmp(&other.offset).unwrap_or(Ordering::Equal)),
        }
    }
}

impl Default for ConversionInfo {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for ConversionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.special {
            Some(kind) if self.special_inverse => write!(f, "{}⁻¹(x)", kind),
            Some(kind) => write!(f, "{}(x)", kind),
            None if self.has_offset() => write!(f, "x * {} + {}", self.factor, self.offset),
            None => write!(f, "x * {}", self.factor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(s: &str) -> Rational {
        Rational::from_str(s).unwrap()
    }

    #[test]
    fn test_linear_convert() {
        let foot = ConversionInfo::linear(r("0.3048"));
        assert_eq!(foot.convert(&Rational::from_i64(10)), r("3.048"));
        assert_eq!(foot.convert_backwards(&r("3.048")), Rational::from_i64(10));
    }

    #[test]
    fn test_offset_convert() {
        let celsius = ConversionInfo::new(Rational::one(), r("273.15"));
        assert_eq!(celsius.convert(&Rational::from_i64(100)), r("373.15"));
        assert_eq!(celsius.convert_backwards(&r("273.15")), Rational::zero());
        assert!(celsius.has_offset());
    }

    #[test]
    fn test_invert() {
        let fahrenheit = ConversionInfo::new(r("5/9"), r("2298.35/9"));
        let inverse = fahrenheit.invert();
        let x = Rational::from_i64(212);
        assert_eq!(inverse.convert(&fahrenheit.convert(&x)), x);
    }

    #[test]
    fn test_special_convert_and_invert() {
        let beaufort = ConversionInfo::special(SpecialKind::Beaufort);
        assert_eq!(beaufort.convert(&Rational::from_i64(4)), r("6.75"));
        assert_eq!(beaufort.convert_backwards(&Rational::from_i64(16)), Rational::from_i64(7));
        let inverse = beaufort.invert();
        assert_eq!(inverse.convert(&Rational::from_i64(16)), Rational::from_i64(7));
        assert_eq!(inverse.invert(), beaufort);
    }

    #[test]
    fn test_compare_magnitude() {
        let foot = ConversionInfo::linear(r("0.3048"));
        let inch = ConversionInfo::linear(r("0.0254"));
        let beaufort = ConversionInfo::special(SpecialKind::Beaufort);
        assert_eq!(inch.compare_magnitude(&foot), Ordering::Less);
        assert_eq!(foot.compare_magnitude(&foot.clone()), Ordering::Equal);
        assert_eq!(beaufort.compare_magnitude(&foot), Ordering::Greater);
        assert_eq!(foot.compare_magnitude(&beaufort), Ordering::Less);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConversionInfo::linear(r("0.3048")).to_string(), "x * 381/1250");
        assert_eq!(ConversionInfo::special(SpecialKind::Beaufort).to_string(), "beaufort(x)");
    }
}
