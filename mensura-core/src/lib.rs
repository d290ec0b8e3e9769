//! Mensura Core - Fundamental types
//!
//! This crate provides the core types used throughout Mensura:
//! - `Rational`: Exact fractions with a NaN sentinel, plus f64 and decimal adapters
//! - `UnitError`: Tagged errors carrying the offending identifier

mod rational;
mod error;

pub use rational::{Rational, RationalError, DECIMAL_DIGITS, MAX_DECIMAL_EXPONENT};
pub use error::{UnitError, ErrorKind, ErrorReport, codes};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Rational, UnitError, ErrorKind};
    pub use crate::error::codes;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod rational_tests {
        use super::*;
        use dashu_float::DBig;

        fn r(s: &str) -> Rational {
            Rational::from_str(s).unwrap()
        }

        #[test]
        fn test_from_str_integer() {
            assert_eq!(r("123"), Rational::from_i64(123));
        }

        #[test]
        fn test_from_str_decimal_is_exact() {
            assert_eq!(r("0.3048"), Rational::from_ratio(381, 1250));
            assert_eq!(r("-1.25"), Rational::from_ratio(-5, 4));
        }

        #[test]
        fn test_from_str_scientific() {
            assert_eq!(r("1.5e2"), Rational::from_i64(150));
            assert_eq!(r("6.02214076E+23"), r("602214076000000000000000"));
            assert_eq!(r("1e-3"), Rational::from_ratio(1, 1000));
        }

        #[test]
        fn test_from_str_expression() {
            assert_eq!(r("1/3"), Rational::from_ratio(1, 3));
            assert_eq!(r("12*0.0254"), r("0.3048"));
            assert_eq!(r("1,000"), Rational::from_i64(1000));
        }

        #[test]
        fn test_from_str_rejects_garbage() {
            assert!(Rational::from_str("abc").is_err());
            assert!(Rational::from_str("1/2/3").is_err());
            assert!(Rational::from_str("1.2.3").is_err());
            assert!(Rational::from_str("").is_err());
        }

        #[test]
        fn test_from_str_exponent_limit() {
            assert_eq!(r("1e10000"), Rational::pow10(MAX_DECIMAL_EXPONENT));
            assert_eq!(r("1e-10000"), Rational::pow10(-MAX_DECIMAL_EXPONENT));
            assert!(Rational::from_str("1e10001").is_err());
            assert!(Rational::from_str("1e99999999999999999").is_err());
            assert!(Rational::from_str("-2.5e-99999999999").is_err());
        }

        #[test]
        fn test_parse_with_constants() {
            let lookup = |name: &str| match name {
                "ft_to_m" => Some(Rational::from_str("0.3048").unwrap()),
                _ => None,
            };
            let yard = Rational::parse_with("ft_to_m*3", lookup).unwrap();
            assert_eq!(yard, r("0.9144"));
            assert!(matches!(
                Rational::parse_with("gal_to_m3", lookup),
                Err(RationalError::UndefinedConstant(_))
            ));
        }

        #[test]
        fn test_reduced_with_sign_on_numerator() {
            let x = Rational::from_ratio(6, -8);
            assert_eq!(x.to_string(), "-3/4");
            assert_eq!(x.denominator().unwrap().to_string(), "4");
        }

        #[test]
        fn test_arithmetic() {
            let a = Rational::from_ratio(1, 3);
            let b = Rational::from_ratio(1, 6);
            assert_eq!(a.add(&b), Rational::from_ratio(1, 2));
            assert_eq!(a.sub(&b), Rational::from_ratio(1, 6));
            assert_eq!(a.mul(&b), Rational::from_ratio(1, 18));
            assert_eq!(a.div(&b), Rational::from_i64(2));
            assert_eq!(a.reciprocal(), Rational::from_i64(3));
            assert_eq!(a.negate(), Rational::from_ratio(-1, 3));
        }

        #[test]
        fn test_div_by_zero_is_nan() {
            let x = Rational::from_i64(42).div(&Rational::zero());
            assert!(x.is_nan());
            assert!(Rational::zero().reciprocal().is_nan());
            assert!(Rational::from_ratio(1, 0).is_nan());
        }

        #[test]
        fn test_nan_propagates_and_is_unequal() {
            let nan = Rational::nan();
            assert!(nan.add(&Rational::one()).is_nan());
            assert!(Rational::one().mul(&nan).is_nan());
            assert_ne!(nan, nan.clone());
            assert!(nan.partial_cmp(&Rational::zero()).is_none());
            assert_eq!(nan.to_string(), "NaN");
        }

        #[test]
        fn test_pow() {
            assert_eq!(Rational::from_i64(2).pow(10), Rational::from_i64(1024));
            assert_eq!(Rational::from_i64(2).pow(-2), Rational::from_ratio(1, 4));
            assert_eq!(r("0.3048").pow(0), Rational::one());
            assert_eq!(Rational::pow10(-3), Rational::from_ratio(1, 1000));
        }

        #[test]
        fn test_floor() {
            assert_eq!(Rational::from_ratio(25, 6).floor(), Rational::from_i64(4));
            assert_eq!(Rational::from_ratio(-25, 6).floor(), Rational::from_i64(-5));
            assert_eq!(Rational::from_i64(-4).floor(), Rational::from_i64(-4));
        }

        #[test]
        fn test_compare() {
            assert!(Rational::from_ratio(1, 3) < Rational::from_ratio(1, 2));
            assert!(r("0.3048") > r("0.0254"));
        }

        #[test]
        fn test_from_f64_uses_shortest_decimal() {
            assert_eq!(Rational::from_f64(1.27), Rational::from_ratio(127, 100));
            assert_eq!(Rational::from_f64(-0.5), Rational::from_ratio(-1, 2));
            assert!(Rational::from_f64(f64::INFINITY).is_nan());
        }

        #[test]
        fn test_to_f64() {
            assert_eq!(Rational::from_ratio(127, 100).to_f64(), 1.27);
            assert_eq!(Rational::from_ratio(1, 3).to_f64(), 1.0 / 3.0);
            assert!(Rational::nan().to_f64().is_nan());
        }

        #[test]
        fn test_to_decimal_rounds_half_even() {
            let third = Rational::from_ratio(2, 3).to_decimal_string(5);
            assert_eq!(third, "0.66667");
            // 0.125 -> 0.12 at 2 digits, 0.375 -> 0.38
            assert_eq!(Rational::from_ratio(1, 8).to_decimal_string(2), "0.12");
            assert_eq!(Rational::from_ratio(3, 8).to_decimal_string(2), "0.38");
            assert_eq!(Rational::from_i64(1234500).to_decimal_string(4), "1234000");
            assert_eq!(Rational::from_ratio(-1, 400).to_decimal_string(10), "-0.0025");
        }

        #[test]
        fn test_decimal_round_trip() {
            let x = r("1.27");
            let d = x.to_decimal().unwrap();
            assert_eq!(Rational::from_decimal(&d), x);
            let parsed: DBig = "0.0254".parse().unwrap();
            assert_eq!(Rational::from_decimal(&parsed), r("0.0254"));
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_kind_and_code() {
            let err = UnitError::unknown_unit("foobar", "foobar");
            assert_eq!(err.kind(), ErrorKind::UnknownUnit);
            assert_eq!(err.code(), codes::UNKNOWN_UNIT);
            assert_eq!(err.identifier(), "foobar");
        }

        #[test]
        fn test_display_carries_identifier() {
            let err = UnitError::bad_order("inch-and-foot", "inch", "foot");
            let display = format!("{}", err);
            assert!(display.contains("inch-and-foot"));
        }

        #[test]
        fn test_report() {
            let report = UnitError::parse("meter-per-per-second", "second 'per'").report();
            assert_eq!(report.code, codes::PARSE_ERROR);
            assert_eq!(report.identifier, "meter-per-per-second");
            assert!(report.suggestion.is_some());
        }
    }
}
