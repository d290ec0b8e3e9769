//! Mensura Units - exact unit identifier resolution and conversion
//!
//! Unit identifiers are `-`-joined token strings such as
//! `kilogram-meter-per-square-second` or `liter-per-100-kilometer`. They
//! are parsed against a [`Catalog`] of atomic conversion rules, resolved to
//! an exact factor and a canonical base identifier, and wrapped in cached
//! [`MeasureUnit`] values. Mixed units (`foot-and-inch`) split an amount
//! across components of strictly decreasing size.
//!
//! Flow: string → [`UnitId`] → [`Resolution`] → [`MeasureUnit`] → [`Converter`]

mod cache;
mod catalog;
mod conversion;
mod convert;
mod measure;
mod mixed;
mod prefix;
mod resolver;
mod special;
mod unit_id;

pub use cache::BoundedCache;
pub use catalog::{AtomicUnit, Catalog, CatalogBuilder, CatalogEntry, Quantity, BUILTIN_CATALOG};
pub use conversion::ConversionInfo;
pub use convert::{Amount, Converter};
pub use measure::{FactoryConfig, MeasureUnit, UnitDescription, UnitFactory, DEFAULT_CACHE_CAPACITY};
pub use mixed::{MixedMeasureUnit, MIXED_JOINER};
pub use prefix::{find_prefix, Prefix, BINARY_PREFIXES, SI_PREFIXES};
pub use resolver::{reciprocal_of, Resolution, Resolver};
pub use special::SpecialKind;
pub use unit_id::{UnitFactor, UnitId, MAX_POWER};

#[cfg(test)]
mod tests {
    use super::*;
    use mensura_core::{ErrorKind, Rational};
    use std::sync::Arc;
    use std::thread;

    fn converter() -> Converter {
        Converter::builtin().unwrap()
    }

    fn r(s: &str) -> Rational {
        Rational::from_str(s).unwrap()
    }

    mod scenarios {
        use super::*;

        #[test]
        fn test_speed() {
            let kph = converter().convert(3.0_f64, "foot-per-second", "kilometer-per-hour").unwrap();
            assert!((kph - 3.29184).abs() < 1e-9);
        }

        #[test]
        fn test_pace_through_reciprocal() {
            let pace = converter().convert(3.0_f64, "foot-per-second", "hour-per-kilometer").unwrap();
            assert!((pace - 0.3037814718).abs() < 1e-9);
        }

        #[test]
        fn test_meter_to_foot_and_inch() {
            let parts = converter().convert_list(&[1.27_f64], "meter", "foot-and-inch").unwrap();
            assert_eq!(parts, vec![4.0, 2.0]);
        }

        #[test]
        fn test_foot_and_inch_to_meter() {
            let meters = converter().convert_list(&[4.0_f64, 2.0], "foot-and-inch", "meter").unwrap();
            assert_eq!(meters, vec![1.27]);
        }

        #[test]
        fn test_unknown_unit() {
            let err = converter().convert(1.0_f64, "foobar", "kilogram").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnknownUnit);
            assert_eq!(err.identifier(), "foobar");
        }

        #[test]
        fn test_inch_and_foot() {
            let c = converter();
            let err = MixedMeasureUnit::from(c.factory(), "inch-and-foot").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadUnitOrder);
        }

        #[test]
        fn test_beaufort_fixtures() {
            let c = converter();
            for (scale, speed) in [(1, "0.95"), (4, "6.75"), (7, "15.55"), (10, "26.5"), (13, "39.15")] {
                let ms = c.convert(Rational::from_i64(scale), "beaufort", "meter-per-second").unwrap();
                assert_eq!(ms, r(speed), "{} Bft", scale);
            }
            for (speed, scale) in [(7, 4), (16, 7), (39, 13)] {
                let bft = c.convert(Rational::from_i64(speed), "meter-per-second", "beaufort").unwrap();
                assert_eq!(bft, Rational::from_i64(scale), "{} m/s", speed);
            }
        }

        #[test]
        fn test_temperature() {
            let c = converter();
            let f = c.convert(Rational::from_i64(100), "celsius", "fahrenheit").unwrap();
            assert_eq!(f, Rational::from_i64(212));
            let err = c.convert(Rational::one(), "square-celsius", "square-kelvin").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedComposition);
        }
    }

    mod properties {
        use super::*;

        const UNITS: &[&str] = &[
            "meter", "foot", "inch", "mile", "kilometer-per-hour", "mile-per-gallon",
            "liter-per-100-kilometer", "newton", "pound-force", "kilowatt-hour", "calorie",
            "square-foot", "acre", "cubic-inch", "gallon", "hertz", "per-second", "celsius",
            "fahrenheit", "kelvin", "gibibyte", "percent", "degree", "radian", "month",
        ];

        #[test]
        fn test_round_trip_through_base() {
            let c = converter();
            let x = r("-17.25");
            for id in UNITS {
                let unit = c.factory().from(id).unwrap();
                assert_eq!(unit.convert_from_base(&unit.convert_to_base(&x)), x, "{}", id);
            }
        }

        #[test]
        fn test_reciprocal_involution() {
            let c = converter();
            for id in ["meter-per-second", "per-second", "liter-per-100-kilometer", "square-meter"] {
                let unit = c.factory().from(id).unwrap();
                let back = c.factory().reciprocal(&c.factory().reciprocal(&unit).unwrap()).unwrap();
                assert_eq!(back.normalized_identifier(), unit.normalized_identifier());
            }
        }

        #[test]
        fn test_convertibility_symmetric_and_transitive() {
            let c = converter();
            for a in UNITS {
                for b in UNITS {
                    let ab = c.is_convertible(a, b).unwrap();
                    assert_eq!(ab, c.is_convertible(b, a).unwrap(), "{} / {}", a, b);
                }
            }
            assert!(c.is_convertible("foot", "inch").unwrap());
            assert!(c.is_convertible("inch", "mile").unwrap());
            assert!(c.is_convertible("foot", "mile").unwrap());
        }

        #[test]
        fn test_chained_conversions_do_not_drift() {
            let c = converter();
            let start = r("1234.5678");
            let mut value = start.clone();
            let chain = ["meter", "foot", "inch", "yard", "mile", "nautical-mile", "meter"];
            for pair in chain.windows(2) {
                value = c.convert(value, pair[0], pair[1]).unwrap();
            }
            assert_eq!(value, start);
        }

        #[test]
        fn test_mixed_round_trip_exact() {
            let c = converter();
            let seconds = r("98765.4321");
            let parts = c.convert_list(&[seconds.clone()], "second", "day-and-hour-and-minute-and-second").unwrap();
            assert_eq!(parts.len(), 4);
            let back = c.convert_list(&parts, "day-and-hour-and-minute-and-second", "second").unwrap();
            assert_eq!(back, vec![seconds]);
        }

        #[test]
        fn test_shared_across_threads() {
            let c = Arc::new(converter());
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let c = Arc::clone(&c);
                    thread::spawn(move || {
                        let amount = Rational::from_i64(i);
                        c.convert(amount, "kilometer", "meter").unwrap()
                    })
                })
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                assert_eq!(handle.join().unwrap(), Rational::from_i64(1000 * i as i64));
            }
        }
    }
}
