//! Identifier resolution - from a unit id to its conversion rule and base

use std::sync::Arc;

use mensura_core::UnitError;
use serde::Serialize;
use tracing::{debug, trace};

use crate::cache::BoundedCache;
use crate::catalog::Catalog;
use crate::conversion::ConversionInfo;
use crate::unit_id::UnitId;

/// What an identifier resolves to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub normalized: String,
    pub info: ConversionInfo,
    pub base_identifier: String,
}

/// Memoizing resolver over a shared catalog
#[derive(Debug)]
pub struct Resolver {
    catalog: Arc<Catalog>,
    cache: BoundedCache<Arc<Resolution>>,
}

impl Resolver {
    pub fn new(catalog: Arc<Catalog>, capacity: usize) -> Self {
        Self { catalog, cache: BoundedCache::new(capacity) }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn resolve(&self, identifier: &str) -> Result<Arc<Resolution>, UnitError> {
        self.cache.get_or_try_insert_with(identifier, || {
            debug!(identifier, "resolving unit");
            self.compute(identifier).map(Arc::new)
        })
    }

    fn compute(&self, identifier: &str) -> Result<Resolution, UnitError> {
        let catalog = self.catalog.as_ref();
        let id = UnitId::parse(identifier, catalog)?;
        let normalized = id.to_string();

        // A lone atomic keeps its offset or special transform
        if let Some(name) = id.single_atomic() {
            let atomic = catalog
                .lookup(name)
                .ok_or_else(|| UnitError::unknown_unit(identifier, name))?;
            trace!(identifier, unit = name, info = %atomic.info, "single atomic");
            return Ok(Resolution { normalized, info: atomic.info, base_identifier: atomic.target });
        }

        let mut factor = id.constant().clone();
        let mut base = UnitId::empty();
        for (unit, in_numerator) in id.factors() {
            let atomic = catalog
                .lookup(&unit.unit)
                .ok_or_else(|| UnitError::unknown_unit(identifier, &unit.unit))?;
            if atomic.info.is_special() {
                return Err(UnitError::unsupported(
                    identifier,
                    &unit.unit,
                    "special conversions only apply to the unit on its own",
                ));
            }
            if atomic.info.has_offset() {
                return Err(UnitError::unsupported(
                    identifier,
                    &unit.unit,
                    "offset conversions only apply to the unit on its own",
                ));
            }
            let scaled = atomic.info.factor.pow(unit.power as i32);
            factor = if in_numerator { factor.mul(&scaled) } else { factor.div(&scaled) };

            let target = UnitId::parse(&atomic.target, catalog)?;
            base.add_group(&target, unit.power, in_numerator);
            trace!(identifier, unit = %unit.unit, power = unit.power, factor = %scaled, "atomic factor");
        }

        let mut base = base.resolve();
        base.sort(catalog);
        Ok(Resolution {
            normalized,
            info: ConversionInfo::linear(factor),
            base_identifier: base.to_string(),
        })
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Textual reciprocal: drop a leading `per-`, else swap around `-per-`,
/// else prepend `per-`
pub fn reciprocal_of(identifier: &str) -> String {
    if let Some(rest) = identifier.strip_prefix("per-") {
        return rest.to_string();
    }
    if let Some((numerator, denominator)) = identifier.split_once("-per-") {
        return format!("{}-per-{}", denominator, numerator);
    }
    format!("per-{}", identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mensura_core::{ErrorKind, Rational};

    fn resolver() -> Resolver {
        Resolver::new(Arc::new(Catalog::builtin().unwrap()), 100)
    }

    fn r(s: &str) -> Rational {
        Rational::from_str(s).unwrap()
    }

    #[test]
    fn test_atomic() {
        let res = resolver().resolve("foot").unwrap();
        assert_eq!(res.base_identifier, "meter");
        assert_eq!(res.info.factor, r("0.3048"));
    }

    #[test]
    fn test_compound_factor_and_base() {
        let res = resolver().resolve("kilometer-per-hour").unwrap();
        assert_eq!(res.base_identifier, "meter-per-second");
        assert_eq!(res.info.factor, r("1000/3600"));

        let res = resolver().resolve("kilowatt-hour").unwrap();
        assert_eq!(res.base_identifier, "kilogram-square-meter-per-square-second");
        assert_eq!(res.info.factor, Rational::from_i64(3_600_000));
    }

    #[test]
    fn test_constant_factor() {
        let res = resolver().resolve("liter-per-100-kilometer").unwrap();
        assert_eq!(res.base_identifier, "square-meter");
        assert_eq!(res.info.factor, r("0.001/100000"));
    }

    #[test]
    fn test_powers() {
        let res = resolver().resolve("square-foot").unwrap();
        assert_eq!(res.base_identifier, "square-meter");
        assert_eq!(res.info.factor, r("0.09290304"));
    }

    #[test]
    fn test_cancellation() {
        let res = resolver().resolve("meter-per-meter").unwrap();
        assert_eq!(res.base_identifier, "");
        assert!(res.info.factor.is_one());
    }

    #[test]
    fn test_offset_only_alone() {
        let res = resolver().resolve("celsius").unwrap();
        assert_eq!(res.info.offset, r("273.15"));
        let err = resolver().resolve("square-celsius").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedComposition);
        assert_eq!(err.identifier(), "square-celsius");
        assert!(resolver().resolve("celsius-per-second").is_err());
    }

    #[test]
    fn test_special_only_alone() {
        let res = resolver().resolve("beaufort").unwrap();
        assert!(res.info.is_special());
        assert_eq!(res.base_identifier, "meter-per-second");
        let err = resolver().resolve("beaufort-per-second").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedComposition);
    }

    #[test]
    fn test_unknown_unit() {
        let err = resolver().resolve("foobar-per-second").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownUnit);
        assert_eq!(err.identifier(), "foobar-per-second");
        assert!(matches!(err, UnitError::UnknownUnit { ref unit, .. } if unit == "foobar"));
    }

    #[test]
    fn test_memoized() {
        let resolver = resolver();
        let first = resolver.resolve("mile-per-hour").unwrap();
        let second = resolver.resolve("mile-per-hour").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached(), 1);
        assert!(resolver.resolve("foobar").is_err());
        assert_eq!(resolver.cached(), 1);
    }

    #[test]
    fn test_reciprocal_of() {
        assert_eq!(reciprocal_of("per-second"), "second");
        assert_eq!(reciprocal_of("meter-per-second"), "second-per-meter");
        assert_eq!(reciprocal_of("meter"), "per-meter");
        assert_eq!(reciprocal_of(&reciprocal_of("meter")), "meter");
    }
}
