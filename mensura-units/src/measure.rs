//! MeasureUnit values and the factory that creates them

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use mensura_core::{Rational, UnitError};
use serde::Serialize;
use tracing::debug;

use crate::cache::BoundedCache;
use crate::catalog::Catalog;
use crate::conversion::ConversionInfo;
use crate::mixed::{MixedMeasureUnit, MIXED_JOINER};
use crate::resolver::{reciprocal_of, Resolution, Resolver};

/// Default number of units kept by each cache
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Factory settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Measure units kept by the factory
    pub cache_capacity: usize,
    /// Resolutions kept by the resolver
    pub resolver_capacity: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            resolver_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug)]
struct MeasureUnitData {
    normalized: String,
    info: ConversionInfo,
    base_identifier: String,
    factor_f64: f64,
    offset_f64: f64,
    subunits: Option<Vec<MeasureUnit>>,
}

/// A resolved unit: normalized identifier, conversion rule and base.
///
/// Cheap to clone. Equality and hashing go by normalized identifier.
#[derive(Debug, Clone)]
pub struct MeasureUnit {
    inner: Arc<MeasureUnitData>,
}

impl MeasureUnit {
    pub(crate) fn new(
        normalized: String,
        info: ConversionInfo,
        base_identifier: String,
        subunits: Option<Vec<MeasureUnit>>,
    ) -> Self {
        let factor_f64 = info.factor.to_f64();
        let offset_f64 = info.offset.to_f64();
        Self {
            inner: Arc::new(MeasureUnitData {
                normalized,
                info,
                base_identifier,
                factor_f64,
                offset_f64,
                subunits,
            }),
        }
    }

    fn from_resolution(resolution: &Resolution) -> Self {
        Self::new(
            resolution.normalized.clone(),
            resolution.info.clone(),
            resolution.base_identifier.clone(),
            None,
        )
    }

    pub fn normalized_identifier(&self) -> &str {
        &self.inner.normalized
    }

    pub fn conversion_info(&self) -> &ConversionInfo {
        &self.inner.info
    }

    pub fn base_identifier(&self) -> &str {
        &self.inner.base_identifier
    }

    /// Components of a mixed unit, `None` for a plain one
    pub fn subunits(&self) -> Option<&[MeasureUnit]> {
        self.inner.subunits.as_deref()
    }

    pub fn is_mixed(&self) -> bool {
        self.inner.subunits.is_some()
    }

    pub fn is_special(&self) -> bool {
        self.inner.info.is_special()
    }

    /// Components, or the unit itself when it is not mixed
    pub fn components(&self) -> &[MeasureUnit] {
        self.subunits().unwrap_or(std::slice::from_ref(self))
    }

    /// Textual reciprocal of the normalized identifier
    pub fn reciprocal_identifier(&self) -> String {
        reciprocal_of(&self.inner.normalized)
    }

    // ========== Comparison ==========

    pub fn is_directly_convertible_to(&self, other: &MeasureUnit) -> bool {
        self.base_identifier() == other.base_identifier()
    }

    /// Direct, or through the reciprocal for plain linear units
    pub fn is_convertible_to(&self, other: &MeasureUnit) -> bool {
        if self.is_directly_convertible_to(other) {
            return true;
        }
        self.is_reciprocal_convertible_to(other)
    }

    pub(crate) fn is_reciprocal_convertible_to(&self, other: &MeasureUnit) -> bool {
        let linear = |u: &MeasureUnit| !u.is_mixed() && !u.is_special() && !u.inner.info.has_offset();
        linear(self) && linear(other) && reciprocal_of(self.base_identifier()) == other.base_identifier()
    }

    /// Magnitude comparison, only defined when both share a base
    pub fn is_smaller_than(&self, other: &MeasureUnit) -> Option<bool> {
        if !self.is_directly_convertible_to(other) {
            return None;
        }
        Some(self.inner.info.compare_magnitude(&other.inner.info).is_lt())
    }

    // ========== Conversion ==========

    pub fn convert_to_base(&self, value: &Rational) -> Rational {
        self.inner.info.convert(value)
    }

    pub fn convert_from_base(&self, value: &Rational) -> Rational {
        self.inner.info.convert_backwards(value)
    }

    /// Double precision path using the precomputed factor and offset
    pub fn convert_to_base_f64(&self, value: f64) -> f64 {
        if self.is_special() {
            return self.convert_to_base(&Rational::from_f64(value)).to_f64();
        }
        value * self.inner.factor_f64 + self.inner.offset_f64
    }

    pub fn convert_from_base_f64(&self, value: f64) -> f64 {
        if self.is_special() {
            return self.convert_from_base(&Rational::from_f64(value)).to_f64();
        }
        (value - self.inner.offset_f64) / self.inner.factor_f64
    }

    /// Sum of `amounts[i]` in component `i`, as a base value.
    ///
    /// Fewer amounts than components leaves the rest at zero.
    pub fn convert_to_base_amounts(&self, amounts: &[Rational]) -> Result<Rational, UnitError> {
        let components = self.components();
        if amounts.is_empty() || amounts.len() > components.len() {
            return Err(UnitError::amount_mismatch(
                self.normalized_identifier(),
                components.len(),
                amounts.len(),
            ));
        }
        Ok(amounts
            .iter()
            .zip(components)
            .fold(Rational::zero(), |sum, (amount, unit)| sum.add(&unit.convert_to_base(amount))))
    }

    /// Split a base value across the components.
    ///
    /// Every component but the last gets the floor of what remains; the last
    /// gets the exact leftover. A negative amount makes every component
    /// negative.
    pub fn convert_from_base_to_mixed(&self, amount: &Rational) -> Vec<Rational> {
        let components = self.components();
        if amount.is_nan() {
            return vec![Rational::nan(); components.len()];
        }
        let negative = amount.is_negative();
        let mut remainder = amount.abs();
        let last = components.len() - 1;
        let mut values = Vec::with_capacity(components.len());
        for (i, unit) in components.iter().enumerate() {
            let raw = unit.convert_from_base(&remainder);
            if i == last {
                values.push(raw);
            } else {
                let whole = raw.floor();
                remainder = remainder.sub(&unit.convert_to_base(&whole));
                values.push(whole);
            }
        }
        if negative {
            values.iter_mut().for_each(|v| *v = v.negate());
        }
        values
    }

    /// Summary for display and the wire
    pub fn describe(&self, catalog: &Catalog) -> UnitDescription {
        UnitDescription {
            identifier: self.normalized_identifier().to_string(),
            base_identifier: self.base_identifier().to_string(),
            quantity: catalog.quantity_of(self.base_identifier()).map(str::to_string),
            conversion: self.inner.info.clone(),
            components: self
                .subunits()
                .map(|units| units.iter().map(|u| u.normalized_identifier().to_string()).collect()),
        }
    }
}

impl PartialEq for MeasureUnit {
    fn eq(&self, other: &Self) -> bool {
        self.inner.normalized == other.inner.normalized
    }
}

impl Eq for MeasureUnit {}

impl Hash for MeasureUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.normalized.hash(state);
    }
}

impl fmt::Display for MeasureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.normalized)
    }
}

/// Serializable view of a [`MeasureUnit`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitDescription {
    pub identifier: String,
    pub base_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    pub conversion: ConversionInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<String>>,
}

// ============ Factory ============

/// Creates and caches [`MeasureUnit`]s over one catalog
#[derive(Debug)]
pub struct UnitFactory {
    catalog: Arc<Catalog>,
    resolver: Resolver,
    cache: BoundedCache<MeasureUnit>,
}

impl UnitFactory {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, FactoryConfig::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, config: FactoryConfig) -> Self {
        Self {
            resolver: Resolver::new(Arc::clone(&catalog), config.resolver_capacity),
            cache: BoundedCache::new(config.cache_capacity),
            catalog,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Unit for an identifier. Mixed identifiers are built fresh each time.
    pub fn from(&self, identifier: &str) -> Result<MeasureUnit, UnitError> {
        if identifier.contains(MIXED_JOINER) {
            return MixedMeasureUnit::from(self, identifier).map(MixedMeasureUnit::into_measure_unit);
        }
        if let Some(unit) = self.cache.get(identifier) {
            return Ok(unit);
        }
        debug!(identifier, "measure unit cache miss");
        let resolution = self.resolver.resolve(identifier)?;
        let unit = MeasureUnit::from_resolution(&resolution);
        Ok(self.cache.insert(identifier.to_string(), unit))
    }

    /// Unit for the reciprocal of `unit`'s normalized identifier
    pub fn reciprocal(&self, unit: &MeasureUnit) -> Result<MeasureUnit, UnitError> {
        self.from(&unit.reciprocal_identifier())
    }

    pub fn mixed(&self, identifier: &str) -> Result<MixedMeasureUnit, UnitError> {
        MixedMeasureUnit::from(self, identifier)
    }

    /// Number of plain units currently cached
    pub fn cached_units(&self) -> usize {
        self.cache.len()
    }
}
