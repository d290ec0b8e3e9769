//! Conversion between units over exact, double and decimal amounts

use std::sync::Arc;

use dashu_float::DBig;
use mensura_core::{Rational, UnitError};
use tracing::trace;

use crate::catalog::Catalog;
use crate::measure::{FactoryConfig, MeasureUnit, UnitFactory};

/// A numeric surface the converter accepts.
///
/// All arithmetic happens in [`Rational`]; an amount only has to get in
/// and out. `from_rational` returns `None` when the surface cannot
/// represent the result (NaN on a decimal).
pub trait Amount: Sized {
    fn to_rational(&self) -> Rational;

    fn from_rational(value: &Rational) -> Option<Self>;

    /// Shortcut for two plain, non-special units. `reciprocal` marks the
    /// reciprocal fallback. `None` takes the exact path.
    fn convert_linear(&self, _source: &MeasureUnit, _target: &MeasureUnit, _reciprocal: bool) -> Option<Self> {
        None
    }
}

impl Amount for Rational {
    fn to_rational(&self) -> Rational {
        self.clone()
    }

    fn from_rational(value: &Rational) -> Option<Self> {
        Some(value.clone())
    }
}

impl Amount for f64 {
    fn to_rational(&self) -> Rational {
        Rational::from_f64(*self)
    }

    fn from_rational(value: &Rational) -> Option<Self> {
        Some(value.to_f64())
    }

    fn convert_linear(&self, source: &MeasureUnit, target: &MeasureUnit, reciprocal: bool) -> Option<Self> {
        if source.is_special() || target.is_special() {
            return None;
        }
        let mut base = source.convert_to_base_f64(*self);
        if reciprocal {
            base = 1.0 / base;
        }
        Some(target.convert_from_base_f64(base))
    }
}

impl Amount for DBig {
    fn to_rational(&self) -> Rational {
        Rational::from_decimal(self)
    }

    /// Rounded once to the 34-digit decimal context
    fn from_rational(value: &Rational) -> Option<Self> {
        value.to_decimal()
    }
}

/// Converts amounts between unit identifiers
#[derive(Debug, Clone)]
pub struct Converter {
    factory: Arc<UnitFactory>,
}

impl Converter {
    pub fn new(factory: Arc<UnitFactory>) -> Self {
        Self { factory }
    }

    pub fn with_catalog(catalog: Arc<Catalog>, config: FactoryConfig) -> Self {
        Self::new(Arc::new(UnitFactory::with_config(catalog, config)))
    }

    /// Converter over the built-in catalog with default settings
    pub fn builtin() -> Result<Self, UnitError> {
        Ok(Self::with_catalog(Arc::new(Catalog::builtin()?), FactoryConfig::default()))
    }

    pub fn factory(&self) -> &Arc<UnitFactory> {
        &self.factory
    }

    /// Convert one amount.
    ///
    /// A mixed source takes the amount as its first component. A mixed
    /// target yields several values, so it fails with `AmountMismatch`
    /// here: splitting 1.27 meter into foot-and-inch is
    /// `convert_list(&[1.27], "meter", "foot-and-inch")`.
    pub fn convert<A: Amount>(&self, amount: A, source: &str, target: &str) -> Result<A, UnitError> {
        let source_unit = self.factory.from(source)?;
        let target_unit = self.factory.from(target)?;
        if target_unit.is_mixed() {
            return Err(UnitError::amount_mismatch(target, target_unit.components().len(), 1));
        }
        if source_unit.is_mixed() {
            let mut values = self.convert_units_list(&[amount], &source_unit, &target_unit)?;
            return values.pop().ok_or_else(|| UnitError::undefined(target));
        }
        self.convert_units(&amount, &source_unit, &target_unit)
    }

    /// Convert a list of amounts between any mix of plain and mixed units;
    /// returns one value per target component
    pub fn convert_list<A: Amount>(&self, amounts: &[A], source: &str, target: &str) -> Result<Vec<A>, UnitError> {
        let source_unit = self.factory.from(source)?;
        let target_unit = self.factory.from(target)?;
        self.convert_units_list(amounts, &source_unit, &target_unit)
    }

    /// Convert one amount between two resolved plain units
    pub fn convert_units<A: Amount>(&self, amount: &A, source: &MeasureUnit, target: &MeasureUnit) -> Result<A, UnitError> {
        let reciprocal = Self::plan(source, target)?;
        if let Some(fast) = amount.convert_linear(source, target, reciprocal) {
            return Ok(fast);
        }
        let value = self.convert_exact(&amount.to_rational(), source, target, reciprocal);
        A::from_rational(&value).ok_or_else(|| UnitError::undefined(target.normalized_identifier()))
    }

    fn convert_units_list<A: Amount>(&self, amounts: &[A], source: &MeasureUnit, target: &MeasureUnit) -> Result<Vec<A>, UnitError> {
        if let ([amount], false, false) = (amounts, source.is_mixed(), target.is_mixed()) {
            return Ok(vec![self.convert_units(amount, source, target)?]);
        }
        let reciprocal = Self::plan(source, target)?;
        let exact: Vec<Rational> = amounts.iter().map(|a| a.to_rational()).collect();
        let base = source.convert_to_base_amounts(&exact)?;
        let base = if reciprocal { base.reciprocal() } else { base };
        target
            .convert_from_base_to_mixed(&base)
            .iter()
            .map(|v| A::from_rational(v).ok_or_else(|| UnitError::undefined(target.normalized_identifier())))
            .collect()
    }

    fn convert_exact(&self, amount: &Rational, source: &MeasureUnit, target: &MeasureUnit, reciprocal: bool) -> Rational {
        let mut intermediate = source.convert_to_base(amount);
        if reciprocal {
            intermediate = intermediate.reciprocal();
        }
        trace!(
            source = source.normalized_identifier(),
            target = target.normalized_identifier(),
            reciprocal,
            base = %intermediate,
            "converting through base"
        );
        target.convert_from_base(&intermediate)
    }

    /// `false` for a direct conversion, `true` through the reciprocal
    fn plan(source: &MeasureUnit, target: &MeasureUnit) -> Result<bool, UnitError> {
        if source.is_directly_convertible_to(target) {
            Ok(false)
        } else if source.is_reciprocal_convertible_to(target) {
            Ok(true)
        } else {
            Err(UnitError::incompatible(source.normalized_identifier(), target.normalized_identifier()))
        }
    }

    /// Whether `a` converts to `b`, directly or through a reciprocal
    pub fn is_convertible(&self, a: &str, b: &str) -> Result<bool, UnitError> {
        let a = self.factory.from(a)?;
        let b = self.factory.from(b)?;
        Ok(a.is_convertible_to(&b))
    }

    /// Canonical base identifier of a unit
    pub fn base_identifier(&self, identifier: &str) -> Result<String, UnitError> {
        Ok(self.factory.from(identifier)?.base_identifier().to_string())
    }
}
