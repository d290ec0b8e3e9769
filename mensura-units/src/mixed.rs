//! Mixed units such as "foot-and-inch"

use std::fmt;

use mensura_core::{Rational, UnitError};

use crate::measure::{MeasureUnit, UnitFactory};

/// Separator between the components of a mixed unit
pub const MIXED_JOINER: &str = "-and-";

/// Two or more units of one base, each strictly smaller than the one before
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MixedMeasureUnit {
    unit: MeasureUnit,
}

impl MixedMeasureUnit {
    /// Build and validate a mixed unit.
    ///
    /// Errors from a component propagate unchanged, and special or offset
    /// components are rejected. Duplicates are dropped, first occurrence
    /// wins. The remaining components must all share one base, then
    /// strictly decrease in magnitude, then number at least two.
    pub fn from(factory: &UnitFactory, compound: &str) -> Result<Self, UnitError> {
        let mut components: Vec<MeasureUnit> = Vec::new();
        for part in compound.split(MIXED_JOINER) {
            let unit = factory.from(part)?;
            if unit.is_special() {
                return Err(UnitError::unsupported(compound, part, "special units cannot be mixed"));
            }
            if unit.conversion_info().has_offset() {
                return Err(UnitError::unsupported(compound, part, "units with an offset cannot be mixed"));
            }
            if !components.contains(&unit) {
                components.push(unit);
            }
        }

        for pair in components.windows(2) {
            if !pair[1].is_directly_convertible_to(&pair[0]) {
                return Err(UnitError::incompatible(compound, pair[1].normalized_identifier()));
            }
        }

        for pair in components.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            if next.is_smaller_than(previous) != Some(true) {
                return Err(UnitError::bad_order(
                    compound,
                    previous.normalized_identifier(),
                    next.normalized_identifier(),
                ));
            }
        }

        if components.len() < 2 {
            return Err(UnitError::degenerate(compound, components.len()));
        }

        let normalized = components
            .iter()
            .map(MeasureUnit::normalized_identifier)
            .collect::<Vec<_>>()
            .join(MIXED_JOINER);
        let first = &components[0];
        let unit = MeasureUnit::new(
            normalized,
            first.conversion_info().clone(),
            first.base_identifier().to_string(),
            Some(components.clone()),
        );
        Ok(Self { unit })
    }

    pub fn components(&self) -> &[MeasureUnit] {
        self.unit.components()
    }

    pub fn normalized_identifier(&self) -> &str {
        self.unit.normalized_identifier()
    }

    pub fn base_identifier(&self) -> &str {
        self.unit.base_identifier()
    }

    pub fn as_measure_unit(&self) -> &MeasureUnit {
        &self.unit
    }

    pub fn into_measure_unit(self) -> MeasureUnit {
        self.unit
    }

    /// Sum of the amounts as a base value; see [`MeasureUnit::convert_to_base_amounts`]
    pub fn convert_to_base(&self, amounts: &[Rational]) -> Result<Rational, UnitError> {
        self.unit.convert_to_base_amounts(amounts)
    }

    /// One value per component; see [`MeasureUnit::convert_from_base_to_mixed`]
    pub fn convert_from_base_to_mixed(&self, amount: &Rational) -> Vec<Rational> {
        self.unit.convert_from_base_to_mixed(amount)
    }
}

impl fmt::Display for MixedMeasureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unit)
    }
}
