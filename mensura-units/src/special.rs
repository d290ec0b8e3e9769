//! Non-affine conversions
//!
//! A special unit cannot be expressed as `x * factor + offset`, so it names
//! a transform instead. Special units only work on their own: they never
//! take part in a compound identifier.

use std::fmt;
use std::sync::OnceLock;

use mensura_core::Rational;
use serde::{Deserialize, Serialize};

/// Named transform between a special unit and its base unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialKind {
    /// Wind force scale over meter-per-second
    Beaufort,
}

impl SpecialKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "beaufort" => Some(Self::Beaufort),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Beaufort => "beaufort",
        }
    }

    /// Special value to base value
    pub fn to_base(&self, value: &Rational) -> Rational {
        match self {
            Self::Beaufort => beaufort_to_base(value),
        }
    }

    /// Base value to special value
    pub fn from_base(&self, value: &Rational) -> Rational {
        match self {
            Self::Beaufort => base_to_beaufort(value),
        }
    }
}

impl fmt::Display for SpecialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============ Beaufort ============

/// Lower bound (m/s) of each Beaufort band, plus an artificial upper end
const BEAUFORT_MINIMA: [&str; 19] = [
    "0", "0.3", "1.6", "3.4", "5.5", "8.0", "10.8", "13.9", "17.2", "20.8", "24.5", "28.5",
    "32.7", "36.9", "41.4", "46.1", "51.1", "55.8", "61.4",
];

const BEAUFORT_MAX: usize = BEAUFORT_MINIMA.len() - 2;

fn beaufort_minima() -> &'static [Rational] {
    static TABLE: OnceLock<Vec<Rational>> = OnceLock::new();
    TABLE.get_or_init(|| {
        BEAUFORT_MINIMA
            .iter()
            .map(|s| Rational::from_str(s).unwrap_or_else(|_| Rational::nan()))
            .collect()
    })
}

/// Midpoint of the band for the scale value rounded half up, sign dropped
fn beaufort_to_base(value: &Rational) -> Rational {
    if value.is_nan() {
        return Rational::nan();
    }
    let half = Rational::from_ratio(1, 2);
    let rounded = value.abs().add(&half).floor();
    let limit = Rational::from_i64(BEAUFORT_MAX as i64);
    let index = if rounded > limit {
        BEAUFORT_MAX
    } else {
        rounded.to_f64() as usize
    };
    let table = beaufort_minima();
    table[index].add(&table[index + 1]).mul(&half)
}

/// Band index containing the speed, sign dropped
fn base_to_beaufort(value: &Rational) -> Rational {
    if value.is_nan() {
        return Rational::nan();
    }
    let speed = value.abs();
    let table = beaufort_minima();
    let above = table.partition_point(|min| *min <= speed);
    let index = above.saturating_sub(1).min(BEAUFORT_MAX);
    Rational::from_i64(index as i64)
}
