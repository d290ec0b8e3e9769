//! SI and binary prefixes

use mensura_core::Rational;

/// A multiplier prefix such as "kilo" or "kibi"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    pub name: &'static str,
    /// 10 for SI prefixes, 1024 for binary ones
    pub base: u32,
    pub power: i32,
}

impl Prefix {
    const fn si(name: &'static str, power: i32) -> Self {
        Self { name, base: 10, power }
    }

    const fn binary(name: &'static str, power: i32) -> Self {
        Self { name, base: 1024, power }
    }

    pub fn is_binary(&self) -> bool {
        self.base == 1024
    }

    /// Exact multiplier, e.g. 1/1000 for milli
    pub fn factor(&self) -> Rational {
        if self.base == 10 {
            Rational::pow10(self.power as i64)
        } else {
            Rational::from_i64(self.base as i64).pow(self.power)
        }
    }
}

pub const SI_PREFIXES: &[Prefix] = &[
    Prefix::si("quecto", -30),
    Prefix::si("ronto", -27),
    Prefix::si("yocto", -24),
    Prefix::si("zepto", -21),
    Prefix::si("atto", -18),
    Prefix::si("femto", -15),
    Prefix::si("pico", -12),
    Prefix::si("nano", -9),
    Prefix::si("micro", -6),
    Prefix::si("milli", -3),
    Prefix::si("centi", -2),
    Prefix::si("deci", -1),
    Prefix::si("deka", 1),
    Prefix::si("hecto", 2),
    Prefix::si("kilo", 3),
    Prefix::si("mega", 6),
    Prefix::si("giga", 9),
    Prefix::si("tera", 12),
    Prefix::si("peta", 15),
    Prefix::si("exa", 18),
    Prefix::si("zetta", 21),
    Prefix::si("yotta", 24),
    Prefix::si("ronna", 27),
    Prefix::si("quetta", 30),
];

pub const BINARY_PREFIXES: &[Prefix] = &[
    Prefix::binary("kibi", 1),
    Prefix::binary("mebi", 2),
    Prefix::binary("gibi", 3),
    Prefix::binary("tebi", 4),
    Prefix::binary("pebi", 5),
    Prefix::binary("exbi", 6),
    Prefix::binary("zebi", 7),
    Prefix::binary("yobi", 8),
];

/// Units that accept binary prefixes
pub const BINARY_PREFIX_UNITS: &[&str] = &["bit", "byte"];

/// Split a leading prefix off `unit`.
///
/// Every prefix that matches is offered, so the caller can pick the first
/// one whose remainder it knows. The remainder is never empty, and binary
/// prefixes are only offered in front of [`BINARY_PREFIX_UNITS`].
pub fn prefix_candidates(unit: &str) -> impl Iterator<Item = (&'static Prefix, &str)> {
    SI_PREFIXES
        .iter()
        .chain(BINARY_PREFIXES.iter())
        .filter_map(move |prefix| {
            let rest = unit.strip_prefix(prefix.name)?;
            if rest.is_empty() {
                return None;
            }
            if prefix.is_binary() && !BINARY_PREFIX_UNITS.contains(&rest) {
                return None;
            }
            Some((prefix, rest))
        })
}

/// Look a prefix up by name
pub fn find_prefix(name: &str) -> Option<&'static Prefix> {
    SI_PREFIXES
        .iter()
        .chain(BINARY_PREFIXES.iter())
        .find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_si_factor() {
        assert_eq!(find_prefix("kilo").unwrap().factor(), Rational::from_i64(1000));
        assert_eq!(find_prefix("milli").unwrap().factor(), Rational::from_ratio(1, 1000));
        assert_eq!(find_prefix("quetta").unwrap().factor(), Rational::pow10(30));
    }

    #[test]
    fn test_binary_factor() {
        assert_eq!(find_prefix("kibi").unwrap().factor(), Rational::from_i64(1024));
        assert_eq!(find_prefix("mebi").unwrap().factor(), Rational::from_i64(1_048_576));
    }

    #[test]
    fn test_candidates() {
        let found: Vec<_> = prefix_candidates("kilometer").map(|(p, rest)| (p.name, rest)).collect();
        assert_eq!(found, vec![("kilo", "meter")]);
        assert_eq!(prefix_candidates("kilo").count(), 0);
        assert_eq!(prefix_candidates("meter").count(), 0);
    }

    #[test]
    fn test_binary_only_for_digital_units() {
        assert_eq!(prefix_candidates("kibibyte").count(), 1);
        assert_eq!(prefix_candidates("kibimeter").count(), 0);
    }
}
