//! Unit identifier parsing - "kilogram-meter-per-square-second" and friends
//!
//! An identifier is a `-`-joined token string. Atomic units are collected
//! into a numerator and a denominator, each atomic with a positive power,
//! together with a constant factor contributed by numeric tokens
//! ("liter-per-100-kilometer").

use std::fmt;

use mensura_core::{Rational, UnitError};

use crate::catalog::Catalog;

/// Highest power a `powN` marker accepts
pub const MAX_POWER: u32 = 15;

/// Longest run of tokens tried as one atomic name ("fluid-ounce-imperial")
const MAX_ATOMIC_TOKENS: usize = 3;

/// One atomic unit raised to a positive power
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitFactor {
    pub unit: String,
    pub power: u32,
}

/// Parsed unit identifier
#[derive(Debug, Clone, PartialEq)]
pub struct UnitId {
    numerator: Vec<UnitFactor>,
    denominator: Vec<UnitFactor>,
    constant: Rational,
}

fn is_power_marker(token: &str) -> bool {
    matches!(token, "square" | "cubic") || token.starts_with("pow")
}

fn is_reserved(token: &str) -> bool {
    matches!(token, "per" | "and")
        || is_power_marker(token)
        || token.starts_with(|c: char| c.is_ascii_digit())
}

/// Numeric tokens: `[0-9]+(e[0-9]+)?`
fn parse_constant(identifier: &str, token: &str) -> Result<Rational, UnitError> {
    let (digits, exponent) = token.split_once('e').unwrap_or((token, ""));
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(digits) || (token.contains('e') && !all_digits(exponent)) {
        return Err(UnitError::parse(identifier, format!("malformed constant '{}'", token)));
    }
    let value = Rational::from_str(token)
        .map_err(|_| UnitError::parse(identifier, format!("malformed constant '{}'", token)))?;
    if value.is_zero() {
        return Err(UnitError::parse(identifier, "constant factor cannot be zero"));
    }
    Ok(value)
}

fn parse_power_marker(identifier: &str, token: &str) -> Result<u32, UnitError> {
    match token {
        "square" => Ok(2),
        "cubic" => Ok(3),
        _ => token
            .strip_prefix("pow")
            .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|n| (2..=MAX_POWER).contains(n))
            .ok_or_else(|| {
                UnitError::parse(
                    identifier,
                    format!("malformed power marker '{}', expected pow2 to pow{}", token, MAX_POWER),
                )
            }),
    }
}

/// Greedily join tokens into the longest name the catalog knows
fn longest_atomic(tokens: &[&str], catalog: &Catalog) -> (String, usize) {
    let longest = MAX_ATOMIC_TOKENS.min(tokens.len());
    for len in (2..=longest).rev() {
        let run = &tokens[..len];
        if run.iter().any(|t| t.is_empty() || is_reserved(t)) {
            continue;
        }
        let joined = run.join("-");
        if catalog.is_known(&joined) {
            return (joined, len);
        }
    }
    (tokens[0].to_string(), 1)
}

impl UnitId {
    /// The empty (dimensionless) identifier
    pub fn empty() -> Self {
        Self { numerator: Vec::new(), denominator: Vec::new(), constant: Rational::one() }
    }

    /// Parse an identifier into canonical order.
    ///
    /// Unknown atomic names are kept; they only fail at resolution.
    pub fn parse(identifier: &str, catalog: &Catalog) -> Result<Self, UnitError> {
        if identifier.is_empty() {
            return Err(UnitError::parse(identifier, "empty identifier"));
        }
        if let Some(bad) = identifier
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(UnitError::parse(identifier, format!("unexpected character '{}'", bad)));
        }

        let tokens: Vec<&str> = identifier.split('-').collect();
        let mut id = Self::empty();
        let mut in_numerator = true;
        let mut denominator_seen = false;
        let mut pending: Option<(&str, u32)> = None;
        let mut i = 0;

        while i < tokens.len() {
            let token = tokens[i];
            if token.is_empty() {
                return Err(UnitError::parse(identifier, "empty segment"));
            }
            match token {
                "per" => {
                    if let Some((marker, _)) = pending {
                        return Err(UnitError::parse(identifier, format!("'{}' must be followed by a unit", marker)));
                    }
                    if !in_numerator {
                        return Err(UnitError::parse(identifier, "second 'per'"));
                    }
                    in_numerator = false;
                }
                "and" => {
                    return Err(UnitError::parse(identifier, "'and' only joins the parts of a mixed unit"));
                }
                t if is_power_marker(t) && (matches!(t, "square" | "cubic") || t.len() > 3) => {
                    if let Some((marker, _)) = pending {
                        return Err(UnitError::parse(identifier, format!("'{}' must be followed by a unit", marker)));
                    }
                    pending = Some((t, parse_power_marker(identifier, t)?));
                }
                t if t.starts_with(|c: char| c.is_ascii_digit()) => {
                    if let Some((marker, _)) = pending {
                        return Err(UnitError::parse(identifier, format!("'{}' cannot apply to a constant", marker)));
                    }
                    let value = parse_constant(identifier, t)?;
                    id.constant = if in_numerator { id.constant.mul(&value) } else { id.constant.div(&value) };
                    denominator_seen |= !in_numerator;
                }
                _ => {
                    let (name, used) = longest_atomic(&tokens[i..], catalog);
                    let power = pending.take().map_or(1, |(_, p)| p);
                    id.add_factor(&name, power, in_numerator);
                    denominator_seen |= !in_numerator;
                    i += used;
                    continue;
                }
            }
            i += 1;
        }

        if let Some((marker, _)) = pending {
            return Err(UnitError::parse(identifier, format!("'{}' must be followed by a unit", marker)));
        }
        if !in_numerator && !denominator_seen {
            return Err(UnitError::parse(identifier, "'per' must be followed by a unit"));
        }
        if id.numerator.is_empty() && id.denominator.is_empty() {
            return Err(UnitError::parse(identifier, "no units, only constants"));
        }

        id.sort(catalog);
        Ok(id)
    }

    fn add_factor(&mut self, unit: &str, power: u32, in_numerator: bool) {
        let side = if in_numerator { &mut self.numerator } else { &mut self.denominator };
        match side.iter_mut().find(|f| f.unit == unit) {
            Some(existing) => existing.power += power,
            None => side.push(UnitFactor { unit: unit.to_string(), power }),
        }
    }

    /// Add every factor of `group`, raised to `power`, on one side
    pub fn add_group(&mut self, group: &UnitId, power: u32, in_numerator: bool) {
        for f in &group.numerator {
            self.add_factor(&f.unit, f.power * power, in_numerator);
        }
        for f in &group.denominator {
            self.add_factor(&f.unit, f.power * power, !in_numerator);
        }
        let scale = group.constant.pow(power as i32);
        self.constant = if in_numerator { self.constant.mul(&scale) } else { self.constant.div(&scale) };
    }

    /// Arrange both sides by the catalog's unit ordering
    pub fn sort(&mut self, catalog: &Catalog) {
        self.numerator.sort_by(|a, b| catalog.compare_units(&a.unit, &b.unit));
        self.denominator.sort_by(|a, b| catalog.compare_units(&a.unit, &b.unit));
    }

    /// Cancel units that appear on both sides
    pub fn resolve(mut self) -> Self {
        for f in self.numerator.iter_mut() {
            if let Some(d) = self.denominator.iter_mut().find(|d| d.unit == f.unit) {
                let common = f.power.min(d.power);
                f.power -= common;
                d.power -= common;
            }
        }
        self.numerator.retain(|f| f.power > 0);
        self.denominator.retain(|f| f.power > 0);
        self
    }

    /// Swap numerator and denominator
    pub fn reciprocal(&self) -> Self {
        Self {
            numerator: self.denominator.clone(),
            denominator: self.numerator.clone(),
            constant: self.constant.reciprocal(),
        }
    }

    /// Product of two identifiers, in canonical order
    pub fn times(&self, other: &UnitId, catalog: &Catalog) -> Self {
        let mut product = self.clone();
        product.add_group(other, 1, true);
        product.sort(catalog);
        product
    }

    pub fn numerator(&self) -> &[UnitFactor] {
        &self.numerator
    }

    pub fn denominator(&self) -> &[UnitFactor] {
        &self.denominator
    }

    pub fn constant(&self) -> &Rational {
        &self.constant
    }

    /// Every factor with the side it sits on (`true` for the numerator)
    pub fn factors(&self) -> impl Iterator<Item = (&UnitFactor, bool)> {
        self.numerator
            .iter()
            .map(|f| (f, true))
            .chain(self.denominator.iter().map(|f| (f, false)))
    }

    /// The single atomic unit at power 1, if that is all there is
    pub fn single_atomic(&self) -> Option<&str> {
        match (self.numerator.as_slice(), self.denominator.is_empty()) {
            ([only], true) if only.power == 1 && self.constant.is_one() => Some(&only.unit),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.numerator.is_empty() && self.denominator.is_empty()
    }
}

/// Constants render as digits, long powers of ten as `1eN`
fn write_constant(parts: &mut Vec<String>, value: Option<String>) {
    if let Some(digits) = value {
        if digits == "1" {
            return;
        }
        let trimmed = digits.trim_end_matches('0');
        let zeros = digits.len() - trimmed.len();
        if digits.len() > 7 && zeros > 0 {
            parts.push(format!("{}e{}", trimmed, zeros));
        } else {
            parts.push(digits);
        }
    }
}

fn write_factor(parts: &mut Vec<String>, factor: &UnitFactor) {
    match factor.power {
        1 => parts.push(factor.unit.clone()),
        2 => parts.push(format!("square-{}", factor.unit)),
        3 => parts.push(format!("cubic-{}", factor.unit)),
        n => parts.push(format!("pow{}-{}", n, factor.unit)),
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        write_constant(&mut parts, self.constant.numerator().map(|n| n.to_string()));
        for factor in &self.numerator {
            write_factor(&mut parts, factor);
        }
        let den_constant = self.constant.denominator().map(|d| d.to_string());
        let has_den_constant = den_constant.as_deref().map_or(false, |d| d != "1");
        if !self.denominator.is_empty() || has_den_constant {
            parts.push("per".to_string());
            write_constant(&mut parts, den_constant);
            for factor in &self.denominator {
                write_factor(&mut parts, factor);
            }
        }
        write!(f, "{}", parts.join("-"))
    }
}
