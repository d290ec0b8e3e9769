//! Conversion catalog - atomic units, quantities and named constants
//!
//! The catalog is read-only once built and shared behind an `Arc`. It
//! knows three things:
//! - which base units exist, via the quantity table (whose order is also
//!   the priority order used to arrange identifiers)
//! - how each atomic unit converts to its base unit
//! - named constants usable inside factor expressions

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use mensura_core::{Rational, UnitError};
use serde::Serialize;
use tracing::debug;

use crate::conversion::ConversionInfo;
use crate::prefix::{prefix_candidates, Prefix};
use crate::special::SpecialKind;
use crate::unit_id::UnitId;

/// Built-in catalog text
pub const BUILTIN_CATALOG: &str = include_str!("../data/units.tsv");

/// A named quantity and the base unit it is measured in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quantity {
    pub name: String,
    pub base_identifier: String,
}

/// One conversion rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub source: String,
    pub target: String,
    pub info: ConversionInfo,
}

/// An atomic unit as the catalog understands it, prefix applied
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicUnit {
    pub name: String,
    /// Canonical base identifier
    pub target: String,
    pub info: ConversionInfo,
    pub prefix: Option<&'static Prefix>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    quantities: Vec<Quantity>,
    quantity_rank: HashMap<String, usize>,
    base_units: HashSet<String>,
    entries: HashMap<String, CatalogEntry>,
    constants: HashMap<String, Rational>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The catalog shipped with the crate
    pub fn builtin() -> Result<Self, UnitError> {
        Self::from_tsv(BUILTIN_CATALOG)
    }

    /// Load a catalog from its tab-separated text form
    pub fn from_tsv(text: &str) -> Result<Self, UnitError> {
        let mut builder = CatalogBuilder::default();
        for (index, raw) in text.lines().enumerate() {
            builder.read_line(index + 1, raw)?;
        }
        let catalog = builder.build()?;
        debug!(
            quantities = catalog.quantities.len(),
            units = catalog.entries.len(),
            constants = catalog.constants.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    // ========== Lookup ==========

    /// Look up an atomic unit directly, then with a prefix stripped.
    ///
    /// Prefixes only apply to linear units.
    pub fn lookup(&self, name: &str) -> Option<AtomicUnit> {
        if let Some(unit) = self.lookup_unprefixed(name) {
            return Some(unit);
        }
        prefix_candidates(name).find_map(|(prefix, rest)| {
            let base = self.lookup_unprefixed(rest)?;
            if base.info.is_special() || base.info.has_offset() {
                return None;
            }
            Some(AtomicUnit {
                name: name.to_string(),
                target: base.target,
                info: ConversionInfo::linear(base.info.factor.mul(&prefix.factor())),
                prefix: Some(prefix),
            })
        })
    }

    fn lookup_unprefixed(&self, name: &str) -> Option<AtomicUnit> {
        if self.base_units.contains(name) {
            return Some(AtomicUnit {
                name: name.to_string(),
                target: name.to_string(),
                info: ConversionInfo::identity(),
                prefix: None,
            });
        }
        self.entries.get(name).map(|entry| AtomicUnit {
            name: name.to_string(),
            target: entry.target.clone(),
            info: entry.info.clone(),
            prefix: None,
        })
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn is_base_unit(&self, name: &str) -> bool {
        self.base_units.contains(name)
    }

    pub fn constant(&self, name: &str) -> Option<&Rational> {
        self.constants.get(name)
    }

    pub fn quantities(&self) -> &[Quantity] {
        &self.quantities
    }

    /// Quantity measured by a canonical base identifier
    pub fn quantity_of(&self, base_identifier: &str) -> Option<&str> {
        self.quantity_rank
            .get(base_identifier)
            .map(|&rank| self.quantities[rank].name.as_str())
    }

    /// All conversion rules, sorted by source name
    pub fn entries(&self) -> Vec<&CatalogEntry> {
        let mut entries: Vec<&CatalogEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.source.cmp(&b.source));
        entries
    }

    /// Base unit names, in priority order
    pub fn base_units(&self) -> Vec<&str> {
        self.quantities
            .iter()
            .map(|q| q.base_identifier.as_str())
            .filter(|id| self.base_units.contains(*id))
            .collect()
    }

    // ========== Ordering ==========

    fn sort_key(&self, name: &str) -> Option<(usize, Rational)> {
        let unit = self.lookup(name)?;
        let rank = self.quantity_rank.get(&unit.target).copied().unwrap_or(usize::MAX);
        Some((rank, unit.info.factor))
    }

    /// Order of atomic units inside an identifier: quantity priority of the
    /// unit's base, then factor, then name. Unknown units sort last.
    pub fn compare_units(&self, a: &str, b: &str) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        match (self.sort_key(a), self.sort_key(b)) {
            (Some((rank_a, factor_a)), Some((rank_b, factor_b))) => rank_a
                .cmp(&rank_b)
                .then_with(|| factor_a.partial_cmp(&factor_b).unwrap_or(Ordering::Equal))
                .then_with(|| a.cmp(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    /// Canonical form of an identifier made of base units only
    fn canonical_base(&self, identifier: &str) -> Result<String, String> {
        let id = UnitId::parse(identifier, self).map_err(|e| e.to_string())?;
        if let Some((factor, _)) = id.factors().find(|(f, _)| !self.base_units.contains(&f.unit)) {
            return Err(format!("'{}' is not a base unit", factor.unit));
        }
        if !id.constant().is_one() {
            return Err("base identifiers cannot carry constants".to_string());
        }
        Ok(id.resolve().to_string())
    }
}

// ============ Builder ============

#[derive(Debug, Clone)]
enum PendingRule {
    Linear { factor: Rational, offset: Rational },
    Special(SpecialKind),
}

#[derive(Debug, Clone)]
struct PendingEntry {
    line: usize,
    source: String,
    target: String,
    rule: PendingRule,
}

/// Collects records, then validates them all at once in [`CatalogBuilder::build`]
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    quantities: Vec<(usize, Quantity)>,
    entries: Vec<PendingEntry>,
    constants: HashMap<String, Rational>,
}

impl CatalogBuilder {
    pub fn quantity(mut self, name: &str, base_identifier: &str) -> Self {
        self.push_quantity(0, name, base_identifier);
        self
    }

    pub fn constant(mut self, name: &str, value: Rational) -> Self {
        self.constants.insert(name.to_string(), value);
        self
    }

    pub fn convert(mut self, source: &str, target: &str, factor: Rational, offset: Rational) -> Self {
        self.push_entry(0, source, target, PendingRule::Linear { factor, offset });
        self
    }

    pub fn special(mut self, source: &str, target: &str, kind: SpecialKind) -> Self {
        self.push_entry(0, source, target, PendingRule::Special(kind));
        self
    }

    fn push_quantity(&mut self, line: usize, name: &str, base_identifier: &str) {
        let quantity = Quantity { name: name.to_string(), base_identifier: base_identifier.to_string() };
        self.quantities.push((line, quantity));
    }

    fn push_entry(&mut self, line: usize, source: &str, target: &str, rule: PendingRule) {
        self.entries.push(PendingEntry {
            line,
            source: source.to_string(),
            target: target.to_string(),
            rule,
        });
    }

    fn expression(&self, line: usize, raw: &str, text: &str) -> Result<Rational, UnitError> {
        let value = Rational::parse_with(text, |name| self.constants.get(name).cloned())
            .map_err(|e| UnitError::catalog(line, raw, e.to_string()))?;
        if value.is_nan() {
            return Err(UnitError::catalog(line, raw, format!("'{}' is not a number", text)));
        }
        Ok(value)
    }

    /// Parse one catalog line; comments and blank lines are skipped
    fn read_line(&mut self, line: usize, raw: &str) -> Result<(), UnitError> {
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            return Ok(());
        }
        let fields: Vec<&str> = text.split_whitespace().collect();
        match fields.as_slice() {
            ["quantity", name, base] => self.push_quantity(line, name, base),
            ["constant", name, expr] => {
                if self.constants.contains_key(*name) {
                    return Err(UnitError::catalog(line, raw, format!("duplicate constant '{}'", name)));
                }
                let value = self.expression(line, raw, expr)?;
                self.constants.insert(name.to_string(), value);
            }
            ["convert", source, target, factor] => {
                let factor = self.expression(line, raw, factor)?;
                let rule = PendingRule::Linear { factor, offset: Rational::zero() };
                self.push_entry(line, source, target, rule);
            }
            ["convert", source, target, factor, offset] => {
                let factor = self.expression(line, raw, factor)?;
                let offset = self.expression(line, raw, offset)?;
                self.push_entry(line, source, target, PendingRule::Linear { factor, offset });
            }
            ["special", source, target, transform] => {
                let kind = SpecialKind::from_name(transform).ok_or_else(|| {
                    UnitError::catalog(line, raw, format!("unknown transform '{}'", transform))
                })?;
                self.push_entry(line, source, target, PendingRule::Special(kind));
            }
            [kind, ..] if !matches!(*kind, "quantity" | "constant" | "convert" | "special") => {
                return Err(UnitError::catalog(line, raw, format!("unknown record kind '{}'", kind)));
            }
            _ => return Err(UnitError::catalog(line, raw, "wrong number of fields")),
        }
        Ok(())
    }

    pub fn build(self) -> Result<Catalog, UnitError> {
        let mut catalog = Catalog { constants: self.constants, ..Catalog::default() };

        // Base units come from single-unit quantities
        for (line, quantity) in &self.quantities {
            if catalog.quantities.iter().any(|q| q.name == quantity.name) {
                return Err(UnitError::catalog(*line, &quantity.name, "duplicate quantity"));
            }
            let base = &quantity.base_identifier;
            let simple = !base.is_empty()
                && base.chars().all(|c| c.is_ascii_lowercase())
                && base != "per";
            if simple {
                catalog.base_units.insert(base.clone());
            }
            catalog.quantity_rank.insert(base.clone(), catalog.quantities.len());
            catalog.quantities.push(quantity.clone());
        }

        // Compound quantity ids need the ranks above before they can be ordered
        let mut canonical = Vec::with_capacity(self.quantities.len());
        for (line, quantity) in &self.quantities {
            let id = catalog
                .canonical_base(&quantity.base_identifier)
                .map_err(|reason| UnitError::catalog(*line, &quantity.base_identifier, reason))?;
            canonical.push(id);
        }
        catalog.quantity_rank.clear();
        for (rank, id) in canonical.into_iter().enumerate() {
            if catalog.quantity_rank.contains_key(&id) {
                let (line, quantity) = &self.quantities[rank];
                return Err(UnitError::catalog(*line, &quantity.base_identifier, "two quantities share a base unit"));
            }
            catalog.quantities[rank].base_identifier = id.clone();
            catalog.quantity_rank.insert(id, rank);
        }

        for pending in self.entries {
            let PendingEntry { line, source, target, rule } = pending;
            if catalog.base_units.contains(&source) || catalog.entries.contains_key(&source) {
                return Err(UnitError::catalog(line, &source, "unit defined twice"));
            }
            let target = catalog
                .canonical_base(&target)
                .map_err(|reason| UnitError::catalog(line, &target, reason))?;
            let info = match rule {
                PendingRule::Linear { factor, .. } if factor.is_zero() => {
                    return Err(UnitError::catalog(line, &source, "zero factor"));
                }
                PendingRule::Linear { factor, offset } => ConversionInfo::new(factor, offset),
                PendingRule::Special(kind) => ConversionInfo::special(kind),
            };
            catalog.entries.insert(source.clone(), CatalogEntry { source, target, info });
        }

        Ok(catalog)
    }
}
