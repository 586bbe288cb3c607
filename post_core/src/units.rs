//! # Units
//!
//! Parsing and conversion of unit strings in the format used by the results
//! database and the host application (`in`, `lbf`, `lbf*in`, `in^-2`, `psi`,
//! `N*mm`, `[MPa]`).
//!
//! Every unit is reduced to a factor relative to SI (metres, newtons) and a
//! dimension expressed as powers of length and force. Two units convert
//! into each other only when their dimensions match.
//!
//! ## Output unit system
//!
//! A [`UnitSystem`] is the pair of length/force units requested for output.
//! All other output units are derived from it:
//!
//! | Quantity  | Derived unit                       |
//! |-----------|------------------------------------|
//! | Stress    | `psi` (in + lbf), `MPa` (mm + N), else `F*L^-2` |
//! | Moment    | `F*L`                              |
//! | Stiffness | `F*L^-1`                           |
//! | Area      | `L^2`                              |
//! | Inertia   | `L^4`                              |
//!
//! ## Example
//!
//! ```rust
//! use post_core::units::{Unit, UnitSystem};
//!
//! let psi = Unit::parse("psi").unwrap();
//! let mpa = Unit::parse("MPa").unwrap();
//! let value = psi.convert(1000.0, &mpa).unwrap();
//! assert!((value - 6.894757).abs() < 1e-5);
//!
//! let system = UnitSystem::new("in", "lbf").unwrap();
//! assert_eq!(system.stress_symbol(), "psi");
//! assert_eq!(system.moment_symbol(), "lbf*in");
//! ```

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{PostError, PostResult};

/// Powers of length and force making up a physical dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimension {
    /// Power of length
    pub length: i32,
    /// Power of force
    pub force: i32,
}

impl Dimension {
    pub const NONE: Dimension = Dimension { length: 0, force: 0 };
    pub const LENGTH: Dimension = Dimension { length: 1, force: 0 };
    pub const FORCE: Dimension = Dimension { length: 0, force: 1 };
    pub const MOMENT: Dimension = Dimension { length: 1, force: 1 };
    pub const STRESS: Dimension = Dimension { length: -2, force: 1 };

    fn scaled(self, power: i32) -> Dimension {
        Dimension {
            length: self.length * power,
            force: self.force * power,
        }
    }

    fn combined(self, other: Dimension) -> Dimension {
        Dimension {
            length: self.length + other.length,
            force: self.force + other.force,
        }
    }
}

// ============================================================================
// Base unit table
// ============================================================================

/// Factor to SI and dimension for every recognised base symbol.
static BASE_UNITS: Lazy<HashMap<&'static str, (f64, Dimension)>> = Lazy::new(|| {
    let mut table = HashMap::new();

    // Length
    table.insert("m", (1.0, Dimension::LENGTH));
    table.insert("cm", (1.0e-2, Dimension::LENGTH));
    table.insert("mm", (1.0e-3, Dimension::LENGTH));
    table.insert("um", (1.0e-6, Dimension::LENGTH));
    table.insert("in", (0.0254, Dimension::LENGTH));
    table.insert("ft", (0.3048, Dimension::LENGTH));

    // Force
    table.insert("N", (1.0, Dimension::FORCE));
    table.insert("mN", (1.0e-3, Dimension::FORCE));
    table.insert("kN", (1.0e3, Dimension::FORCE));
    table.insert("lbf", (4.448_221_615_260_5, Dimension::FORCE));
    table.insert("lb", (4.448_221_615_260_5, Dimension::FORCE));
    table.insert("kip", (4_448.221_615_260_5, Dimension::FORCE));
    table.insert("kips", (4_448.221_615_260_5, Dimension::FORCE));

    // Stress
    table.insert("Pa", (1.0, Dimension::STRESS));
    table.insert("kPa", (1.0e3, Dimension::STRESS));
    table.insert("MPa", (1.0e6, Dimension::STRESS));
    table.insert("GPa", (1.0e9, Dimension::STRESS));
    table.insert("psi", (6_894.757_293_168_361, Dimension::STRESS));
    table.insert("ksi", (6_894_757.293_168_361, Dimension::STRESS));

    table
});

/// A parsed unit: its original symbol, factor to SI and dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    symbol: String,
    factor: f64,
    dimension: Dimension,
}

impl Unit {
    /// Parse a unit string.
    ///
    /// Accepts a product of base symbols separated by `*` or whitespace,
    /// each with an optional integer power (`lbf*in^-2`). Surrounding
    /// brackets are stripped (`[lbf*in]`).
    pub fn parse(symbol: &str) -> PostResult<Unit> {
        let trimmed = symbol
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim();
        if trimmed.is_empty() {
            return Err(PostError::invalid_input("unit", symbol, "Unit string is empty"));
        }

        let mut factor = 1.0;
        let mut dimension = Dimension::NONE;
        for token in trimmed.split(|c: char| c == '*' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let (base, power) = match token.split_once('^') {
                Some((base, power)) => {
                    let power: i32 = power.parse().map_err(|_| {
                        PostError::invalid_input("unit", symbol, format!("Bad exponent in '{}'", token))
                    })?;
                    (base, power)
                }
                None => (token, 1),
            };
            let (base_factor, base_dimension) = BASE_UNITS.get(base).copied().ok_or_else(|| {
                PostError::invalid_input("unit", symbol, format!("Unknown unit symbol '{}'", base))
            })?;
            factor *= base_factor.powi(power);
            dimension = dimension.combined(base_dimension.scaled(power));
        }

        Ok(Unit {
            symbol: trimmed.to_string(),
            factor,
            dimension,
        })
    }

    /// The symbol as written (without brackets)
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The dimension of this unit
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Multiplier that converts a value in `self` into a value in `target`.
    pub fn factor_to(&self, target: &Unit) -> PostResult<f64> {
        if self.dimension != target.dimension {
            return Err(PostError::invalid_input(
                "unit",
                format!("{} -> {}", self.symbol, target.symbol),
                "Units have different dimensions",
            ));
        }
        Ok(self.factor / target.factor)
    }

    /// Convert a value expressed in `self` into `target`.
    pub fn convert(&self, value: f64, target: &Unit) -> PostResult<f64> {
        Ok(value * self.factor_to(target)?)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

// ============================================================================
// Output unit system
// ============================================================================

/// Length and force units requested for output, with derived symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSystem {
    /// Length unit symbol (e.g. "in", "mm")
    pub length: String,
    /// Force unit symbol (e.g. "lbf", "N")
    pub force: String,
}

impl Default for UnitSystem {
    fn default() -> Self {
        UnitSystem {
            length: "in".to_string(),
            force: "lbf".to_string(),
        }
    }
}

impl UnitSystem {
    /// Create a unit system, validating that both symbols have the right dimension.
    pub fn new(length: impl Into<String>, force: impl Into<String>) -> PostResult<Self> {
        let system = UnitSystem {
            length: length.into(),
            force: force.into(),
        };
        system.validate()?;
        Ok(system)
    }

    /// Check that `length` is a length and `force` is a force.
    pub fn validate(&self) -> PostResult<()> {
        if Unit::parse(&self.length)?.dimension() != Dimension::LENGTH {
            return Err(PostError::invalid_input(
                "length_unit",
                self.length.clone(),
                "Not a length unit",
            ));
        }
        if Unit::parse(&self.force)?.dimension() != Dimension::FORCE {
            return Err(PostError::invalid_input(
                "force_unit",
                self.force.clone(),
                "Not a force unit",
            ));
        }
        Ok(())
    }

    /// Stress symbol: `psi` for in/lbf, `MPa` for mm/N, else `F*L^-2`.
    pub fn stress_symbol(&self) -> String {
        if self.length.eq_ignore_ascii_case("in") && self.force.eq_ignore_ascii_case("lbf") {
            "psi".to_string()
        } else if self.length.eq_ignore_ascii_case("mm") && self.force.eq_ignore_ascii_case("n") {
            "MPa".to_string()
        } else {
            format!("{}*{}^-2", self.force, self.length)
        }
    }

    /// Moment/torque symbol `F*L`
    pub fn moment_symbol(&self) -> String {
        format!("{}*{}", self.force, self.length)
    }

    /// Axial stiffness symbol `F*L^-1`
    pub fn stiffness_symbol(&self) -> String {
        format!("{}*{}^-1", self.force, self.length)
    }

    /// Area symbol `L^2`
    pub fn area_symbol(&self) -> String {
        format!("{}^2", self.length)
    }

    /// Second moment of area symbol `L^4`
    pub fn inertia_symbol(&self) -> String {
        format!("{}^4", self.length)
    }

    pub fn length_unit(&self) -> PostResult<Unit> {
        Unit::parse(&self.length)
    }

    pub fn force_unit(&self) -> PostResult<Unit> {
        Unit::parse(&self.force)
    }

    pub fn moment_unit(&self) -> PostResult<Unit> {
        Unit::parse(&self.moment_symbol())
    }

    pub fn stress_unit(&self) -> PostResult<Unit> {
        Unit::parse(&self.stress_symbol())
    }

    pub fn stiffness_unit(&self) -> PostResult<Unit> {
        Unit::parse(&self.stiffness_symbol())
    }

    pub fn area_unit(&self) -> PostResult<Unit> {
        Unit::parse(&self.area_symbol())
    }

    pub fn inertia_unit(&self) -> PostResult<Unit> {
        Unit::parse(&self.inertia_symbol())
    }
}

/// Bracketed label used in column headers: `label("psi") == "[psi]"`.
pub fn label(symbol: &str) -> String {
    format!("[{}]", symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_simple_units() {
        let inch = Unit::parse("in").unwrap();
        assert_eq!(inch.dimension(), Dimension::LENGTH);
        let mm = Unit::parse("[mm]").unwrap();
        assert_eq!(mm.symbol(), "mm");
        assert_relative_eq!(inch.convert(1.0, &mm).unwrap(), 25.4, max_relative = 1e-12);
    }

    #[test]
    fn test_parse_compound_units() {
        let moment = Unit::parse("lbf*in").unwrap();
        assert_eq!(moment.dimension(), Dimension::MOMENT);
        let n_mm = Unit::parse("N*mm").unwrap();
        assert_relative_eq!(moment.convert(1.0, &n_mm).unwrap(), 112.984_829, max_relative = 1e-6);

        // Space-separated form used by older scripts
        let spaced = Unit::parse("lbf in").unwrap();
        assert_eq!(spaced.dimension(), Dimension::MOMENT);
    }

    #[test]
    fn test_named_stress_matches_derived_stress() {
        let psi = Unit::parse("psi").unwrap();
        let derived = Unit::parse("lbf*in^-2").unwrap();
        assert_eq!(psi.dimension(), derived.dimension());
        assert_relative_eq!(psi.factor_to(&derived).unwrap(), 1.0, max_relative = 1e-9);

        let mpa = Unit::parse("MPa").unwrap();
        let n_mm2 = Unit::parse("N*mm^-2").unwrap();
        assert_relative_eq!(mpa.factor_to(&n_mm2).unwrap(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let psi = Unit::parse("psi").unwrap();
        let lbf = Unit::parse("lbf").unwrap();
        let err = psi.convert(1.0, &lbf).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        assert!(Unit::parse("furlong").is_err());
        assert!(Unit::parse("in^x").is_err());
        assert!(Unit::parse("").is_err());
    }

    #[test]
    fn test_unit_system_derived_symbols() {
        let imperial = UnitSystem::new("in", "lbf").unwrap();
        assert_eq!(imperial.stress_symbol(), "psi");
        assert_eq!(imperial.moment_symbol(), "lbf*in");
        assert_eq!(imperial.stiffness_symbol(), "lbf*in^-1");
        assert_eq!(imperial.area_symbol(), "in^2");
        assert_eq!(imperial.inertia_symbol(), "in^4");

        let metric = UnitSystem::new("mm", "N").unwrap();
        assert_eq!(metric.stress_symbol(), "MPa");

        let mixed = UnitSystem::new("ft", "kip").unwrap();
        assert_eq!(mixed.stress_symbol(), "kip*ft^-2");
        assert_eq!(mixed.stress_unit().unwrap().dimension(), Dimension::STRESS);
    }

    #[test]
    fn test_unit_system_rejects_swapped_units() {
        assert!(UnitSystem::new("lbf", "in").is_err());
    }

    #[test]
    fn test_label() {
        assert_eq!(label("psi"), "[psi]");
    }

    #[test]
    fn test_unit_system_serialization() {
        let system = UnitSystem::default();
        let json = serde_json::to_string(&system).unwrap();
        let roundtrip: UnitSystem = serde_json::from_str(&json).unwrap();
        assert_eq!(system, roundtrip);
    }
}
