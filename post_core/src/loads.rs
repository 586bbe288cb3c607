//! # Element End Loads
//!
//! Force and moment components at one end of a line element for a single
//! result set. Each component is optional so that an absent result channel
//! surfaces as [`PostError::MissingField`] when a calculator needs it,
//! instead of silently reading as zero.
//!
//! ## Example
//!
//! ```rust
//! use post_core::loads::{ElementEndLoad, Transverse};
//!
//! let end = ElementEndLoad::new()
//!     .with_axial_force(1000.0)
//!     .with_bending_moment(Transverse::Components { y: 120.0, z: 160.0 })
//!     .with_torque(100.0);
//!
//! assert_eq!(end.bending_moment_magnitude("end I").unwrap(), 200.0);
//! assert!(end.shear_magnitude("end I").is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{PostError, PostResult};

/// A transverse quantity given either as two components or as a resultant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transverse {
    /// Signed resultant value
    Resultant { value: f64 },
    /// Components along the local y and z axes
    Components { y: f64, z: f64 },
}

impl Transverse {
    /// Magnitude √(y² + z²), or |resultant|
    pub fn magnitude(&self) -> f64 {
        match *self {
            Transverse::Resultant { value } => value.abs(),
            Transverse::Components { y, z } => y.hypot(z),
        }
    }

    /// Signed value: the resultant as given, or the component magnitude.
    pub fn signed(&self) -> f64 {
        match *self {
            Transverse::Resultant { value } => value,
            Transverse::Components { .. } => self.magnitude(),
        }
    }
}

/// Loads at one end (I or J) of a beam or joint element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementEndLoad {
    #[serde(default)]
    pub axial_force: Option<f64>,
    #[serde(default)]
    pub shear: Option<Transverse>,
    #[serde(default)]
    pub bending_moment: Option<Transverse>,
    #[serde(default)]
    pub torque: Option<f64>,
}

impl ElementEndLoad {
    pub fn new() -> Self {
        ElementEndLoad::default()
    }

    pub fn with_axial_force(mut self, value: f64) -> Self {
        self.axial_force = Some(value);
        self
    }

    pub fn with_shear(mut self, value: Transverse) -> Self {
        self.shear = Some(value);
        self
    }

    pub fn with_bending_moment(mut self, value: Transverse) -> Self {
        self.bending_moment = Some(value);
        self
    }

    pub fn with_torque(mut self, value: f64) -> Self {
        self.torque = Some(value);
        self
    }

    /// Axial force, or `MissingField` naming `context`
    pub fn require_axial_force(&self, context: &str) -> PostResult<f64> {
        self.axial_force
            .ok_or_else(|| PostError::missing_field("axial force", context))
    }

    pub fn require_torque(&self, context: &str) -> PostResult<f64> {
        self.torque
            .ok_or_else(|| PostError::missing_field("torque", context))
    }

    pub fn bending_moment_magnitude(&self, context: &str) -> PostResult<f64> {
        self.bending_moment
            .map(|m| m.magnitude())
            .ok_or_else(|| PostError::missing_field("bending moment", context))
    }

    pub fn shear_magnitude(&self, context: &str) -> PostResult<f64> {
        self.shear
            .map(|v| v.magnitude())
            .ok_or_else(|| PostError::missing_field("shear force", context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transverse_magnitude() {
        assert_eq!(Transverse::Components { y: 3.0, z: -4.0 }.magnitude(), 5.0);
        assert_eq!(Transverse::Resultant { value: -7.0 }.magnitude(), 7.0);
        assert_eq!(Transverse::Resultant { value: -7.0 }.signed(), -7.0);
    }

    #[test]
    fn test_missing_components_reported() {
        let end = ElementEndLoad::new().with_axial_force(10.0);
        assert_eq!(end.require_axial_force("I").unwrap(), 10.0);
        let err = end.require_torque("element 12 end I").unwrap_err();
        match err {
            PostError::MissingField { field, context } => {
                assert_eq!(field, "torque");
                assert_eq!(context, "element 12 end I");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_partial_load() {
        let json = r#"{"axial_force": 5.0, "bending_moment": {"kind": "components", "y": 1.0, "z": 0.0}}"#;
        let end: ElementEndLoad = serde_json::from_str(json).unwrap();
        assert_eq!(end.axial_force, Some(5.0));
        assert!(end.torque.is_none());
        assert_eq!(end.bending_moment_magnitude("J").unwrap(), 1.0);
    }
}
