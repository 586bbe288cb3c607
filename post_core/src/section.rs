//! # Circular Section Properties
//!
//! Geometric properties of the solid circular cross-section used by beam
//! connections and bolt idealizations.
//!
//! ## Notation
//!
//! - `r` = Radius of the section
//! - `A` = Cross-sectional area, πr²
//! - `I` = Second moment of area about a diameter (bending), πr⁴/4
//! - `J` = Polar moment of area (torsion), πr⁴/2
//!
//! ```text
//!        .-"""-.
//!      /         \
//!     |     +--r--|   extreme fiber at distance r
//!      \         /
//!        '-...-'
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::{PostError, PostResult};

/// Solid circular cross-section.
///
/// The radius is validated on construction, so every derived property is
/// finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSection", into = "RawSection")]
pub struct CircularSection {
    radius: f64,
}

#[derive(Serialize, Deserialize)]
struct RawSection {
    radius: f64,
}

impl TryFrom<RawSection> for CircularSection {
    type Error = PostError;

    fn try_from(raw: RawSection) -> PostResult<Self> {
        CircularSection::new(raw.radius)
    }
}

impl From<CircularSection> for RawSection {
    fn from(section: CircularSection) -> Self {
        RawSection {
            radius: section.radius,
        }
    }
}

impl CircularSection {
    /// Create a section from its radius.
    ///
    /// # Errors
    ///
    /// Returns [`PostError::InvalidGeometry`] when `radius` is zero, negative
    /// or not finite.
    ///
    /// # Example
    /// ```rust
    /// use post_core::section::CircularSection;
    ///
    /// let bolt = CircularSection::new(0.5).unwrap();
    /// assert!((bolt.area() - 0.785398).abs() < 1e-6);
    /// assert!(CircularSection::new(0.0).is_err());
    /// ```
    pub fn new(radius: f64) -> PostResult<Self> {
        if !radius.is_finite() {
            return Err(PostError::invalid_geometry("radius", radius, "Radius must be finite"));
        }
        if radius <= 0.0 {
            return Err(PostError::invalid_geometry("radius", radius, "Radius must be positive"));
        }
        Ok(CircularSection { radius })
    }

    /// Section radius `r`
    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Section diameter `2r`
    #[inline]
    pub fn diameter(&self) -> f64 {
        2.0 * self.radius
    }

    /// Cross-sectional area A = πr²
    #[inline]
    pub fn area(&self) -> f64 {
        PI * self.radius.powi(2)
    }

    /// Bending moment of inertia I = πr⁴/4
    #[inline]
    pub fn moment_of_inertia(&self) -> f64 {
        PI * self.radius.powi(4) / 4.0
    }

    /// Polar moment of inertia J = πr⁴/2
    #[inline]
    pub fn polar_moment_of_inertia(&self) -> f64 {
        PI * self.radius.powi(4) / 2.0
    }

    /// Axial stiffness E·A/L for a member of the given length.
    ///
    /// Returns `None` when the length is not positive.
    pub fn axial_stiffness(&self, elastic_modulus: f64, length: f64) -> Option<f64> {
        if length > 0.0 {
            Some(elastic_modulus * self.area() / length)
        } else {
            None
        }
    }
}
