//! # Beam Stress Resultants
//!
//! Closed-form stresses in a solid circular beam from the forces and moments
//! at its two ends, reported at the governing (worst) end.
//!
//! ## Formulas
//!
//! Per end, with `r` the section radius:
//!
//! - σd = F / A (direct)
//! - σb = M·r / I (bending, M the resultant of the two bending components)
//! - τt = T·r / J (torsion)
//! - σc = σd + σb (combined)
//!
//! Two conventions give the equivalent stress:
//!
//! - [`StressConvention::VonMisesCombined`]: σeqv = √(σc² + 3τt²)
//! - [`StressConvention::MohrPrincipal`]: with τs = (4/3)·V/A and
//!   τ = max(|τt + τs|, |τt − τs|), σ1,2 = σc/2 ± √((σc/2)² + τ²) and
//!   σeqv = √(σ1² + σ2² − σ1σ2)
//!
//! The governing end is the one with the larger |σeqv|; ties go to end I.
//!
//! ## Example
//!
//! ```rust
//! use post_core::calculations::stress_resultant::{compute_resultants, EndLabel, StressConvention};
//! use post_core::loads::{ElementEndLoad, Transverse};
//!
//! let end_i = ElementEndLoad::new()
//!     .with_axial_force(1000.0)
//!     .with_bending_moment(Transverse::Resultant { value: 200.0 })
//!     .with_torque(100.0);
//! let end_j = ElementEndLoad::new()
//!     .with_axial_force(1000.0)
//!     .with_bending_moment(Transverse::Resultant { value: 50.0 })
//!     .with_torque(100.0);
//!
//! let result = compute_resultants(0.5, &end_i, &end_j, StressConvention::VonMisesCombined).unwrap();
//! assert_eq!(result.governing_end, EndLabel::I);
//! assert!((result.equivalent_stress - 3425.94).abs() < 0.01);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ChannelReader, PassOutput, SkippedRecord};
use crate::errors::{PostError, PostResult};
use crate::loads::{ElementEndLoad, Transverse};
use crate::model::BeamConnection;
use crate::results::ResultSource;
use crate::section::CircularSection;
use crate::time_scoping::TimeScoping;

/// How the equivalent stress is formed from the end stresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StressConvention {
    /// √(σc² + 3τt²)
    #[default]
    VonMisesCombined,
    /// Principal stresses from Mohr's circle including transverse shear
    MohrPrincipal,
}

/// End of a line element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndLabel {
    I,
    J,
}

impl fmt::Display for EndLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndLabel::I => f.write_str("I"),
            EndLabel::J => f.write_str("J"),
        }
    }
}

/// Mohr's-circle results for one end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrincipalStresses {
    /// Transverse shear stress τs = (4/3)·V/A
    pub transverse_shear: f64,
    /// max(|τt + τs|, |τt − τs|)
    pub max_shear: f64,
    pub sigma_1: f64,
    pub sigma_2: f64,
}

/// Stresses at the governing end of an element for one result set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressResultant {
    pub governing_end: EndLabel,
    pub axial_force: f64,
    /// Shear resultant, when the shear channels were available
    pub shear_force: Option<f64>,
    pub bending_moment: f64,
    pub torque: f64,
    pub direct_stress: f64,
    pub bending_stress: f64,
    pub torsional_stress: f64,
    pub combined_stress: f64,
    pub equivalent_stress: f64,
    pub principal: Option<PrincipalStresses>,
}

/// Stresses at a single end.
fn end_resultant(
    section: &CircularSection,
    end: &ElementEndLoad,
    label: EndLabel,
    convention: StressConvention,
) -> PostResult<StressResultant> {
    let context = format!("end {}", label);
    let r = section.radius();

    let axial_force = end.require_axial_force(&context)?;
    let bending_moment = end
        .bending_moment
        .map(|m| m.signed())
        .ok_or_else(|| PostError::missing_field("bending moment", context.as_str()))?;
    let torque = end.require_torque(&context)?;
    let shear_force = end.shear.map(|v| v.signed());

    let direct_stress = axial_force / section.area();
    let bending_stress = bending_moment * r / section.moment_of_inertia();
    let torsional_stress = torque * r / section.polar_moment_of_inertia();
    let combined_stress = direct_stress + bending_stress;

    let (equivalent_stress, principal) = match convention {
        StressConvention::VonMisesCombined => (
            (combined_stress.powi(2) + 3.0 * torsional_stress.powi(2)).sqrt(),
            None,
        ),
        StressConvention::MohrPrincipal => {
            let shear = shear_force.ok_or_else(|| PostError::missing_field("shear force", context.as_str()))?;
            let principal = mohr_principal(section, combined_stress, torsional_stress, shear);
            let eqv = (principal.sigma_1.powi(2) + principal.sigma_2.powi(2)
                - principal.sigma_1 * principal.sigma_2)
                .sqrt();
            (eqv, Some(principal))
        }
    };

    Ok(StressResultant {
        governing_end: label,
        axial_force,
        shear_force,
        bending_moment,
        torque,
        direct_stress,
        bending_stress,
        torsional_stress,
        combined_stress,
        equivalent_stress,
        principal,
    })
}

fn mohr_principal(
    section: &CircularSection,
    combined: f64,
    torsional: f64,
    shear_force: f64,
) -> PrincipalStresses {
    let transverse_shear = 4.0 / 3.0 * shear_force / section.area();
    let max_shear = (torsional + transverse_shear)
        .abs()
        .max((torsional - transverse_shear).abs());
    let center = combined / 2.0;
    let radius = (center.powi(2) + max_shear.powi(2)).sqrt();
    PrincipalStresses {
        transverse_shear,
        max_shear,
        sigma_1: center + radius,
        sigma_2: center - radius,
    }
}

/// Compute the governing stress resultant of a circular beam element.
///
/// # Arguments
///
/// * `section_radius` - Radius of the solid circular section
/// * `end_i`, `end_j` - Loads at the two ends, in one consistent unit system
/// * `convention` - Equivalent stress convention
///
/// # Errors
///
/// * [`InvalidGeometry`](crate::errors::PostError::InvalidGeometry) when the
///   radius is not positive and finite
/// * [`MissingField`](crate::errors::PostError::MissingField) when axial
///   force, bending moment or torque is absent at either end, or shear is
///   absent under [`StressConvention::MohrPrincipal`]
pub fn compute_resultants(
    section_radius: f64,
    end_i: &ElementEndLoad,
    end_j: &ElementEndLoad,
    convention: StressConvention,
) -> PostResult<StressResultant> {
    let section = CircularSection::new(section_radius)?;
    let at_i = end_resultant(&section, end_i, EndLabel::I, convention)?;
    let at_j = end_resultant(&section, end_j, EndLabel::J, convention)?;

    if at_j.equivalent_stress.abs() > at_i.equivalent_stress.abs() {
        Ok(at_j)
    } else {
        Ok(at_i)
    }
}

// ============================================================================
// BEAM188 channel series
// ============================================================================

/// SMISC item numbers of the BEAM188 end force/moment outputs at one end.
///
/// Numbers follow the BEAM188 item and sequence number table of the
/// element reference (`Fx`, `My`, `Mz`, `TQ`, `SFz`, `SFy`; end I at
/// items 1-6, end J at items 14-19).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beam188EndChannels {
    pub axial_force: u32,
    pub moment_y: u32,
    pub moment_z: u32,
    pub torque: u32,
    pub shear_z: u32,
    pub shear_y: u32,
}

impl Beam188EndChannels {
    pub fn items(&self) -> [u32; 6] {
        [
            self.axial_force,
            self.moment_y,
            self.moment_z,
            self.torque,
            self.shear_z,
            self.shear_y,
        ]
    }

    /// Assemble the end load from the channels. Absent channels stay `None`.
    pub(crate) fn load(&self, reader: &ChannelReader, set: usize, element: u32) -> ElementEndLoad {
        let pair = |a: u32, b: u32| {
            match (reader.optional(a, set, element), reader.optional(b, set, element)) {
                (Some(y), Some(z)) => Some(Transverse::Components { y, z }),
                _ => None,
            }
        };
        ElementEndLoad {
            axial_force: reader.optional(self.axial_force, set, element),
            shear: pair(self.shear_y, self.shear_z),
            bending_moment: pair(self.moment_y, self.moment_z),
            torque: reader.optional(self.torque, set, element),
        }
    }
}

/// BEAM188 end I: Fx 1, My 2, Mz 3, TQ 4, SFz 5, SFy 6
pub const BEAM188_END_I: Beam188EndChannels = Beam188EndChannels {
    axial_force: 1,
    moment_y: 2,
    moment_z: 3,
    torque: 4,
    shear_z: 5,
    shear_y: 6,
};

/// BEAM188 end J: Fx 14, My 15, Mz 16, TQ 17, SFz 18, SFy 19
pub const BEAM188_END_J: Beam188EndChannels = Beam188EndChannels {
    axial_force: 14,
    moment_y: 15,
    moment_z: 16,
    torque: 17,
    shear_z: 18,
    shear_y: 19,
};

/// A stress resultant tagged with its element and result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStressRecord {
    pub connection_id: u32,
    pub name: String,
    pub element_id: u32,
    pub set: usize,
    pub time: f64,
    pub resultant: StressResultant,
}

/// Stress resultants for every beam connection at every scoped set.
///
/// Records follow the input order of `beams`, then set. Connections with an invalid
/// radius or missing channels are skipped.
///
/// SMISC values are taken as stored, in the model's consistent unit system;
/// the unit label of the channel fields is not read. Table builders convert
/// the records with [`OutputFactors`](crate::pipeline::OutputFactors).
pub fn compute_element_series<S>(
    source: &S,
    beams: &[BeamConnection],
    scoping: &TimeScoping,
    convention: StressConvention,
) -> PostResult<PassOutput<ElementStressRecord>>
where
    S: ResultSource + ?Sized,
{
    let element_ids: Vec<u32> = beams.iter().map(|b| b.element_id).collect();
    let items: Vec<u32> = BEAM188_END_I
        .items()
        .into_iter()
        .chain(BEAM188_END_J.items())
        .collect();
    let reader = ChannelReader::read(source, &items, scoping, &element_ids)?;

    let mut output = PassOutput::default();
    for beam in beams {
        if let Err(e) = CircularSection::new(beam.radius) {
            output.skipped.push(SkippedRecord::new(beam.element_id, &beam.name, None, e));
            continue;
        }
        for sample in &scoping.samples {
            let end_i = BEAM188_END_I.load(&reader, sample.set, beam.element_id);
            let end_j = BEAM188_END_J.load(&reader, sample.set, beam.element_id);
            match compute_resultants(beam.radius, &end_i, &end_j, convention) {
                Ok(resultant) => output.records.push(ElementStressRecord {
                    connection_id: beam.id,
                    name: beam.name.clone(),
                    element_id: beam.element_id,
                    set: sample.set,
                    time: sample.time,
                    resultant,
                }),
                Err(e) if e.is_record_local() => {
                    output
                        .skipped
                        .push(SkippedRecord::new(beam.element_id, &beam.name, Some(sample.set), e));
                }
                Err(e) => return Err(e),
            }
        }
    }

    info!(
        beams = beams.len(),
        records = output.records.len(),
        skipped = output.skipped.len(),
        "computed beam stress resultants"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn end(axial: f64, moment: f64, torque: f64) -> ElementEndLoad {
        ElementEndLoad::new()
            .with_axial_force(axial)
            .with_bending_moment(Transverse::Resultant { value: moment })
            .with_torque(torque)
    }

    #[test]
    fn test_reference_bolt() {
        let result = compute_resultants(
            0.5,
            &end(1000.0, 200.0, 100.0),
            &end(1000.0, 50.0, 100.0),
            StressConvention::VonMisesCombined,
        )
        .unwrap();

        assert_eq!(result.governing_end, EndLabel::I);
        assert!((result.direct_stress - 1273.2395).abs() < 1e-3);
        assert!((result.bending_stress - 2037.1833).abs() < 1e-3);
        assert!((result.combined_stress - 3310.4228).abs() < 1e-3);
        assert!((result.torsional_stress - 509.2958).abs() < 1e-3);
        assert!((result.equivalent_stress - 3425.937).abs() < 1e-2);
        assert_eq!(result.bending_moment, 200.0);
        assert!(result.principal.is_none());

        let j_only = compute_resultants(
            0.5,
            &end(1000.0, 50.0, 100.0),
            &end(1000.0, 50.0, 100.0),
            StressConvention::VonMisesCombined,
        )
        .unwrap();
        assert!((j_only.equivalent_stress - 1988.864).abs() < 1e-2);
    }

    #[test]
    fn test_zero_loads_give_zero_stress() {
        let zero = end(0.0, 0.0, 0.0);
        let result = compute_resultants(0.25, &zero, &zero, StressConvention::VonMisesCombined).unwrap();
        assert_eq!(result.equivalent_stress, 0.0);
        assert_eq!(result.governing_end, EndLabel::I);
    }

    #[test]
    fn test_equivalent_matches_definition() {
        let result = compute_resultants(
            0.3,
            &end(-250.0, 75.0, -40.0),
            &end(120.0, 10.0, 5.0),
            StressConvention::VonMisesCombined,
        )
        .unwrap();
        let expected = (result.combined_stress.powi(2) + 3.0 * result.torsional_stress.powi(2)).sqrt();
        assert_relative_eq!(result.equivalent_stress, expected, max_relative = 1e-12);
    }

    #[test]
    fn test_identical_inputs_are_bit_identical() {
        let a = end(812.5, 131.0, 44.0);
        let b = end(-90.0, 12.0, 7.5);
        let first = compute_resultants(0.375, &a, &b, StressConvention::VonMisesCombined).unwrap();
        let second = compute_resultants(0.375, &a, &b, StressConvention::VonMisesCombined).unwrap();
        assert_eq!(first.equivalent_stress.to_bits(), second.equivalent_stress.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn test_swapping_ends_keeps_magnitudes() {
        let a = end(500.0, 90.0, 20.0);
        let b = end(500.0, 30.0, 60.0);
        let ab = compute_resultants(0.4, &a, &b, StressConvention::VonMisesCombined).unwrap();
        let ba = compute_resultants(0.4, &b, &a, StressConvention::VonMisesCombined).unwrap();
        assert_eq!(ab.equivalent_stress, ba.equivalent_stress);
        assert_ne!(ab.governing_end, ba.governing_end);

        // Equal ends resolve to I
        let tie = compute_resultants(0.4, &a, &a, StressConvention::VonMisesCombined).unwrap();
        assert_eq!(tie.governing_end, EndLabel::I);
    }

    #[test]
    fn test_governing_end_j() {
        let result = compute_resultants(
            0.5,
            &end(1000.0, 50.0, 100.0),
            &end(1000.0, 200.0, 100.0),
            StressConvention::VonMisesCombined,
        )
        .unwrap();
        assert_eq!(result.governing_end, EndLabel::J);
        assert_eq!(result.bending_moment, 200.0);
    }

    #[test]
    fn test_invalid_radius() {
        let load = end(1.0, 1.0, 1.0);
        for r in [0.0, -0.5, f64::NAN] {
            let err = compute_resultants(r, &load, &load, StressConvention::VonMisesCombined).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_GEOMETRY");
        }
    }

    #[test]
    fn test_missing_torque() {
        let complete = end(1.0, 1.0, 1.0);
        let partial = ElementEndLoad::new()
            .with_axial_force(1.0)
            .with_bending_moment(Transverse::Resultant { value: 1.0 });
        let err =
            compute_resultants(0.5, &complete, &partial, StressConvention::VonMisesCombined).unwrap_err();
        match err {
            PostError::MissingField { field, context } => {
                assert_eq!(field, "torque");
                assert_eq!(context, "end J");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_component_moments_combine() {
        let components = ElementEndLoad::new()
            .with_axial_force(0.0)
            .with_bending_moment(Transverse::Components { y: 120.0, z: 160.0 })
            .with_torque(0.0);
        let resultant = end(0.0, 200.0, 0.0);
        let convention = StressConvention::VonMisesCombined;
        let a = compute_resultants(0.5, &components, &components, convention).unwrap();
        let b = compute_resultants(0.5, &resultant, &resultant, convention).unwrap();
        assert_relative_eq!(a.bending_stress, b.bending_stress, max_relative = 1e-12);
    }

    #[test]
    fn test_mohr_principal() {
        let section = CircularSection::new(0.5).unwrap();
        let load = end(1000.0, 200.0, 100.0).with_shear(Transverse::Resultant { value: 300.0 });
        let result = compute_resultants(0.5, &load, &load, StressConvention::MohrPrincipal).unwrap();
        let principal = result.principal.unwrap();

        let tau_s = 4.0 / 3.0 * 300.0 / section.area();
        assert_relative_eq!(principal.transverse_shear, tau_s, max_relative = 1e-12);
        assert_relative_eq!(principal.max_shear, result.torsional_stress + tau_s, max_relative = 1e-12);
        assert!(principal.sigma_1 > 0.0 && principal.sigma_2 < 0.0);
        assert_relative_eq!(
            principal.sigma_1 + principal.sigma_2,
            result.combined_stress,
            max_relative = 1e-12
        );
        let (s1, s2) = (principal.sigma_1, principal.sigma_2);
        let eqv = (s1.powi(2) + s2.powi(2) - s1 * s2).sqrt();
        assert_relative_eq!(result.equivalent_stress, eqv, max_relative = 1e-12);
    }

    #[test]
    fn test_mohr_requires_shear() {
        let load = end(1000.0, 200.0, 100.0);
        let err = compute_resultants(0.5, &load, &load, StressConvention::MohrPrincipal).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");
    }

    #[test]
    fn test_mohr_without_shear_matches_von_mises() {
        let load = end(1000.0, 200.0, 100.0).with_shear(Transverse::Resultant { value: 0.0 });
        let mohr = compute_resultants(0.5, &load, &load, StressConvention::MohrPrincipal).unwrap();
        let vm = compute_resultants(0.5, &load, &load, StressConvention::VonMisesCombined).unwrap();
        assert_relative_eq!(mohr.equivalent_stress, vm.equivalent_stress, max_relative = 1e-9);
    }

    #[test]
    fn test_beam188_item_numbers() {
        assert_eq!(BEAM188_END_I.items(), [1, 2, 3, 4, 5, 6]);
        assert_eq!(BEAM188_END_J.items(), [14, 15, 16, 17, 18, 19]);
    }
}
