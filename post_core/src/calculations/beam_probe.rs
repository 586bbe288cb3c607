//! # Beam Probe Table
//!
//! Per-set forces, section properties and stresses for every beam connection,
//! in the layout of a beam probe's tabular data.
//!
//! Shear force and bending moment are each taken from whichever end carries
//! the larger magnitude, keeping that end's sign. Stresses then follow the
//! same closed forms as [`stress_resultant`](super::stress_resultant).
//!
//! The bolt summary variant additionally reports the transverse shear stress
//! τs = (4/3)·V/A and an equivalent stress that includes it:
//! σeqv = √((σd + σb)² + 3(τs² + τt²)).

use serde::{Deserialize, Serialize};
use tracing::info;

use super::stress_resultant::{BEAM188_END_I, BEAM188_END_J};
use super::{ChannelReader, PassOutput, SkippedRecord};
use crate::errors::{PostError, PostResult};
use crate::model::{BeamConnection, ModelTree};
use crate::results::ResultSource;
use crate::section::CircularSection;
use crate::time_scoping::TimeScoping;

/// Beam probe values for one beam at one set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeSample {
    pub axial_force: f64,
    pub torque: f64,
    pub shear_i: f64,
    pub shear_j: f64,
    pub moment_i: f64,
    pub moment_j: f64,
}

/// Value of larger magnitude, sign preserved; ties go to `i`.
fn larger_magnitude(i: f64, j: f64) -> f64 {
    if i.abs() >= j.abs() {
        i
    } else {
        j
    }
}

/// Section columns of the probe table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionColumns {
    pub diameter: f64,
    pub length: f64,
    pub area: f64,
    pub moment_of_inertia: f64,
    pub polar_moment_of_inertia: f64,
    /// E·A/L, 0 when the material has no Young's modulus
    pub stiffness: f64,
}

impl SectionColumns {
    pub fn new(section: &CircularSection, length: f64, youngs_modulus: Option<f64>) -> Self {
        let stiffness = youngs_modulus
            .and_then(|e| section.axial_stiffness(e, length))
            .unwrap_or(0.0);
        SectionColumns {
            diameter: section.diameter(),
            length,
            area: section.area(),
            moment_of_inertia: section.moment_of_inertia(),
            polar_moment_of_inertia: section.polar_moment_of_inertia(),
            stiffness,
        }
    }
}

/// Forces and stresses of one probe row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeStresses {
    pub axial_force: f64,
    pub shear_force: f64,
    pub torque: f64,
    pub bending_moment: f64,
    pub equivalent_stress: f64,
    pub direct_stress: f64,
    pub bending_stress: f64,
    pub combined_stress: f64,
    pub torsional_stress: f64,
}

/// Stresses of a probe row.
///
/// # Example
///
/// ```rust
/// use post_core::calculations::beam_probe::{probe_stresses, ProbeSample};
/// use post_core::section::CircularSection;
///
/// let section = CircularSection::new(0.5).unwrap();
/// let sample = ProbeSample {
///     axial_force: 1000.0,
///     torque: 100.0,
///     shear_i: -40.0,
///     shear_j: 25.0,
///     moment_i: 50.0,
///     moment_j: -200.0,
/// };
/// let row = probe_stresses(&section, &sample);
/// assert_eq!(row.shear_force, -40.0);
/// assert_eq!(row.bending_moment, -200.0);
/// ```
pub fn probe_stresses(section: &CircularSection, sample: &ProbeSample) -> ProbeStresses {
    let r = section.radius();
    let shear_force = larger_magnitude(sample.shear_i, sample.shear_j);
    let bending_moment = larger_magnitude(sample.moment_i, sample.moment_j);

    let direct_stress = sample.axial_force / section.area();
    let bending_stress = bending_moment * r / section.moment_of_inertia();
    let torsional_stress = sample.torque * r / section.polar_moment_of_inertia();
    let combined_stress = direct_stress + bending_stress;
    let equivalent_stress = (combined_stress.powi(2) + 3.0 * torsional_stress.powi(2)).sqrt();

    ProbeStresses {
        axial_force: sample.axial_force,
        shear_force,
        torque: sample.torque,
        bending_moment,
        equivalent_stress,
        direct_stress,
        bending_stress,
        combined_stress,
        torsional_stress,
    }
}

/// Bolt summary columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoltSummary {
    pub axial_force: f64,
    pub torque: f64,
    /// max(|V_I|, |V_J|)
    pub shear_force: f64,
    /// max(|M_I|, |M_J|)
    pub bending_moment: f64,
    pub axial_stress: f64,
    pub bending_stress: f64,
    pub torsional_stress: f64,
    pub shear_stress: f64,
    pub equivalent_stress: f64,
}

pub fn bolt_summary(section: &CircularSection, sample: &ProbeSample) -> BoltSummary {
    let r = section.radius();
    let area = section.area();
    let shear_force = sample.shear_i.abs().max(sample.shear_j.abs());
    let bending_moment = sample.moment_i.abs().max(sample.moment_j.abs());

    let axial_stress = sample.axial_force / area;
    let bending_stress = bending_moment * r / section.moment_of_inertia();
    let torsional_stress = sample.torque * r / section.polar_moment_of_inertia();
    let shear_stress = shear_force / area * 4.0 / 3.0;
    let equivalent_stress = ((axial_stress + bending_stress).powi(2)
        + 3.0 * (shear_stress.powi(2) + torsional_stress.powi(2)))
    .sqrt();

    BoltSummary {
        axial_force: sample.axial_force,
        torque: sample.torque,
        shear_force,
        bending_moment,
        axial_stress,
        bending_stress,
        torsional_stress,
        shear_stress,
        equivalent_stress,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamProbeRecord {
    pub connection_id: u32,
    pub name: String,
    pub element_id: u32,
    /// Material name, empty when none is assigned
    pub material: String,
    pub section: SectionColumns,
    pub set: usize,
    pub time: f64,
    pub values: ProbeStresses,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoltSummaryRecord {
    pub connection_id: u32,
    pub name: String,
    pub element_id: u32,
    pub set: usize,
    pub time: f64,
    pub values: BoltSummary,
}

/// Channels backing a probe sample: end I axial force and torque, shear and
/// bending resultants at both ends.
fn probe_sample(reader: &ChannelReader, set: usize, element: u32) -> PostResult<ProbeSample> {
    let end_i = BEAM188_END_I.load(reader, set, element);
    let end_j = BEAM188_END_J.load(reader, set, element);
    Ok(ProbeSample {
        axial_force: end_i.require_axial_force("end I")?,
        torque: end_i.require_torque("end I")?,
        shear_i: end_i.shear_magnitude("end I")?,
        shear_j: end_j.shear_magnitude("end J")?,
        moment_i: end_i.bending_moment_magnitude("end I")?,
        moment_j: end_j.bending_moment_magnitude("end J")?,
    })
}

fn read_channels<S>(source: &S, beams: &[BeamConnection], scoping: &TimeScoping) -> PostResult<ChannelReader>
where
    S: ResultSource + ?Sized,
{
    let element_ids: Vec<u32> = beams.iter().map(|b| b.element_id).collect();
    let items: Vec<u32> = BEAM188_END_I
        .items()
        .into_iter()
        .chain(BEAM188_END_J.items())
        .collect();
    ChannelReader::read(source, &items, scoping, &element_ids)
}

fn youngs_modulus<M>(model: &M, beam: &BeamConnection) -> PostResult<Option<f64>>
where
    M: ModelTree + ?Sized,
{
    let Some(name) = beam.material.as_deref() else {
        return Ok(None);
    };
    match model.find_material(name) {
        Ok(material) => Ok(material.youngs_modulus),
        Err(PostError::AmbiguousLookup { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Probe table rows for every beam connection, ordered by connection id then set.
pub fn beam_probe_table<S, M>(
    source: &S,
    model: &M,
    beams: &[BeamConnection],
    scoping: &TimeScoping,
) -> PostResult<PassOutput<BeamProbeRecord>>
where
    S: ResultSource + ?Sized,
    M: ModelTree + ?Sized,
{
    let reader = read_channels(source, beams, scoping)?;
    let mut ordered: Vec<&BeamConnection> = beams.iter().collect();
    ordered.sort_by_key(|b| b.id);

    let mut output = PassOutput::default();
    for beam in ordered {
        let section = match CircularSection::new(beam.radius) {
            Ok(section) => section,
            Err(e) => {
                output.skipped.push(SkippedRecord::new(beam.element_id, &beam.name, None, e));
                continue;
            }
        };
        let columns = SectionColumns::new(&section, beam.length(), youngs_modulus(model, beam)?);

        for sample in &scoping.samples {
            match probe_sample(&reader, sample.set, beam.element_id) {
                Ok(values) => output.records.push(BeamProbeRecord {
                    connection_id: beam.id,
                    name: beam.name.clone(),
                    element_id: beam.element_id,
                    material: beam.material.clone().unwrap_or_default(),
                    section: columns,
                    set: sample.set,
                    time: sample.time,
                    values: probe_stresses(&section, &values),
                }),
                Err(e) => output
                    .skipped
                    .push(SkippedRecord::new(beam.element_id, &beam.name, Some(sample.set), e)),
            }
        }
    }

    info!(beams = beams.len(), records = output.records.len(), "built beam probe table");
    Ok(output)
}

/// Bolt summary rows for every beam connection, in input order.
pub fn bolt_summaries<S>(
    source: &S,
    beams: &[BeamConnection],
    scoping: &TimeScoping,
) -> PostResult<PassOutput<BoltSummaryRecord>>
where
    S: ResultSource + ?Sized,
{
    let reader = read_channels(source, beams, scoping)?;
    let mut output = PassOutput::default();
    for beam in beams {
        let section = match CircularSection::new(beam.radius) {
            Ok(section) => section,
            Err(e) => {
                output.skipped.push(SkippedRecord::new(beam.element_id, &beam.name, None, e));
                continue;
            }
        };
        for sample in &scoping.samples {
            match probe_sample(&reader, sample.set, beam.element_id) {
                Ok(values) => output.records.push(BoltSummaryRecord {
                    connection_id: beam.id,
                    name: beam.name.clone(),
                    element_id: beam.element_id,
                    set: sample.set,
                    time: sample.time,
                    values: bolt_summary(&section, &values),
                }),
                Err(e) => output
                    .skipped
                    .push(SkippedRecord::new(beam.element_id, &beam.name, Some(sample.set), e)),
            }
        }
    }
    info!(beams = beams.len(), records = output.records.len(), "built bolt summary");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> ProbeSample {
        ProbeSample {
            axial_force: 1000.0,
            torque: 100.0,
            shear_i: 30.0,
            shear_j: -60.0,
            moment_i: 200.0,
            moment_j: 50.0,
        }
    }

    #[test]
    fn test_larger_magnitude_keeps_sign() {
        assert_eq!(larger_magnitude(3.0, -4.0), -4.0);
        assert_eq!(larger_magnitude(-4.0, 4.0), -4.0);
        assert_eq!(larger_magnitude(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_probe_row_matches_reference_bolt() {
        let section = CircularSection::new(0.5).unwrap();
        let row = probe_stresses(&section, &sample());
        assert_eq!(row.shear_force, -60.0);
        assert_eq!(row.bending_moment, 200.0);
        assert!((row.equivalent_stress - 3425.937).abs() < 1e-2);
        assert!((row.torsional_stress - 509.2958).abs() < 1e-3);
    }

    #[test]
    fn test_section_columns() {
        let section = CircularSection::new(0.5).unwrap();
        let with_modulus = SectionColumns::new(&section, 4.0, Some(29.0e6));
        assert_relative_eq!(with_modulus.stiffness, 29.0e6 * section.area() / 4.0, max_relative = 1e-12);
        assert_eq!(with_modulus.diameter, 1.0);

        let without = SectionColumns::new(&section, 4.0, None);
        assert_eq!(without.stiffness, 0.0);
    }

    #[test]
    fn test_bolt_summary_includes_transverse_shear() {
        let section = CircularSection::new(0.5).unwrap();
        let summary = bolt_summary(&section, &sample());
        assert_eq!(summary.shear_force, 60.0);
        assert_relative_eq!(summary.shear_stress, 4.0 / 3.0 * 60.0 / section.area(), max_relative = 1e-12);
        let expected = ((summary.axial_stress + summary.bending_stress).powi(2)
            + 3.0 * (summary.shear_stress.powi(2) + summary.torsional_stress.powi(2)))
        .sqrt();
        assert_relative_eq!(summary.equivalent_stress, expected, max_relative = 1e-12);

        let row = probe_stresses(&section, &sample());
        assert!(summary.equivalent_stress > row.equivalent_stress);
    }
}
