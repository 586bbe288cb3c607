//! # Peak Values
//!
//! Maximum nodal values over named selections:
//!
//! - [`max_equivalent_stress`]: von Mises stress on the nodes of a
//!   selection's elements
//! - [`max_total_deformation`]: norm of the displacement on a selection's
//!   nodes
//! - [`max_directional_over_time`]: largest X, Y and Z component of the
//!   displacement or velocity over all scoped sets
//! - [`mean_alternating_summary`]: the node of maximum stress in a prestress
//!   analysis, and the stress at that same node in its linear dynamics child
//!   analyses
//!
//! Result sets whose field carries no entities are dropped before the max is
//! taken. Values are converted to the requested unit and multiplied by the
//! scale factor (the sigma level for random vibration, 1 otherwise).

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{PassOutput, SkippedRecord};
use crate::errors::{PostError, PostResult};
use crate::fields::{Axis, Field, FieldsContainer};
use crate::model::{NamedSelection, NamedSelectionFolder};
use crate::results::ResultSource;
use crate::time_scoping::TimeScoping;
use crate::units::Unit;

/// Maximum value of a field and the entity where it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakValue {
    pub entity_id: u32,
    pub value: f64,
}

impl PeakValue {
    /// Peak of a field, `None` when it has no entities.
    pub fn of(field: &Field) -> Option<PeakValue> {
        field.max().map(|(entity_id, value)| PeakValue { entity_id, value })
    }
}

/// Peak value of one selection at one set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakValueRecord {
    pub selection_id: u32,
    pub name: String,
    pub set: usize,
    pub time: f64,
    pub peak: PeakValue,
}

/// Per-set peaks of a container after conversion and scaling.
fn container_peaks(
    selection: &NamedSelection,
    fields: &FieldsContainer,
    scoping: &TimeScoping,
    unit: &Unit,
    scale: f64,
) -> PostResult<Vec<PeakValueRecord>> {
    let fields = fields.without_empty();
    let mut records = Vec::with_capacity(fields.len());
    for sample in &scoping.samples {
        let Some(field) = fields.get(sample.set) else {
            continue;
        };
        let field = field.converted(unit)?.scaled(scale);
        if let Some(peak) = PeakValue::of(&field) {
            records.push(PeakValueRecord {
                selection_id: selection.id,
                name: selection.name.clone(),
                set: sample.set,
                time: sample.time,
                peak,
            });
        }
    }
    Ok(records)
}

/// Run `per_selection` for every selection in id order, collecting records
/// and record-local failures.
fn for_each_selection<T, F>(folder: &NamedSelectionFolder, mut per_selection: F) -> PostResult<PassOutput<T>>
where
    F: FnMut(&NamedSelection) -> PostResult<Vec<T>>,
{
    let mut selections: Vec<&NamedSelection> = folder.selections.iter().collect();
    selections.sort_by_key(|ns| ns.id);

    let mut output = PassOutput::default();
    for selection in selections {
        match per_selection(selection) {
            Ok(records) if records.is_empty() => output.skipped.push(SkippedRecord::new(
                selection.id,
                &selection.name,
                None,
                PostError::missing_field("result values", "no result set carried data for the selection"),
            )),
            Ok(records) => output.records.extend(records),
            Err(e) if e.is_record_local() => output
                .skipped
                .push(SkippedRecord::new(selection.id, &selection.name, None, e)),
            Err(e) => return Err(e),
        }
    }
    Ok(output)
}

/// Maximum von Mises stress per selection and set.
pub fn max_equivalent_stress<S>(
    source: &S,
    folder: &NamedSelectionFolder,
    scoping: &TimeScoping,
    stress_unit: &Unit,
    scale: f64,
) -> PostResult<PassOutput<PeakValueRecord>>
where
    S: ResultSource + ?Sized,
{
    let output = for_each_selection(folder, |selection| {
        if selection.element_ids.is_empty() {
            return Err(PostError::missing_field(
                "elements",
                format!("named selection '{}'", selection.name),
            ));
        }
        let stress = source.von_mises_stress(scoping, &selection.element_ids)?;
        container_peaks(selection, &stress, scoping, stress_unit, scale)
    })?;
    info!(folder = %folder.name, records = output.records.len(), "extracted max equivalent stress");
    Ok(output)
}

/// Maximum total deformation (displacement norm) per selection and set.
pub fn max_total_deformation<S>(
    source: &S,
    folder: &NamedSelectionFolder,
    scoping: &TimeScoping,
    length_unit: &Unit,
    scale: f64,
) -> PostResult<PassOutput<PeakValueRecord>>
where
    S: ResultSource + ?Sized,
{
    let output = for_each_selection(folder, |selection| {
        let nodes = selection.unique_node_ids();
        if nodes.is_empty() {
            return Err(PostError::missing_field(
                "nodes",
                format!("named selection '{}'", selection.name),
            ));
        }
        let displacement = source.displacement(scoping, &nodes)?;
        let total = displacement.map(|field| Ok(field.norm()))?;
        container_peaks(selection, &total, scoping, length_unit, scale)
    })?;
    info!(folder = %folder.name, records = output.records.len(), "extracted max total deformation");
    Ok(output)
}

// ============================================================================
// Directional maximum over time
// ============================================================================

/// Nodal vector result read for the directional tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionalQuantity {
    Deformation,
    Velocity,
}

impl DirectionalQuantity {
    pub fn name(self) -> &'static str {
        match self {
            DirectionalQuantity::Deformation => "Directional Deformation",
            DirectionalQuantity::Velocity => "Directional Velocity",
        }
    }

    fn read<S>(self, source: &S, scoping: &TimeScoping, node_ids: &[u32]) -> PostResult<FieldsContainer>
    where
        S: ResultSource + ?Sized,
    {
        match self {
            DirectionalQuantity::Deformation => source.displacement(scoping, node_ids),
            DirectionalQuantity::Velocity => source.velocity(scoping, node_ids),
        }
    }
}

/// Peak of one component and the set where it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisPeak {
    pub peak: PeakValue,
    pub set: usize,
    pub time: f64,
}

/// Maximum over time of each component for one selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalPeakRecord {
    pub selection_id: u32,
    pub name: String,
    /// Indexed by [`Axis::index`]; `None` when no set carried data
    pub axes: [Option<AxisPeak>; 3],
}

impl DirectionalPeakRecord {
    pub fn axis(&self, axis: Axis) -> Option<AxisPeak> {
        self.axes[axis.index()]
    }
}

/// Largest value of each component over the scoped sets, after scaling.
///
/// Within a set ties go to the later entity; across sets the earlier set is
/// kept.
pub fn directional_peaks(
    fields: &FieldsContainer,
    scoping: &TimeScoping,
    scale: f64,
) -> PostResult<[Option<AxisPeak>; 3]> {
    let mut axes: [Option<AxisPeak>; 3] = [None; 3];
    for sample in &scoping.samples {
        let Some(field) = fields.get(sample.set) else {
            continue;
        };
        if field.is_empty() {
            continue;
        }
        for axis in Axis::ALL {
            let component = field.component(axis.index())?.scaled(scale);
            let Some(peak) = PeakValue::of(&component) else {
                continue;
            };
            let slot = &mut axes[axis.index()];
            if slot.map_or(true, |best| peak.value > best.peak.value) {
                *slot = Some(AxisPeak {
                    peak,
                    set: sample.set,
                    time: sample.time,
                });
            }
        }
    }
    Ok(axes)
}

/// Maximum over time of the X, Y and Z components per selection.
///
/// Values stay in the units of the result file, which are the model's
/// consistent units; `scale` is applied before comparing.
pub fn max_directional_over_time<S>(
    source: &S,
    folder: &NamedSelectionFolder,
    scoping: &TimeScoping,
    quantity: DirectionalQuantity,
    scale: f64,
) -> PostResult<PassOutput<DirectionalPeakRecord>>
where
    S: ResultSource + ?Sized,
{
    let output = for_each_selection(folder, |selection| {
        let nodes = selection.unique_node_ids();
        if nodes.is_empty() {
            return Err(PostError::missing_field(
                "nodes",
                format!("named selection '{}'", selection.name),
            ));
        }
        let fields = quantity.read(source, scoping, &nodes)?;
        let axes = directional_peaks(&fields, scoping, scale)?;
        if axes.iter().all(Option::is_none) {
            return Ok(Vec::new());
        }
        Ok(vec![DirectionalPeakRecord {
            selection_id: selection.id,
            name: selection.name.clone(),
            axes,
        }])
    })?;
    info!(
        folder = %folder.name,
        quantity = quantity.name(),
        records = output.records.len(),
        "extracted max directional values over time"
    );
    Ok(output)
}

// ============================================================================
// Prestress mean / alternating stress
// ============================================================================

/// A linear dynamics analysis prestressed by the base analysis.
pub struct ChildAnalysis<'a> {
    pub name: String,
    pub source: &'a dyn ResultSource,
    pub scoping: TimeScoping,
    /// Sigma level for random vibration, 1 otherwise
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanAlternatingRecord {
    pub selection_id: u32,
    pub name: String,
    pub static_set: usize,
    pub static_time: f64,
    /// Max equivalent stress in the prestress analysis
    pub mean_stress: f64,
    /// Node of `mean_stress`
    pub node: u32,
    /// Stress at `node` in each child analysis, in child order
    pub alternating: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanAlternatingSummary {
    pub child_names: Vec<String>,
    pub records: Vec<MeanAlternatingRecord>,
    pub skipped: Vec<SkippedRecord>,
}

/// Stress at `node` in the first non-empty set of a child analysis.
fn stress_at_node(
    child: &ChildAnalysis<'_>,
    selection: &NamedSelection,
    node: u32,
    stress_unit: &Unit,
) -> PostResult<Option<f64>> {
    let stress = child
        .source
        .von_mises_stress(&child.scoping, &selection.element_ids)?
        .without_empty();
    let Some(first) = stress.fields.first() else {
        return Ok(None);
    };
    let field = first.field.converted(stress_unit)?.scaled(child.scale);
    Ok(field
        .entity(node)
        .map(|values| values.iter().copied().fold(f64::NEG_INFINITY, f64::max)))
}

/// Mean stress (prestress peak) and alternating stresses at the same node.
///
/// `base_scoping` normally holds only the last set of the prestress
/// analysis; the peak at its last sample is used.
pub fn mean_alternating_summary<S>(
    base: &S,
    base_scoping: &TimeScoping,
    folder: &NamedSelectionFolder,
    children: &[ChildAnalysis<'_>],
    stress_unit: &Unit,
) -> PostResult<MeanAlternatingSummary>
where
    S: ResultSource + ?Sized,
{
    let peaks = max_equivalent_stress(base, folder, base_scoping, stress_unit, 1.0)?;
    let mut summary = MeanAlternatingSummary {
        child_names: children.iter().map(|c| c.name.clone()).collect(),
        records: Vec::new(),
        skipped: peaks.skipped,
    };

    let Some(last) = base_scoping.last() else {
        return Ok(summary);
    };
    for peak in peaks.records.iter().filter(|p| p.set == last.set) {
        let Some(selection) = folder.selections.iter().find(|ns| ns.id == peak.selection_id) else {
            continue;
        };
        let mut alternating = Vec::with_capacity(children.len());
        for child in children {
            let value = stress_at_node(child, selection, peak.peak.entity_id, stress_unit)?;
            if value.is_none() {
                warn!(
                    selection = %selection.name,
                    analysis = %child.name,
                    node = peak.peak.entity_id,
                    "no stress at node of max"
                );
            }
            alternating.push(value);
        }
        summary.records.push(MeanAlternatingRecord {
            selection_id: selection.id,
            name: selection.name.clone(),
            static_set: peak.set,
            static_time: peak.time,
            mean_stress: peak.peak.value,
            node: peak.peak.entity_id,
            alternating,
        });
    }

    info!(
        selections = summary.records.len(),
        children = children.len(),
        "computed mean/alternating stress summary"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Location;

    fn selection() -> NamedSelection {
        NamedSelection {
            id: 12,
            name: "Bracket".to_string(),
            node_ids: vec![1, 2, 3],
            element_ids: vec![100],
        }
    }

    fn scoping() -> TimeScoping {
        let support = crate::time_scoping::TimeFreqSupport::new("s", vec![1.0, 2.0]).unwrap();
        TimeScoping::from_ids(&support, &[1, 2]).unwrap()
    }

    #[test]
    fn test_peak_of_field() {
        let field = Field::scalar(Location::Nodal, "psi", vec![1, 2, 3], vec![5.0, 12.0, 7.0]).unwrap();
        assert_eq!(PeakValue::of(&field), Some(PeakValue { entity_id: 2, value: 12.0 }));
    }

    #[test]
    fn test_empty_sets_are_dropped() {
        let mut fc = FieldsContainer::new();
        fc.push(1, Field::scalar(Location::Nodal, "psi", vec![], vec![]).unwrap());
        fc.push(2, Field::scalar(Location::Nodal, "psi", vec![1, 2], vec![100.0, 50.0]).unwrap());

        let psi = Unit::parse("psi").unwrap();
        let records = container_peaks(&selection(), &fc, &scoping(), &psi, 3.0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].set, 2);
        assert_eq!(records[0].time, 2.0);
        assert_eq!(records[0].peak, PeakValue { entity_id: 1, value: 300.0 });
    }

    #[test]
    fn test_peaks_are_converted() {
        let mut fc = FieldsContainer::new();
        fc.push(1, Field::scalar(Location::Nodal, "Pa", vec![4], vec![2.0e6]).unwrap());
        let mpa = Unit::parse("MPa").unwrap();
        let records = container_peaks(&selection(), &fc, &scoping(), &mpa, 1.0).unwrap();
        assert!((records[0].peak.value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_directional_peaks_over_time() {
        let mut fc = FieldsContainer::new();
        fc.push(
            1,
            Field::vector(Location::Nodal, "in", vec![1, 2], vec![3.0, -1.0, 0.5, 1.0, -2.0, 0.5]).unwrap(),
        );
        fc.push(
            2,
            Field::vector(Location::Nodal, "in", vec![1, 2], vec![2.0, -4.0, 0.5, 0.0, -3.0, 0.25]).unwrap(),
        );

        let axes = directional_peaks(&fc, &scoping(), 1.0).unwrap();
        let x = axes[Axis::X.index()].unwrap();
        assert_eq!((x.peak, x.set, x.time), (PeakValue { entity_id: 1, value: 3.0 }, 1, 1.0));
        // The largest Y component is the least negative one
        let y = axes[Axis::Y.index()].unwrap();
        assert_eq!((y.peak, y.set), (PeakValue { entity_id: 1, value: -1.0 }, 1));
        // Equal peaks in both sets keep the first set; node 2 wins the tie within it
        let z = axes[Axis::Z.index()].unwrap();
        assert_eq!((z.peak, z.set), (PeakValue { entity_id: 2, value: 0.5 }, 1));
    }

    #[test]
    fn test_directional_peaks_need_vector_fields() {
        let mut fc = FieldsContainer::new();
        fc.push(1, Field::scalar(Location::Nodal, "in", vec![1], vec![3.0]).unwrap());
        let err = directional_peaks(&fc, &scoping(), 1.0).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");

        let empty = directional_peaks(&FieldsContainer::new(), &scoping(), 1.0).unwrap();
        assert_eq!(empty, [None; 3]);
    }
}
