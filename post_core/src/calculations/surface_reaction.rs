//! # Surface Reactions
//!
//! Net reaction force and moment transmitted through the nodes of a named
//! selection, from element nodal forces.
//!
//! For each selection and set:
//!
//! - Fᵢ = s · f(node i), with s = −1 (−σ for random vibration)
//! - F = Σ Fᵢ, |F|
//! - M = Σ (xᵢ − p) × Fᵢ about the summation point p, |M|
//!
//! Each node contributes once, however many times it appears in the
//! selection.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{PassOutput, SkippedRecord};
use crate::errors::{PostError, PostResult};
use crate::fields::{cross_product, Field};
use crate::model::{NamedSelection, NamedSelectionFolder};
use crate::results::ResultSource;
use crate::time_scoping::TimeScoping;
use crate::units::UnitSystem;

/// Net force and moment over a set of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceReaction {
    pub force: [f64; 3],
    pub force_total: f64,
    pub moment: [f64; 3],
    pub moment_total: f64,
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn to_array(v: &[f64]) -> [f64; 3] {
    [v[0], v[1], v[2]]
}

/// Sum nodal forces and their moments about `origin`.
///
/// `forces` and `positions` are nodal vector fields; every node carrying a
/// force must have a position. The moment unit is the product of the two
/// fields' units.
///
/// # Example
///
/// ```rust
/// use post_core::calculations::surface_reaction::sum_reactions;
/// use post_core::fields::{Field, Location};
///
/// let forces = Field::vector(Location::Nodal, "lbf", vec![1, 2], vec![0.0, 0.0, 5.0, 0.0, 0.0, 5.0])
///     .unwrap();
/// let positions = Field::vector(Location::Nodal, "in", vec![1, 2], vec![1.0, 0.0, 0.0, -1.0, 0.0, 0.0])
///     .unwrap();
///
/// let reaction = sum_reactions(&forces, &positions, [0.0; 3]).unwrap();
/// assert_eq!(reaction.force, [0.0, 0.0, 10.0]);
/// assert_eq!(reaction.moment_total, 0.0);
/// ```
pub fn sum_reactions(forces: &Field, positions: &Field, origin: [f64; 3]) -> PostResult<SurfaceReaction> {
    for (name, field) in [("forces", forces), ("positions", positions)] {
        if field.components != 3 {
            return Err(PostError::invalid_input(
                name,
                field.components.to_string(),
                "Surface reactions need three-component vector fields",
            ));
        }
    }
    let relative = Field {
        data: positions
            .data
            .chunks(3)
            .flat_map(|x| [x[0] - origin[0], x[1] - origin[1], x[2] - origin[2]])
            .collect(),
        ..positions.clone()
    };
    let moments = cross_product(&relative, forces)?;

    let force = to_array(&forces.accumulate());
    let moment = to_array(&moments.accumulate());
    Ok(SurfaceReaction {
        force,
        force_total: norm(force),
        moment,
        moment_total: norm(moment),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceReactionRecord {
    pub selection_id: u32,
    pub name: String,
    pub node_count: usize,
    pub set: usize,
    pub time: f64,
    pub reaction: SurfaceReaction,
}

/// Reactions of one selection at every scoped set, in output units.
fn selection_reactions<S>(
    source: &S,
    selection: &NamedSelection,
    origin: [f64; 3],
    scale: f64,
    scoping: &TimeScoping,
    units: &UnitSystem,
) -> PostResult<Vec<SurfaceReactionRecord>>
where
    S: ResultSource + ?Sized,
{
    let nodes = selection.unique_node_ids();
    if nodes.is_empty() {
        return Err(PostError::missing_field("nodes", format!("named selection '{}'", selection.name)));
    }
    debug!(selection = %selection.name, nodes = nodes.len(), "summing surface reactions");

    let force_unit = units.force_unit()?;
    let positions = source
        .node_coordinates(&nodes)?
        .converted(&units.length_unit()?)?;
    let forces = source.element_nodal_forces(scoping, &nodes)?;

    let mut records = Vec::with_capacity(scoping.len());
    for sample in &scoping.samples {
        let field = forces.get(sample.set).ok_or_else(|| {
            PostError::missing_field("element nodal forces", format!("set {}", sample.set))
        })?;
        let scaled = field.restricted(&nodes).scaled(scale).converted(&force_unit)?;
        records.push(SurfaceReactionRecord {
            selection_id: selection.id,
            name: selection.name.clone(),
            node_count: nodes.len(),
            set: sample.set,
            time: sample.time,
            reaction: sum_reactions(&scaled, &positions, origin)?,
        });
    }
    Ok(records)
}

/// Surface reactions for every selection of a folder.
///
/// `origin` is the summation point in the output length unit; `scale` is
/// applied to the raw element nodal forces. Records are ordered by
/// selection id, then set.
pub fn surface_reactions<S>(
    source: &S,
    folder: &NamedSelectionFolder,
    origin: [f64; 3],
    scale: f64,
    scoping: &TimeScoping,
    units: &UnitSystem,
) -> PostResult<PassOutput<SurfaceReactionRecord>>
where
    S: ResultSource + ?Sized,
{
    let mut selections: Vec<&NamedSelection> = folder.selections.iter().collect();
    selections.sort_by_key(|ns| ns.id);

    let mut output = PassOutput::default();
    for selection in selections {
        match selection_reactions(source, selection, origin, scale, scoping, units) {
            Ok(records) => output.records.extend(records),
            Err(e) if e.is_record_local() => output
                .skipped
                .push(SkippedRecord::new(selection.id, &selection.name, None, e)),
            Err(e) => return Err(e),
        }
    }

    info!(
        folder = %folder.name,
        selections = folder.selections.len(),
        records = output.records.len(),
        "computed surface reactions"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Location;
    use approx::assert_relative_eq;

    fn positions() -> Field {
        Field::vector(
            Location::Nodal,
            "in",
            vec![1, 2, 3],
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn test_force_sum_and_norm() {
        let forces = Field::vector(
            Location::Nodal,
            "lbf",
            vec![1, 2, 3],
            vec![1.0, 2.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        )
        .unwrap();
        let reaction = sum_reactions(&forces, &positions(), [0.0; 3]).unwrap();
        assert_eq!(reaction.force, [1.0, 2.0, 2.0]);
        assert_eq!(reaction.force_total, 3.0);
    }

    #[test]
    fn test_moment_about_offset_point() {
        // Unit force along Y at node 1 (x = 1)
        let forces = Field::vector(Location::Nodal, "lbf", vec![1], vec![0.0, 1.0, 0.0]).unwrap();
        let about_origin = sum_reactions(&forces, &positions(), [0.0; 3]).unwrap();
        assert_eq!(about_origin.moment, [0.0, 0.0, 1.0]);

        // Moving the summation point onto the line of action removes the moment
        let about_node = sum_reactions(&forces, &positions(), [1.0, 5.0, 0.0]).unwrap();
        assert_relative_eq!(about_node.moment_total, 0.0);

        let about_far = sum_reactions(&forces, &positions(), [-2.0, 0.0, 0.0]).unwrap();
        assert_eq!(about_far.moment, [0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_force_without_position_is_missing() {
        let forces = Field::vector(Location::Nodal, "lbf", vec![9], vec![0.0, 1.0, 0.0]).unwrap();
        let err = sum_reactions(&forces, &positions(), [0.0; 3]).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");
    }

    #[test]
    fn test_scalar_fields_are_rejected() {
        let forces = Field::vector(Location::Nodal, "lbf", vec![1], vec![0.0, 0.0, 5.0]).unwrap();
        let scalar_positions = Field::scalar(Location::Nodal, "in", vec![1], vec![1.0]).unwrap();
        let err = sum_reactions(&forces, &scalar_positions, [0.0; 3]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let scalar_forces = Field::scalar(Location::Nodal, "lbf", vec![1], vec![5.0]).unwrap();
        let err = sum_reactions(&scalar_forces, &positions(), [0.0; 3]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
