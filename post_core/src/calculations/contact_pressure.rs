//! # Contact Pressure
//!
//! Nodal contact pressure of contact regions, with the coordinates of each
//! node, at every scoped set.
//!
//! Nodes come from the contact-side elements of each region. Coordinates are
//! reported either in the global frame or in a local coordinate system:
//!
//! - x_local = R · (x − o)
//!
//! where the rows of R are the local axis directions and o is the local
//! origin, both in global coordinates.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{PassOutput, SkippedRecord};
use crate::errors::{PostError, PostResult};
use crate::model::{ContactRegion, CoordinateSystem};
use crate::results::ResultSource;
use crate::time_scoping::TimeScoping;
use crate::units::Unit;

/// Frame in which node coordinates are reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalFrame {
    /// Coordinate system name, `Global` for the global frame
    pub name: String,
    pub origin: [f64; 3],
    pub axes: [[f64; 3]; 3],
}

impl LocalFrame {
    pub fn global() -> Self {
        LocalFrame {
            name: "Global".to_string(),
            origin: [0.0; 3],
            axes: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Frame of a model coordinate system; `length_factor` converts its
    /// origin from model units to the unit of the transformed points.
    pub fn from_coordinate_system(cs: &CoordinateSystem, length_factor: f64) -> Self {
        LocalFrame {
            name: cs.name.clone(),
            origin: cs.origin.map(|v| v * length_factor),
            axes: cs.axes.unwrap_or(LocalFrame::global().axes),
        }
    }

    /// Coordinates of a global point in this frame
    pub fn transform(&self, point: [f64; 3]) -> [f64; 3] {
        let d = [
            point[0] - self.origin[0],
            point[1] - self.origin[1],
            point[2] - self.origin[2],
        ];
        self.axes.map(|axis| axis[0] * d[0] + axis[1] * d[1] + axis[2] * d[2])
    }
}

/// Contact pressure at one node and set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPressureRecord {
    pub contact_id: u32,
    pub name: String,
    pub set: usize,
    pub time: f64,
    pub node_id: u32,
    /// Node coordinates in the report frame
    pub position: [f64; 3],
    pub pressure: f64,
}

/// Records of one region, ordered by set then node id.
fn region_pressures<S>(
    source: &S,
    contact: &ContactRegion,
    scoping: &TimeScoping,
    frame: &LocalFrame,
    stress_unit: &Unit,
    length_unit: &Unit,
) -> PostResult<Vec<ContactPressureRecord>>
where
    S: ResultSource + ?Sized,
{
    if contact.element_ids.is_empty() {
        return Err(PostError::missing_field("elements", format!("contact '{}'", contact.name)));
    }
    let pressures = source
        .contact_pressure(scoping, &contact.element_ids)?
        .without_empty();

    let mut records = Vec::new();
    for sample in &scoping.samples {
        let Some(field) = pressures.get(sample.set) else {
            continue;
        };
        let field = field.converted(stress_unit)?;
        let mut node_ids = field.ids.clone();
        node_ids.sort_unstable();
        let positions = source.node_coordinates(&node_ids)?.converted(length_unit)?;
        if positions.components != 3 {
            return Err(PostError::host_api("node_coordinates", "expected three-component coordinates"));
        }
        debug!(contact = %contact.name, set = sample.set, nodes = node_ids.len(), "reading contact pressure");

        for node in node_ids {
            let Some(pressure) = field.scalar_at(node) else {
                continue;
            };
            let xyz = positions
                .entity(node)
                .ok_or_else(|| PostError::missing_field("node coordinates", format!("node {}", node)))?;
            records.push(ContactPressureRecord {
                contact_id: contact.id,
                name: contact.name.clone(),
                set: sample.set,
                time: sample.time,
                node_id: node,
                position: frame.transform([xyz[0], xyz[1], xyz[2]]),
                pressure,
            });
        }
    }
    Ok(records)
}

/// Contact pressure of every region at every scoped set.
///
/// Pressure is converted to `stress_unit` and coordinates to `length_unit`;
/// `frame` must be expressed in `length_unit`. A region without elements or
/// without pressure results is skipped.
pub fn contact_pressures<S>(
    source: &S,
    contacts: &[ContactRegion],
    scoping: &TimeScoping,
    frame: &LocalFrame,
    stress_unit: &Unit,
    length_unit: &Unit,
) -> PostResult<PassOutput<ContactPressureRecord>>
where
    S: ResultSource + ?Sized,
{
    let mut output = PassOutput::default();
    for contact in contacts {
        match region_pressures(source, contact, scoping, frame, stress_unit, length_unit) {
            Ok(records) if records.is_empty() => output.skipped.push(SkippedRecord::new(
                contact.id,
                &contact.name,
                None,
                PostError::missing_field("contact pressure", "no result set carried data for the contact"),
            )),
            Ok(records) => output.records.extend(records),
            Err(e) if e.is_record_local() => output
                .skipped
                .push(SkippedRecord::new(contact.id, &contact.name, None, e)),
            Err(e) => return Err(e),
        }
    }
    info!(
        contacts = contacts.len(),
        records = output.records.len(),
        frame = %frame.name,
        "extracted contact pressure"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_global_frame_is_identity() {
        let frame = LocalFrame::global();
        assert_eq!(frame.transform([1.0, -2.0, 3.0]), [1.0, -2.0, 3.0]);
    }

    #[test]
    fn test_rotated_frame() {
        // Local X along global Y, local Y along global -X
        let cs = CoordinateSystem {
            name: "Loc Csys".to_string(),
            origin: [1.0, 0.0, 0.0],
            axes: Some([[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]),
        };
        let frame = LocalFrame::from_coordinate_system(&cs, 1.0);
        assert_eq!(frame.transform([1.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
        assert_eq!(frame.transform([0.0, 1.0, 2.0]), [1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_frame_origin_is_converted() {
        let cs = CoordinateSystem {
            name: "Offset".to_string(),
            origin: [1.0, 0.0, 0.0],
            axes: None,
        };
        let frame = LocalFrame::from_coordinate_system(&cs, 25.4);
        let local = frame.transform([25.4, 10.0, 0.0]);
        assert_relative_eq!(local[0], 0.0);
        assert_relative_eq!(local[1], 10.0);
    }
}
