//! # Model Tree
//!
//! Entities resolved from the host model (beam connections, joints, contact
//! regions, named selections, coordinate systems, materials) and the
//! [`ModelTree`] trait through which the passes look them up.
//!
//! All geometric values are expressed in the model's consistent unit system,
//! reported by [`ModelTree::unit_system`].

use serde::{Deserialize, Serialize};

use crate::errors::{PostError, PostResult};
use crate::units::UnitSystem;

/// A beam connection idealized as a circular line element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamConnection {
    /// Host object id
    pub id: u32,
    pub name: String,
    /// Solver element id of the beam element
    pub element_id: u32,
    /// Section radius (not validated until a calculator uses it)
    pub radius: f64,
    /// Reference point location
    pub reference_point: [f64; 3],
    /// Mobile point location
    pub mobile_point: [f64; 3],
    /// Name of the assigned material, if any
    #[serde(default)]
    pub material: Option<String>,
}

impl BeamConnection {
    /// Distance between the reference and mobile points
    pub fn length(&self) -> f64 {
        self.reference_point
            .iter()
            .zip(&self.mobile_point)
            .map(|(a, b)| (b - a).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Whether a joint degree of freedom is constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DofState {
    #[default]
    Fixed,
    Free,
}

/// Rotational freedom of a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationDofs {
    FreeAll,
    FreeX,
    FreeY,
    FreeZ,
    /// No rotation is free
    #[default]
    Fixed,
}

/// Degree-of-freedom declaration of a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JointDofs {
    /// Translation along X, Y, Z
    pub translation: [DofState; 3],
    pub rotations: RotationDofs,
}

/// A kinematic joint solved as an MPC184 element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConnection {
    pub id: u32,
    pub name: String,
    /// Joint type as shown by the host ("Revolute", "Fixed", ...)
    pub joint_type: String,
    /// Solver element id; 0 when the joint was not sent to the solver
    pub element_id: u32,
    #[serde(default)]
    pub dofs: JointDofs,
}

/// A named group of mesh entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSelection {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub node_ids: Vec<u32>,
    #[serde(default)]
    pub element_ids: Vec<u32>,
}

impl NamedSelection {
    /// Node ids with duplicates removed, first occurrence order kept
    pub fn unique_node_ids(&self) -> Vec<u32> {
        let mut seen = std::collections::HashSet::new();
        self.node_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// A folder grouping named selections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSelectionFolder {
    pub name: String,
    #[serde(default)]
    pub selections: Vec<NamedSelection>,
}

/// A contact region; nodes are taken from its contact-side elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRegion {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub element_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub name: String,
    pub origin: [f64; 3],
    /// Unit X, Y and Z axis directions in global coordinates; global
    /// orientation when absent
    #[serde(default)]
    pub axes: Option<[[f64; 3]; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Young's modulus in the model's stress unit
    #[serde(default)]
    pub youngs_modulus: Option<f64>,
}

/// Read access to the host model.
///
/// Name lookups fail with [`PostError::AmbiguousLookup`] when the name
/// matches zero or several entries.
pub trait ModelTree {
    /// Consistent length/force units of model geometry and solver results
    fn unit_system(&self) -> PostResult<UnitSystem>;

    fn beam_connections(&self) -> PostResult<Vec<BeamConnection>>;

    fn joints(&self) -> PostResult<Vec<JointConnection>>;

    fn contacts(&self) -> PostResult<Vec<ContactRegion>>;

    /// Named selections grouped under the folder called `name`
    fn find_folder_by_name(&self, name: &str) -> PostResult<NamedSelectionFolder>;

    fn find_coordinate_system(&self, name: &str) -> PostResult<CoordinateSystem>;

    fn find_material(&self, name: &str) -> PostResult<Material>;
}

/// Return the single item whose name equals `name`.
pub fn find_unique<'a, T, F>(items: &'a [T], kind: &str, name: &str, name_of: F) -> PostResult<&'a T>
where
    F: Fn(&T) -> &str,
{
    let mut matches = items.iter().filter(|item| name_of(item) == name);
    match (matches.next(), matches.next()) {
        (Some(item), None) => Ok(item),
        (None, _) => Err(PostError::ambiguous_lookup(kind, name, 0)),
        (Some(_), Some(_)) => {
            let count = items.iter().filter(|item| name_of(item) == name).count();
            Err(PostError::ambiguous_lookup(kind, name, count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beam_length() {
        let beam = BeamConnection {
            id: 1,
            name: "Bolt 1".to_string(),
            element_id: 100,
            radius: 0.25,
            reference_point: [0.0, 0.0, 0.0],
            mobile_point: [3.0, 4.0, 0.0],
            material: None,
        };
        assert_eq!(beam.length(), 5.0);
    }

    #[test]
    fn test_unique_node_ids() {
        let ns = NamedSelection {
            id: 7,
            name: "Face".to_string(),
            node_ids: vec![3, 1, 3, 2, 1],
            element_ids: vec![],
        };
        assert_eq!(ns.unique_node_ids(), vec![3, 1, 2]);
    }

    #[test]
    fn test_find_unique() {
        let names = vec!["A".to_string(), "B".to_string(), "B".to_string()];
        assert_eq!(find_unique(&names, "folder", "A", |s| s.as_str()).unwrap(), "A");
        match find_unique(&names, "folder", "B", |s| s.as_str()).unwrap_err() {
            PostError::AmbiguousLookup { matches, .. } => assert_eq!(matches, 2),
            other => panic!("unexpected error {:?}", other),
        }
        match find_unique(&names, "folder", "C", |s| s.as_str()).unwrap_err() {
            PostError::AmbiguousLookup { matches, .. } => assert_eq!(matches, 0),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_joint_dofs_default_to_fixed() {
        let joint: JointConnection = serde_json::from_str(
            r#"{"id": 4, "name": "Revolute - A To B", "joint_type": "Revolute", "element_id": 9001}"#,
        )
        .unwrap();
        assert_eq!(joint.dofs.rotations, RotationDofs::Fixed);
        assert_eq!(joint.dofs.translation, [DofState::Fixed; 3]);
    }
}
