//! # Fields and Field Operators
//!
//! A [`Field`] is a scalar or vector quantity distributed over mesh entities
//! (nodes or elements) for a single result set. A [`FieldsContainer`] holds
//! one field per result set, in evaluation order.
//!
//! The operators here (norm, max, accumulate, cross product, scale, unit
//! conversion, restriction) are the reductions the post-processing passes
//! apply to raw result fields. All of them return new fields; inputs are
//! never mutated.
//!
//! ## Example
//!
//! ```rust
//! use post_core::fields::{Field, Location};
//!
//! let displacement = Field::vector(
//!     Location::Nodal,
//!     "in",
//!     vec![10, 11],
//!     vec![0.0, 3.0, 4.0, 1.0, 0.0, 0.0],
//! ).unwrap();
//!
//! let total = displacement.norm();
//! assert_eq!(total.max(), Some((10, 5.0)));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{PostError, PostResult};
use crate::units::Unit;

/// Global axis, also the component index of a vector field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// `X-Axis`, `Y-Axis` or `Z-Axis`
    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X-Axis",
            Axis::Y => "Y-Axis",
            Axis::Z => "Z-Axis",
        }
    }
}

/// Mesh support of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Nodal,
    Elemental,
}

/// Quantity distributed over entity ids.
///
/// `data` is laid out entity-major: `data[k * components + c]` is component
/// `c` of entity `ids[k]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub location: Location,
    /// Unit symbol of the stored values
    pub unit: String,
    /// Number of components per entity (1 for scalars, 3 for vectors)
    pub components: usize,
    pub ids: Vec<u32>,
    pub data: Vec<f64>,
}

impl Field {
    /// Create a field, checking that `data` matches `ids` and `components`.
    pub fn new(
        location: Location,
        unit: impl Into<String>,
        components: usize,
        ids: Vec<u32>,
        data: Vec<f64>,
    ) -> PostResult<Self> {
        let field = Field {
            location,
            unit: unit.into(),
            components,
            ids,
            data,
        };
        field.validate()?;
        Ok(field)
    }

    /// Create a one-component field
    pub fn scalar(
        location: Location,
        unit: impl Into<String>,
        ids: Vec<u32>,
        data: Vec<f64>,
    ) -> PostResult<Self> {
        Field::new(location, unit, 1, ids, data)
    }

    /// Create a three-component field
    pub fn vector(
        location: Location,
        unit: impl Into<String>,
        ids: Vec<u32>,
        data: Vec<f64>,
    ) -> PostResult<Self> {
        Field::new(location, unit, 3, ids, data)
    }

    /// Check the data layout invariant.
    pub fn validate(&self) -> PostResult<()> {
        if self.components == 0 {
            return Err(PostError::invalid_input("components", "0", "Field needs at least one component"));
        }
        if self.data.len() != self.ids.len() * self.components {
            return Err(PostError::invalid_input(
                "data",
                self.data.len().to_string(),
                format!(
                    "Expected {} values for {} entities with {} components",
                    self.ids.len() * self.components,
                    self.ids.len(),
                    self.components
                ),
            ));
        }
        Ok(())
    }

    /// Number of entities carrying data
    pub fn entity_count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate `(id, components)` pairs in storage order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[f64])> + '_ {
        self.ids
            .iter()
            .copied()
            .zip(self.data.chunks(self.components))
    }

    /// Component values for one entity
    pub fn entity(&self, id: u32) -> Option<&[f64]> {
        self.ids
            .iter()
            .position(|&candidate| candidate == id)
            .map(|k| &self.data[k * self.components..(k + 1) * self.components])
    }

    /// First component for one entity
    pub fn scalar_at(&self, id: u32) -> Option<f64> {
        self.entity(id).map(|values| values[0])
    }

    /// Keep only the entities listed in `ids`, in the field's own order.
    pub fn restricted(&self, ids: &[u32]) -> Field {
        let wanted: std::collections::HashSet<u32> = ids.iter().copied().collect();
        let mut out_ids = Vec::new();
        let mut out_data = Vec::new();
        for (id, values) in self.iter() {
            if wanted.contains(&id) {
                out_ids.push(id);
                out_data.extend_from_slice(values);
            }
        }
        Field {
            location: self.location,
            unit: self.unit.clone(),
            components: self.components,
            ids: out_ids,
            data: out_data,
        }
    }

    /// Multiply every value by `factor`
    pub fn scaled(&self, factor: f64) -> Field {
        Field {
            data: self.data.iter().map(|v| v * factor).collect(),
            ..self.clone()
        }
    }

    /// Convert every value into `target`.
    pub fn converted(&self, target: &Unit) -> PostResult<Field> {
        let factor = Unit::parse(&self.unit)?.factor_to(target)?;
        Ok(Field {
            unit: target.symbol().to_string(),
            ..self.scaled(factor)
        })
    }

    /// Euclidean norm of each entity's components (scalar field)
    pub fn norm(&self) -> Field {
        Field {
            location: self.location,
            unit: self.unit.clone(),
            components: 1,
            ids: self.ids.clone(),
            data: self
                .iter()
                .map(|(_, values)| values.iter().map(|v| v * v).sum::<f64>().sqrt())
                .collect(),
        }
    }

    /// Extract one component as a scalar field
    pub fn component(&self, index: usize) -> PostResult<Field> {
        if index >= self.components {
            return Err(PostError::missing_field(
                format!("component {}", index),
                format!("field has {} components", self.components),
            ));
        }
        Ok(Field {
            location: self.location,
            unit: self.unit.clone(),
            components: 1,
            ids: self.ids.clone(),
            data: self.iter().map(|(_, values)| values[index]).collect(),
        })
    }

    /// Entity id and value of the maximum, over the largest component of
    /// each entity. On ties the later entity wins.
    pub fn max(&self) -> Option<(u32, f64)> {
        let mut best: Option<(u32, f64)> = None;
        for (id, values) in self.iter() {
            let value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            match best {
                Some((_, current)) if value < current => {}
                _ => best = Some((id, value)),
            }
        }
        best
    }

    /// Component-wise sum over all entities
    pub fn accumulate(&self) -> Vec<f64> {
        let mut sum = vec![0.0; self.components];
        for (_, values) in self.iter() {
            for (total, value) in sum.iter_mut().zip(values) {
                *total += value;
            }
        }
        sum
    }
}

/// Cross product `a × b`, evaluated over the entities of `b`.
///
/// Both fields must be three-component vectors; every id in `b` must be
/// present in `a`. The result carries `b`'s location and the product unit
/// `"{a.unit}*{b.unit}"`.
pub fn cross_product(a: &Field, b: &Field) -> PostResult<Field> {
    if a.components != 3 || b.components != 3 {
        return Err(PostError::invalid_input(
            "components",
            format!("{} x {}", a.components, b.components),
            "Cross product needs three-component fields",
        ));
    }
    let lookup: HashMap<u32, &[f64]> = a.iter().collect();
    let mut data = Vec::with_capacity(b.data.len());
    for (id, f) in b.iter() {
        let r = lookup
            .get(&id)
            .ok_or_else(|| PostError::missing_field(format!("entity {}", id), "cross product left operand"))?;
        data.push(r[1] * f[2] - r[2] * f[1]);
        data.push(r[2] * f[0] - r[0] * f[2]);
        data.push(r[0] * f[1] - r[1] * f[0]);
    }
    Ok(Field {
        location: b.location,
        unit: format!("{}*{}", a.unit, b.unit),
        components: 3,
        ids: b.ids.clone(),
        data,
    })
}

/// A field tagged with the result set it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetField {
    /// 1-based result set id
    pub set: usize,
    pub field: Field,
}

/// One field per result set, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldsContainer {
    pub fields: Vec<SetField>,
}

impl FieldsContainer {
    pub fn new() -> Self {
        FieldsContainer::default()
    }

    pub fn push(&mut self, set: usize, field: Field) {
        self.fields.push(SetField { set, field });
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field for a result set
    pub fn get(&self, set: usize) -> Option<&Field> {
        self.fields
            .iter()
            .find(|entry| entry.set == set)
            .map(|entry| &entry.field)
    }

    /// Drop fields that carry no entities
    pub fn without_empty(&self) -> FieldsContainer {
        FieldsContainer {
            fields: self
                .fields
                .iter()
                .filter(|entry| !entry.field.is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Apply a field operator to every set
    pub fn map<F>(&self, op: F) -> PostResult<FieldsContainer>
    where
        F: Fn(&Field) -> PostResult<Field>,
    {
        let mut out = FieldsContainer::new();
        for entry in &self.fields {
            out.push(entry.set, op(&entry.field)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forces() -> Field {
        Field::vector(
            Location::Nodal,
            "lbf",
            vec![1, 2],
            vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_layout_validation() {
        assert!(Field::scalar(Location::Nodal, "psi", vec![1, 2], vec![1.0]).is_err());
        assert!(Field::new(Location::Nodal, "psi", 0, vec![], vec![]).is_err());
    }

    #[test]
    fn test_entity_lookup() {
        let f = forces();
        assert_eq!(f.entity(2), Some(&[0.0, 2.0, 0.0][..]));
        assert_eq!(f.entity(3), None);
        assert_eq!(f.scalar_at(1), Some(1.0));
    }

    #[test]
    fn test_accumulate_and_norm() {
        let f = forces();
        assert_eq!(f.accumulate(), vec![1.0, 2.0, 0.0]);
        let n = f.norm();
        assert_eq!(n.components, 1);
        assert_eq!(n.data, vec![1.0, 2.0]);
    }

    #[test]
    fn test_max_prefers_later_on_ties() {
        let f = Field::scalar(Location::Nodal, "psi", vec![5, 6, 7], vec![3.0, 9.0, 9.0]).unwrap();
        assert_eq!(f.max(), Some((7, 9.0)));
        let empty = Field::scalar(Location::Nodal, "psi", vec![], vec![]).unwrap();
        assert_eq!(empty.max(), None);
    }

    #[test]
    fn test_cross_product() {
        let positions = Field::vector(
            Location::Nodal,
            "in",
            vec![1, 2, 3],
            vec![0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 9.0, 9.0, 9.0],
        )
        .unwrap();
        let moments = cross_product(&positions, &forces()).unwrap();
        assert_eq!(moments.unit, "in*lbf");
        // (0,1,0) x (1,0,0) = (0,0,-1); (1,0,0) x (0,2,0) = (0,0,2)
        assert_eq!(moments.data, vec![0.0, 0.0, -1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_cross_product_missing_position() {
        let positions = Field::vector(Location::Nodal, "in", vec![1], vec![0.0, 0.0, 0.0]).unwrap();
        let err = cross_product(&positions, &forces()).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");
    }

    #[test]
    fn test_restrict_scale_convert() {
        let f = forces().restricted(&[2]);
        assert_eq!(f.ids, vec![2]);
        let scaled = f.scaled(-1.0);
        assert_eq!(scaled.data, vec![-0.0, -2.0, -0.0]);
        let newtons = scaled.converted(&Unit::parse("N").unwrap()).unwrap();
        assert_eq!(newtons.unit, "N");
        assert!((newtons.data[1] + 8.896_443).abs() < 1e-5);
    }

    #[test]
    fn test_container_without_empty() {
        let mut fc = FieldsContainer::new();
        fc.push(1, forces());
        fc.push(2, Field::vector(Location::Nodal, "lbf", vec![], vec![]).unwrap());
        let cleaned = fc.without_empty();
        assert_eq!(cleaned.len(), 1);
        assert!(cleaned.get(1).is_some());
        assert!(cleaned.get(2).is_none());
    }
}
