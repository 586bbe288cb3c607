//! # Results Archive
//!
//! A JSON export of a model and its analyses' result fields. The archive
//! implements [`ModelTree`] directly and [`ResultSource`] per analysis
//! (through [`AnalysisView`]), so every pass can run outside the host
//! application.
//!
//! ## JSON Layout
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "unit_system": { "length": "in", "force": "lbf" },
//!   "mesh": {
//!     "nodes": { "location": "Nodal", "unit": "in", "components": 3, "ids": [1], "data": [0.0, 0.0, 0.0] },
//!     "elements": [ { "id": 100, "node_ids": [1] } ]
//!   },
//!   "beam_connections": [],
//!   "joints": [],
//!   "contacts": [],
//!   "named_selection_folders": [],
//!   "coordinate_systems": [],
//!   "materials": [],
//!   "analyses": [
//!     {
//!       "name": "Static Structural",
//!       "kind": "Static",
//!       "time_freq_support": { "unit": "s", "values": [1.0] },
//!       "smisc": [ { "item": 1, "fields": { "fields": [] } } ]
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{PostError, PostResult};
use crate::fields::{Field, FieldsContainer, Location};
use crate::file_io::{read_json, validate_version, write_atomic, SCHEMA_VERSION};
use crate::model::{
    find_unique, BeamConnection, ContactRegion, CoordinateSystem, JointConnection, Material, ModelTree,
    NamedSelectionFolder,
};
use crate::results::{AnalysisHandle, ResultSource};
use crate::time_scoping::{AnalysisKind, TimeFreqSupport, TimeScoping};
use crate::units::UnitSystem;

/// Node list of one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNodes {
    pub id: u32,
    pub node_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Nodal coordinates (three components per node)
    pub nodes: Field,
    #[serde(default)]
    pub elements: Vec<ElementNodes>,
}

/// Fields of one SMISC item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmiscChannel {
    pub item: u32,
    pub fields: FieldsContainer,
}

/// Result fields of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisArchive {
    pub name: String,
    pub kind: AnalysisKind,
    pub time_freq_support: TimeFreqSupport,
    #[serde(default)]
    pub smisc: Vec<SmiscChannel>,
    #[serde(default)]
    pub element_nodal_forces: Option<FieldsContainer>,
    #[serde(default)]
    pub displacement: Option<FieldsContainer>,
    #[serde(default)]
    pub velocity: Option<FieldsContainer>,
    /// Nodal von Mises stress
    #[serde(default)]
    pub von_mises_stress: Option<FieldsContainer>,
    /// Nodal contact pressure
    #[serde(default)]
    pub contact_pressure: Option<FieldsContainer>,
}

/// A model and the results of its analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsArchive {
    pub version: String,
    /// Consistent units of model geometry and results
    pub unit_system: UnitSystem,
    pub mesh: Mesh,
    #[serde(default)]
    pub beam_connections: Vec<BeamConnection>,
    #[serde(default)]
    pub joints: Vec<JointConnection>,
    #[serde(default)]
    pub contacts: Vec<ContactRegion>,
    #[serde(default)]
    pub named_selection_folders: Vec<NamedSelectionFolder>,
    #[serde(default)]
    pub coordinate_systems: Vec<CoordinateSystem>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub analyses: Vec<AnalysisArchive>,
}

impl ResultsArchive {
    /// Create an empty archive at the current schema version.
    pub fn new(unit_system: UnitSystem, mesh: Mesh) -> Self {
        ResultsArchive {
            version: SCHEMA_VERSION.to_string(),
            unit_system,
            mesh,
            beam_connections: Vec::new(),
            joints: Vec::new(),
            contacts: Vec::new(),
            named_selection_folders: Vec::new(),
            coordinate_systems: Vec::new(),
            materials: Vec::new(),
            analyses: Vec::new(),
        }
    }

    /// Load an archive, validating schema version and data layout.
    ///
    /// # Errors
    ///
    /// * `FileError` / `SerializationError` when the file cannot be read or parsed
    /// * `VersionMismatch` when the schema version is incompatible
    /// * `InvalidInput` when a field's data does not match its ids
    pub fn load(path: &Path) -> PostResult<Self> {
        let archive: ResultsArchive = read_json(path)?;
        validate_version(&archive.version)?;
        archive.validate()?;
        debug!(
            path = %path.display(),
            analyses = archive.analyses.len(),
            "loaded results archive"
        );
        Ok(archive)
    }

    /// Save the archive as pretty JSON with an atomic write.
    pub fn save(&self, path: &Path) -> PostResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())
    }

    /// Check every field's data layout and the unit system.
    pub fn validate(&self) -> PostResult<()> {
        self.unit_system.validate()?;
        self.mesh.nodes.validate()?;
        for analysis in &self.analyses {
            let containers = analysis
                .smisc
                .iter()
                .map(|c| &c.fields)
                .chain(analysis.element_nodal_forces.iter())
                .chain(analysis.displacement.iter())
                .chain(analysis.velocity.iter())
                .chain(analysis.von_mises_stress.iter())
                .chain(analysis.contact_pressure.iter());
            for container in containers {
                for entry in &container.fields {
                    entry.field.validate()?;
                }
            }
        }
        Ok(())
    }

    /// Result source of the analysis called `name`.
    pub fn analysis(&self, name: &str) -> PostResult<AnalysisView<'_>> {
        let analysis = find_unique(&self.analyses, "analysis", name, |a| a.name.as_str())?;
        Ok(AnalysisView { archive: self, analysis })
    }

    /// Handles for the named analyses in the given order, or for every
    /// analysis in archive order when `names` is empty.
    pub fn handles(&self, names: &[String]) -> PostResult<Vec<AnalysisHandle<'_>>> {
        let views = if names.is_empty() {
            self.analyses
                .iter()
                .map(|analysis| AnalysisView { archive: self, analysis })
                .collect()
        } else {
            names
                .iter()
                .map(|name| self.analysis(name))
                .collect::<PostResult<Vec<_>>>()?
        };
        Ok(views
            .into_iter()
            .map(|view| AnalysisHandle {
                name: view.name().to_string(),
                kind: view.kind(),
                source: Box::new(view),
            })
            .collect())
    }

    /// Nodes of the given elements, sorted and deduplicated
    fn nodes_of_elements(&self, element_ids: &[u32]) -> Vec<u32> {
        let wanted: BTreeSet<u32> = element_ids.iter().copied().collect();
        let nodes: BTreeSet<u32> = self
            .mesh
            .elements
            .iter()
            .filter(|e| wanted.contains(&e.id))
            .flat_map(|e| e.node_ids.iter().copied())
            .collect();
        nodes.into_iter().collect()
    }
}

impl ModelTree for ResultsArchive {
    fn unit_system(&self) -> PostResult<UnitSystem> {
        Ok(self.unit_system.clone())
    }

    fn beam_connections(&self) -> PostResult<Vec<BeamConnection>> {
        Ok(self.beam_connections.clone())
    }

    fn joints(&self) -> PostResult<Vec<JointConnection>> {
        Ok(self.joints.clone())
    }

    fn contacts(&self) -> PostResult<Vec<ContactRegion>> {
        Ok(self.contacts.clone())
    }

    fn find_folder_by_name(&self, name: &str) -> PostResult<NamedSelectionFolder> {
        find_unique(&self.named_selection_folders, "named selection folder", name, |f| {
            f.name.as_str()
        })
        .cloned()
    }

    fn find_coordinate_system(&self, name: &str) -> PostResult<CoordinateSystem> {
        find_unique(&self.coordinate_systems, "coordinate system", name, |c| c.name.as_str()).cloned()
    }

    fn find_material(&self, name: &str) -> PostResult<Material> {
        find_unique(&self.materials, "material", name, |m| m.name.as_str()).cloned()
    }
}

/// One analysis of an archive, seen as a [`ResultSource`].
#[derive(Debug, Clone, Copy)]
pub struct AnalysisView<'a> {
    archive: &'a ResultsArchive,
    analysis: &'a AnalysisArchive,
}

impl<'a> AnalysisView<'a> {
    pub fn name(&self) -> &'a str {
        &self.analysis.name
    }

    pub fn kind(&self) -> AnalysisKind {
        self.analysis.kind
    }
}

/// Restrict each scoped set of `container` to `ids`.
fn scoped(
    container: Option<&FieldsContainer>,
    quantity: &str,
    scoping: &TimeScoping,
    ids: &[u32],
) -> PostResult<FieldsContainer> {
    let container =
        container.ok_or_else(|| PostError::missing_field(quantity, "not present in results archive"))?;
    let mut out = FieldsContainer::new();
    for sample in &scoping.samples {
        let field = container
            .get(sample.set)
            .ok_or_else(|| PostError::missing_field(quantity, format!("result set {}", sample.set)))?;
        out.push(sample.set, field.restricted(ids));
    }
    Ok(out)
}

impl ResultSource for AnalysisView<'_> {
    fn time_freq_support(&self) -> PostResult<TimeFreqSupport> {
        Ok(self.analysis.time_freq_support.clone())
    }

    fn smisc(&self, item: u32, scoping: &TimeScoping, element_ids: &[u32]) -> PostResult<FieldsContainer> {
        let channel = self.analysis.smisc.iter().find(|c| c.item == item).map(|c| &c.fields);
        scoped(channel, &format!("SMISC {}", item), scoping, element_ids)
    }

    fn element_nodal_forces(&self, scoping: &TimeScoping, node_ids: &[u32]) -> PostResult<FieldsContainer> {
        scoped(
            self.analysis.element_nodal_forces.as_ref(),
            "element nodal forces",
            scoping,
            node_ids,
        )
    }

    fn displacement(&self, scoping: &TimeScoping, node_ids: &[u32]) -> PostResult<FieldsContainer> {
        scoped(self.analysis.displacement.as_ref(), "displacement", scoping, node_ids)
    }

    fn velocity(&self, scoping: &TimeScoping, node_ids: &[u32]) -> PostResult<FieldsContainer> {
        scoped(self.analysis.velocity.as_ref(), "velocity", scoping, node_ids)
    }

    fn von_mises_stress(&self, scoping: &TimeScoping, element_ids: &[u32]) -> PostResult<FieldsContainer> {
        let nodes = self.archive.nodes_of_elements(element_ids);
        scoped(self.analysis.von_mises_stress.as_ref(), "von Mises stress", scoping, &nodes)
    }

    fn contact_pressure(&self, scoping: &TimeScoping, element_ids: &[u32]) -> PostResult<FieldsContainer> {
        let nodes = self.archive.nodes_of_elements(element_ids);
        scoped(self.analysis.contact_pressure.as_ref(), "contact pressure", scoping, &nodes)
    }

    fn node_coordinates(&self, node_ids: &[u32]) -> PostResult<Field> {
        let nodes = &self.archive.mesh.nodes;
        if nodes.location != Location::Nodal || nodes.components != 3 {
            return Err(PostError::host_api(
                "node_coordinates",
                "mesh nodes must be a three-component nodal field",
            ));
        }
        Ok(nodes.restricted(node_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn sample_archive() -> ResultsArchive {
        let nodes = Field::vector(
            Location::Nodal,
            "in",
            vec![1, 2, 3],
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0],
        )
        .unwrap();
        let mut archive = ResultsArchive::new(
            UnitSystem::default(),
            Mesh {
                nodes,
                elements: vec![
                    ElementNodes { id: 10, node_ids: vec![1, 2] },
                    ElementNodes { id: 11, node_ids: vec![2, 3] },
                ],
            },
        );

        let mut stress = FieldsContainer::new();
        stress.push(1, Field::scalar(Location::Nodal, "psi", vec![1, 2, 3], vec![10.0, 20.0, 30.0]).unwrap());
        let mut fx = FieldsContainer::new();
        fx.push(1, Field::scalar(Location::Elemental, "lbf", vec![500], vec![42.0]).unwrap());

        archive.analyses.push(AnalysisArchive {
            name: "Static Structural".to_string(),
            kind: AnalysisKind::Static,
            time_freq_support: TimeFreqSupport::new("s", vec![1.0]).unwrap(),
            smisc: vec![SmiscChannel { item: 1, fields: fx }],
            element_nodal_forces: None,
            displacement: None,
            velocity: None,
            von_mises_stress: Some(stress),
            contact_pressure: None,
        });
        archive.named_selection_folders.push(NamedSelectionFolder {
            name: "Results Scoping".to_string(),
            selections: vec![],
        });
        archive
    }

    fn scoping(view: &AnalysisView<'_>) -> TimeScoping {
        TimeScoping::for_analysis(view.kind(), &view.time_freq_support().unwrap(), false).unwrap()
    }

    #[test]
    fn test_von_mises_scoped_to_element_nodes() {
        let archive = sample_archive();
        let view = archive.analysis("Static Structural").unwrap();
        let stress = view.von_mises_stress(&scoping(&view), &[10]).unwrap();
        assert_eq!(stress.get(1).unwrap().ids, vec![1, 2]);
    }

    #[test]
    fn test_missing_quantities() {
        let archive = sample_archive();
        let view = archive.analysis("Static Structural").unwrap();
        let scoping = scoping(&view);
        assert_eq!(view.smisc(14, &scoping, &[500]).unwrap_err().error_code(), "MISSING_FIELD");
        assert_eq!(view.displacement(&scoping, &[1]).unwrap_err().error_code(), "MISSING_FIELD");
        assert_eq!(view.smisc(1, &scoping, &[500]).unwrap().get(1).unwrap().data, vec![42.0]);
    }

    #[test]
    fn test_contact_pressure_scoped_to_element_nodes() {
        let mut archive = sample_archive();
        let mut pressure = FieldsContainer::new();
        pressure.push(1, Field::scalar(Location::Nodal, "psi", vec![1, 2, 3], vec![0.0, 4.0, 8.0]).unwrap());
        archive.analyses[0].contact_pressure = Some(pressure);

        let view = archive.analysis("Static Structural").unwrap();
        let scoping = scoping(&view);
        let field = view.contact_pressure(&scoping, &[11]).unwrap();
        assert_eq!(field.get(1).unwrap().ids, vec![2, 3]);
        assert_eq!(field.get(1).unwrap().data, vec![4.0, 8.0]);
        assert_eq!(view.velocity(&scoping, &[1]).unwrap_err().error_code(), "MISSING_FIELD");
    }

    #[test]
    fn test_lookups() {
        let archive = sample_archive();
        assert!(archive.find_folder_by_name("Results Scoping").is_ok());
        assert_eq!(
            archive.find_folder_by_name("Missing").unwrap_err().error_code(),
            "AMBIGUOUS_LOOKUP"
        );
        assert!(archive.analysis("Modal").is_err());
    }

    #[test]
    fn test_handles() {
        let archive = sample_archive();
        let all = archive.handles(&[]).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Static Structural");
        assert_eq!(all[0].kind, AnalysisKind::Static);
        assert_eq!(all[0].source.time_freq_support().unwrap().number_sets(), 1);

        let err = archive.handles(&["Modal".to_string()]).unwrap_err();
        assert_eq!(err.error_code(), "AMBIGUOUS_LOOKUP");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_dir().join("postline_archive_roundtrip.json");
        let archive = sample_archive();
        archive.save(&path).unwrap();
        let loaded = ResultsArchive::load(&path).unwrap();
        assert_eq!(loaded, archive);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let path = temp_dir().join("postline_archive_newer.json");
        let mut archive = sample_archive();
        archive.version = "0.9.0".to_string();
        archive.save(&path).unwrap();
        let err = ResultsArchive::load(&path).unwrap_err();
        assert_eq!(err.error_code(), "VERSION_MISMATCH");
        let _ = std::fs::remove_file(&path);
    }
}
