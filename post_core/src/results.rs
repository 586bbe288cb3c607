//! # Result Source
//!
//! The [`ResultSource`] trait is the read interface to a solver results
//! file. Every query takes an explicit time scoping and entity scoping and
//! returns one field per evaluated result set, in scoping order.
//!
//! Implementations report an absent quantity with
//! [`PostError::MissingField`](crate::errors::PostError::MissingField) and
//! any failure of the underlying query engine with
//! [`PostError::HostApiFailure`](crate::errors::PostError::HostApiFailure).

use crate::errors::PostResult;
use crate::fields::{Field, FieldsContainer};
use crate::time_scoping::{AnalysisKind, TimeFreqSupport, TimeScoping};

pub trait ResultSource {
    /// Solution times (or frequencies) of every result set
    fn time_freq_support(&self) -> PostResult<TimeFreqSupport>;

    /// Elemental scalar field of SMISC item `item` for the given elements.
    ///
    /// Values are in the model's consistent units.
    fn smisc(&self, item: u32, scoping: &TimeScoping, element_ids: &[u32]) -> PostResult<FieldsContainer>;

    /// Element nodal forces summed at nodes (nodal vector field)
    fn element_nodal_forces(&self, scoping: &TimeScoping, node_ids: &[u32]) -> PostResult<FieldsContainer>;

    /// Nodal displacement vectors
    fn displacement(&self, scoping: &TimeScoping, node_ids: &[u32]) -> PostResult<FieldsContainer>;

    /// Nodal velocity vectors
    fn velocity(&self, scoping: &TimeScoping, node_ids: &[u32]) -> PostResult<FieldsContainer>;

    /// Nodal von Mises equivalent stress on the nodes of the given elements
    fn von_mises_stress(&self, scoping: &TimeScoping, element_ids: &[u32]) -> PostResult<FieldsContainer>;

    /// Nodal contact pressure on the nodes of the given contact elements
    fn contact_pressure(&self, scoping: &TimeScoping, element_ids: &[u32]) -> PostResult<FieldsContainer>;

    /// Nodal coordinates (nodal vector field)
    fn node_coordinates(&self, node_ids: &[u32]) -> PostResult<Field>;
}

/// An analysis to post-process: its name, kind and results.
pub struct AnalysisHandle<'a> {
    pub name: String,
    pub kind: AnalysisKind,
    pub source: Box<dyn ResultSource + 'a>,
}

impl std::fmt::Debug for AnalysisHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
