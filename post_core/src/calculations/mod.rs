//! # Post-Processing Calculations
//!
//! Each calculation module follows the same layout:
//!
//! - a pure function computing one record from already-extracted values
//!   (`compute_resultants`, `resolve_reaction`, ...), with no I/O
//! - a batch pass that reads fields through a
//!   [`ResultSource`](crate::results::ResultSource), calls the pure function
//!   per (entity, set) and collects records in scoping order
//!
//! Batch passes never zero-fill. A record whose inputs are incomplete is
//! reported in the pass's `skipped` list and the pass carries on; any other
//! error aborts the pass.
//!
//! ## Available Calculations
//!
//! - [`stress_resultant`] - Beam stress resultants with governing-end selection
//! - [`joint_reaction`] - MPC184 joint reaction forces and moments
//! - [`beam_probe`] - Beam probe table for beam connections
//! - [`surface_reaction`] - Summed reactions over named selections
//! - [`peak_values`] - Max equivalent stress, max deformation, directional maxima over time,
//!   mean/alternating stress
//! - [`contact_pressure`] - Nodal contact pressure with node coordinates

pub mod beam_probe;
pub mod contact_pressure;
pub mod joint_reaction;
pub mod peak_values;
pub mod stress_resultant;
pub mod surface_reaction;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{PostError, PostResult};
use crate::fields::FieldsContainer;
use crate::results::ResultSource;
use crate::time_scoping::TimeScoping;

pub use beam_probe::{BeamProbeRecord, BoltSummaryRecord};
pub use contact_pressure::ContactPressureRecord;
pub use joint_reaction::JointReaction;
pub use peak_values::{MeanAlternatingRecord, PeakValue};
pub use stress_resultant::{EndLabel, StressConvention, StressResultant};
pub use surface_reaction::SurfaceReaction;

/// A record a batch pass could not compute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Element, joint or named-selection id
    pub entity_id: u32,
    pub name: String,
    /// Result set, when the failure is specific to one set
    pub set: Option<usize>,
    pub reason: PostError,
}

impl SkippedRecord {
    pub(crate) fn new(entity_id: u32, name: &str, set: Option<usize>, reason: PostError) -> Self {
        warn!(
            entity = entity_id,
            name,
            set = ?set,
            code = reason.error_code(),
            "skipping record: {}",
            reason
        );
        SkippedRecord {
            entity_id,
            name: name.to_string(),
            set,
            reason,
        }
    }
}

/// Records of a batch pass plus the records it had to skip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassOutput<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRecord>,
}

impl<T> Default for PassOutput<T> {
    fn default() -> Self {
        PassOutput {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// SMISC channels read for a set of elements, keyed by item number.
///
/// A channel the results file does not contain is kept as a per-channel
/// error so that each affected record can report it.
pub(crate) struct ChannelReader {
    channels: BTreeMap<u32, Result<FieldsContainer, PostError>>,
}

impl ChannelReader {
    pub(crate) fn read<S>(
        source: &S,
        items: &[u32],
        scoping: &TimeScoping,
        element_ids: &[u32],
    ) -> PostResult<Self>
    where
        S: ResultSource + ?Sized,
    {
        let mut channels = BTreeMap::new();
        for &item in items {
            let entry = match source.smisc(item, scoping, element_ids) {
                Ok(fc) => Ok(fc),
                Err(e) if e.is_record_local() => Err(e),
                Err(e) => return Err(e),
            };
            channels.insert(item, entry);
        }
        Ok(ChannelReader { channels })
    }

    /// Value of `item` for `element` at result set `set`
    pub(crate) fn value(&self, item: u32, set: usize, element: u32) -> PostResult<f64> {
        let fc = match self.channels.get(&item) {
            Some(Ok(fc)) => fc,
            Some(Err(e)) => return Err(e.clone()),
            None => {
                return Err(PostError::missing_field(
                    format!("SMISC {}", item),
                    "channel was not requested",
                ))
            }
        };
        fc.get(set)
            .and_then(|field| field.scalar_at(element))
            .ok_or_else(|| {
                PostError::missing_field(
                    format!("SMISC {}", item),
                    format!("element {} set {}", element, set),
                )
            })
    }

    /// Like [`value`](Self::value) but a missing value reads as `None`.
    pub(crate) fn optional(&self, item: u32, set: usize, element: u32) -> Option<f64> {
        self.value(item, set, element).ok()
    }
}
