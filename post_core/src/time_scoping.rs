//! # Time Scoping
//!
//! Selection of the result sets a pass evaluates, derived from the analysis
//! kind and the time/frequency support of the results file.
//!
//! | Analysis kind       | Sets evaluated                      |
//! |---------------------|-------------------------------------|
//! | `Spectrum` (random) | `[2]`, the 1σ response set          |
//! | `ResponseSpectrum`  | `[1]`                               |
//! | `Static`            | `1..=N`, or `[N]` with last-only    |
//! | anything else       | `1..=N`                             |
//!
//! ## Example
//!
//! ```rust
//! use post_core::time_scoping::{AnalysisKind, TimeFreqSupport, TimeScoping};
//!
//! let support = TimeFreqSupport::new("s", vec![0.5, 1.0, 1.5]).unwrap();
//! let scoping = TimeScoping::for_analysis(AnalysisKind::Static, &support, true).unwrap();
//! assert_eq!(scoping.set_ids(), vec![3]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{PostError, PostResult};

/// Analysis types known to the post-processing passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisKind {
    Static,
    Transient,
    Modal,
    Harmonic,
    /// Random vibration (PSD) analysis
    Spectrum,
    ResponseSpectrum,
}

impl AnalysisKind {
    /// Name used in output file names (`type=Static`)
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisKind::Static => "Static",
            AnalysisKind::Transient => "Transient",
            AnalysisKind::Modal => "Modal",
            AnalysisKind::Harmonic => "Harmonic",
            AnalysisKind::Spectrum => "Spectrum",
            AnalysisKind::ResponseSpectrum => "ResponseSpectrum",
        }
    }

    /// Whether results are statistical and must be scaled by the sigma level
    pub fn is_random_vibration(&self) -> bool {
        matches!(self, AnalysisKind::Spectrum)
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Time (or frequency) values of every result set in a results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeFreqSupport {
    /// Unit of the time/frequency values ("s", "Hz")
    pub unit: String,
    /// Value for set `k` stored at index `k - 1`
    pub values: Vec<f64>,
}

impl TimeFreqSupport {
    pub fn new(unit: impl Into<String>, values: Vec<f64>) -> PostResult<Self> {
        if values.is_empty() {
            return Err(PostError::invalid_input(
                "time_freq_support",
                "[]",
                "Results contain no result sets",
            ));
        }
        Ok(TimeFreqSupport {
            unit: unit.into(),
            values,
        })
    }

    /// Number of result sets
    pub fn number_sets(&self) -> usize {
        self.values.len()
    }

    /// Time value of a 1-based set id
    pub fn time_of(&self, set: usize) -> Option<f64> {
        set.checked_sub(1).and_then(|k| self.values.get(k).copied())
    }
}

/// A result set id paired with its solution time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSample {
    /// 1-based result set id
    pub set: usize,
    /// Solution time or frequency of the set
    pub time: f64,
}

/// Ordered list of result sets to evaluate. Order is preserved in every output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeScoping {
    pub unit: String,
    pub samples: Vec<TimeSample>,
}

impl TimeScoping {
    /// Build the scoping for an analysis of the given kind.
    ///
    /// # Errors
    ///
    /// [`PostError::MissingField`] when the kind requires a set the results
    /// file does not contain (a random vibration file with a single set).
    pub fn for_analysis(
        kind: AnalysisKind,
        support: &TimeFreqSupport,
        static_last_only: bool,
    ) -> PostResult<Self> {
        let n = support.number_sets();
        let ids: Vec<usize> = match kind {
            AnalysisKind::Spectrum => vec![2],
            AnalysisKind::ResponseSpectrum => vec![1],
            AnalysisKind::Static if static_last_only => vec![n],
            _ => (1..=n).collect(),
        };
        debug!(kind = %kind, sets = ?ids, "derived time scoping");
        TimeScoping::from_ids(support, &ids)
    }

    /// Build a scoping from explicit set ids.
    pub fn from_ids(support: &TimeFreqSupport, ids: &[usize]) -> PostResult<Self> {
        let samples = ids
            .iter()
            .map(|&set| {
                support
                    .time_of(set)
                    .map(|time| TimeSample { set, time })
                    .ok_or_else(|| {
                        PostError::missing_field(
                            format!("result set {}", set),
                            format!("results contain {} sets", support.number_sets()),
                        )
                    })
            })
            .collect::<PostResult<Vec<_>>>()?;
        Ok(TimeScoping {
            unit: support.unit.clone(),
            samples,
        })
    }

    pub fn set_ids(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.set).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Last evaluated sample
    pub fn last(&self) -> Option<TimeSample> {
        self.samples.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn support(n: usize) -> TimeFreqSupport {
        TimeFreqSupport::new("s", (1..=n).map(|k| k as f64 * 0.25).collect()).unwrap()
    }

    #[test]
    fn test_static_all_and_last_only() {
        let all = TimeScoping::for_analysis(AnalysisKind::Static, &support(4), false).unwrap();
        assert_eq!(all.set_ids(), vec![1, 2, 3, 4]);
        let last = TimeScoping::for_analysis(AnalysisKind::Static, &support(4), true).unwrap();
        assert_eq!(last.set_ids(), vec![4]);
        assert_eq!(last.samples[0].time, 1.0);
    }

    #[test]
    fn test_last_only_ignored_for_transient() {
        let scoping = TimeScoping::for_analysis(AnalysisKind::Transient, &support(3), true).unwrap();
        assert_eq!(scoping.set_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_spectrum_sets() {
        let rv = TimeScoping::for_analysis(AnalysisKind::Spectrum, &support(3), false).unwrap();
        assert_eq!(rv.set_ids(), vec![2]);
        let rs = TimeScoping::for_analysis(AnalysisKind::ResponseSpectrum, &support(3), false).unwrap();
        assert_eq!(rs.set_ids(), vec![1]);
    }

    #[test]
    fn test_random_vibration_needs_second_set() {
        let err = TimeScoping::for_analysis(AnalysisKind::Spectrum, &support(1), false).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");
    }

    #[test]
    fn test_empty_support_rejected() {
        assert!(TimeFreqSupport::new("s", vec![]).is_err());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(AnalysisKind::ResponseSpectrum.to_string(), "ResponseSpectrum");
        assert!(AnalysisKind::Spectrum.is_random_vibration());
        assert!(!AnalysisKind::Modal.is_random_vibration());
    }
}
