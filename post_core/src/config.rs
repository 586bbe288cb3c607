//! # Run Configuration
//!
//! Everything a run needs besides the results themselves: which analyses and
//! reports to process, output units, the named-selection folder used for
//! results scoping, and where the CSV files go.
//!
//! Stored as versioned JSON. Command-line flags override individual fields
//! after loading; [`RunConfig::validate`] is called again afterwards.
//!
//! ## Example
//!
//! ```rust
//! use post_core::config::RunConfig;
//!
//! let config: RunConfig = serde_json::from_str(r#"{
//!     "version": "0.1.0",
//!     "units": { "length": "mm", "force": "N" }
//! }"#).unwrap();
//!
//! assert_eq!(config.named_selection_folder, "Results Scoping");
//! assert_eq!(config.random_vibration_sigma, 3.0);
//! assert!(config.validate().is_ok());
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::StressConvention;
use crate::errors::{PostError, PostResult};
use crate::file_io::{read_json, validate_version, write_atomic, SCHEMA_VERSION};
use crate::time_scoping::AnalysisKind;
use crate::units::UnitSystem;

/// Default named-selection folder used for results scoping
pub const DEFAULT_SCOPING_FOLDER: &str = "Results Scoping";

/// Default sigma level applied to random vibration results
pub const DEFAULT_SIGMA: f64 = 3.0;

/// A CSV report produced by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Report {
    BeamStress,
    JointReactions,
    BeamProbes,
    BoltSummary,
    SurfaceReactions,
    MaxEquivalentStress,
    MaxTotalDeformation,
    MaxDirectionalDeformation,
    MaxDirectionalVelocity,
    ContactPressure,
}

impl Report {
    /// Reports written when the configuration selects none
    pub const STANDARD: [Report; 7] = [
        Report::BeamStress,
        Report::JointReactions,
        Report::BeamProbes,
        Report::BoltSummary,
        Report::SurfaceReactions,
        Report::MaxEquivalentStress,
        Report::MaxTotalDeformation,
    ];

    pub const ALL: [Report; 10] = [
        Report::BeamStress,
        Report::JointReactions,
        Report::BeamProbes,
        Report::BoltSummary,
        Report::SurfaceReactions,
        Report::MaxEquivalentStress,
        Report::MaxTotalDeformation,
        Report::MaxDirectionalDeformation,
        Report::MaxDirectionalVelocity,
        Report::ContactPressure,
    ];

    /// Report name used in the CSV file name
    pub fn file_stem(&self) -> &'static str {
        match self {
            Report::BeamStress => "Beam_Stress_Resultants",
            Report::JointReactions => "Joint_Reactions",
            Report::BeamProbes => "Beam_Probe_Results_All_Times",
            Report::BoltSummary => "Bolt_Results",
            Report::SurfaceReactions => "Surface_Reaction_Forces",
            Report::MaxEquivalentStress => "Max_Eqv_Stress",
            Report::MaxTotalDeformation => "Max_Total_Displacement",
            Report::MaxDirectionalDeformation => "Max_Directional_Deformation",
            Report::MaxDirectionalVelocity => "Max_Directional_Velocity",
            Report::ContactPressure => "Contact_Pressure",
        }
    }

    /// Whether the file name carries the `type=` segment
    pub fn names_analysis_kind(&self) -> bool {
        !matches!(self, Report::BeamProbes | Report::BoltSummary)
    }
}

/// Prestress analysis and the linear dynamics analyses that use it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrestressConfig {
    pub base: String,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub version: String,

    /// Analyses to process by name; empty means every analysis in the archive
    #[serde(default)]
    pub analyses: Vec<String>,

    /// Reports to write; empty means [`Report::STANDARD`]
    #[serde(default)]
    pub reports: Vec<Report>,

    /// Output length and force units
    #[serde(default)]
    pub units: UnitSystem,

    #[serde(default = "default_folder")]
    pub named_selection_folder: String,

    /// Coordinate system whose origin is the moment summation point and
    /// in which contact node coordinates are reported
    #[serde(default)]
    pub coordinate_system: Option<String>,

    /// Contact regions for the contact pressure report; empty means all
    #[serde(default)]
    pub contacts: Vec<String>,

    #[serde(default = "default_sigma")]
    pub random_vibration_sigma: f64,

    /// Evaluate only the last result set of static analyses
    #[serde(default)]
    pub static_last_time_only: bool,

    #[serde(default)]
    pub convention: StressConvention,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Mean/alternating stress summary, written when present
    #[serde(default)]
    pub prestress: Option<PrestressConfig>,
}

fn default_folder() -> String {
    DEFAULT_SCOPING_FOLDER.to_string()
}

fn default_sigma() -> f64 {
    DEFAULT_SIGMA
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            version: SCHEMA_VERSION.to_string(),
            analyses: Vec::new(),
            reports: Vec::new(),
            units: UnitSystem::default(),
            named_selection_folder: default_folder(),
            coordinate_system: None,
            contacts: Vec::new(),
            random_vibration_sigma: DEFAULT_SIGMA,
            static_last_time_only: false,
            convention: StressConvention::default(),
            output_dir: default_output_dir(),
            prestress: None,
        }
    }
}

impl RunConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> PostResult<Self> {
        let config: RunConfig = read_json(path)?;
        validate_version(&config.version)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded run configuration");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> PostResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())
    }

    pub fn validate(&self) -> PostResult<()> {
        self.units.validate()?;
        if !self.random_vibration_sigma.is_finite() || self.random_vibration_sigma <= 0.0 {
            return Err(PostError::invalid_input(
                "random_vibration_sigma",
                self.random_vibration_sigma.to_string(),
                "Sigma level must be positive",
            ));
        }
        if self.named_selection_folder.trim().is_empty() {
            return Err(PostError::invalid_input(
                "named_selection_folder",
                "",
                "Folder name cannot be empty",
            ));
        }
        if let Some(prestress) = &self.prestress {
            if prestress.children.iter().any(|c| c == &prestress.base) {
                return Err(PostError::invalid_input(
                    "prestress.children",
                    prestress.base.clone(),
                    "The prestress analysis cannot be its own child",
                ));
            }
        }
        Ok(())
    }

    /// Reports selected for the run, in a fixed order
    pub fn selected_reports(&self) -> Vec<Report> {
        if self.reports.is_empty() {
            return Report::STANDARD.to_vec();
        }
        let mut reports = self.reports.clone();
        reports.sort();
        reports.dedup();
        reports
    }

    /// Scale applied to peak values: sigma for random vibration, 1 otherwise.
    pub fn result_scale(&self, kind: AnalysisKind) -> f64 {
        if kind.is_random_vibration() {
            self.random_vibration_sigma
        } else {
            1.0
        }
    }

    /// Scale applied to element nodal forces to turn them into reactions.
    pub fn reaction_scale(&self, kind: AnalysisKind) -> f64 {
        -self.result_scale(kind)
    }
}
