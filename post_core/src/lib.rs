//! # post_core - Finite-Element Results Post-Processing
//!
//! `post_core` reduces solver result fields to engineering quantities for
//! beam, joint and solid models, and exports them as CSV tables. Results and
//! model data are read through adapter traits; a versioned JSON results
//! archive implements them so every pass can run outside the host
//! application.
//!
//! ## Design Philosophy
//!
//! - **Pure calculators**: each pass is a function of its inputs, with no hidden state
//! - **No zero-filling**: a record with missing inputs is reported, never guessed
//! - **JSON-First**: archives, configuration, records and errors all serialize
//! - **Rich Errors**: structured error types with stable error codes
//!
//! ## Quick Start
//!
//! ```rust
//! use post_core::calculations::stress_resultant::compute_resultants;
//! use post_core::calculations::StressConvention;
//! use post_core::loads::{ElementEndLoad, Transverse};
//!
//! let end_i = ElementEndLoad::default()
//!     .with_axial_force(1000.0)
//!     .with_bending_moment(Transverse::Resultant { value: 200.0 })
//!     .with_torque(100.0);
//! let end_j = ElementEndLoad::default()
//!     .with_axial_force(1000.0)
//!     .with_bending_moment(Transverse::Resultant { value: 50.0 })
//!     .with_torque(100.0);
//!
//! let result = compute_resultants(0.5, &end_i, &end_j, StressConvention::VonMisesCombined).unwrap();
//! assert!((result.equivalent_stress - 3425.9).abs() < 0.1);
//! ```
//!
//! ## Modules
//!
//! - [`calculations`] - Stress resultants, joint reactions, beam probes, surface reactions, peak values
//! - [`pipeline`] - Runs the passes per analysis and writes the CSV reports
//! - [`archive`] - JSON results archive implementing the adapter traits
//! - [`results`] / [`model`] - Adapter traits for result fields and the model tree
//! - [`fields`] / [`time_scoping`] - Field containers and result-set selection
//! - [`section`] / [`loads`] - Circular sections and element end loads
//! - [`units`] - Unit parsing, conversion and derived output units
//! - [`export`] - CSV dialect, file naming and figure layout
//! - [`config`] - Run configuration
//! - [`errors`] - Structured error types
//! - [`file_io`] - Atomic writes and versioned JSON

pub mod archive;
pub mod calculations;
pub mod config;
pub mod errors;
pub mod export;
pub mod fields;
pub mod file_io;
pub mod loads;
pub mod model;
pub mod pipeline;
pub mod results;
pub mod section;
pub mod time_scoping;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use archive::ResultsArchive;
pub use config::{Report, RunConfig};
pub use errors::{PostError, PostResult};
pub use pipeline::RunSummary;
pub use units::UnitSystem;
