//! # Postline CLI Application
//!
//! Batch front end for `post_core`: loads a results archive and an optional
//! run configuration, applies command-line overrides and writes the selected
//! CSV reports.
//!
//! ```text
//! postline --archive model.json --config run.json all
//! postline --archive model.json --length-unit mm --force-unit N joint-reactions
//! postline --archive model.json mean-alternating --base "Static Structural" --child "Random Vibration"
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (e.g. `RUST_LOG=post_core=debug`).

use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use post_core::calculations::StressConvention;
use post_core::config::PrestressConfig;
use post_core::{pipeline, PostError, PostResult, Report, ResultsArchive, RunConfig, RunSummary};
use tracing::info;

/// Post-process finite-element results archives into CSV reports
#[derive(Parser)]
#[command(name = "postline", version)]
struct Cli {
    /// Results archive (JSON)
    #[arg(long, short)]
    archive: PathBuf,

    /// Run configuration (JSON); defaults are used when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Output length unit (in, mm, m, ...)
    #[arg(long)]
    length_unit: Option<String>,

    /// Output force unit (lbf, N, kN, ...)
    #[arg(long)]
    force_unit: Option<String>,

    /// Directory for the CSV files
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// Analysis to process; repeat for several
    #[arg(long = "analysis")]
    analyses: Vec<String>,

    /// Named-selection folder used for results scoping
    #[arg(long)]
    folder: Option<String>,

    /// Coordinate system whose origin is the moment summation point
    #[arg(long)]
    coordinate_system: Option<String>,

    /// Sigma level for random vibration results
    #[arg(long)]
    sigma: Option<f64>,

    /// Evaluate only the last set of static analyses
    #[arg(long)]
    static_last_only: bool,

    /// Equivalent stress convention for beam stress resultants
    #[arg(long, value_enum)]
    convention: Option<ConventionArg>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum ConventionArg {
    VonMises,
    Mohr,
}

impl From<ConventionArg> for StressConvention {
    fn from(arg: ConventionArg) -> Self {
        match arg {
            ConventionArg::VonMises => StressConvention::VonMisesCombined,
            ConventionArg::Mohr => StressConvention::MohrPrincipal,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Reports selected by the configuration, the standard set when it selects none
    All,
    /// Beam stress resultants with governing end
    BeamStress,
    /// MPC184 joint reaction forces and moments
    JointReactions,
    /// Beam probe table for every beam connection
    BeamProbes,
    /// Bolt summary with transverse shear stress
    BoltSummary,
    /// Summed reactions over each named selection
    SurfaceReactions,
    /// Max equivalent stress per named selection
    MaxStress,
    /// Max total deformation per named selection
    MaxDeformation,
    /// Max X, Y and Z deformation over time per named selection
    MaxDirectionalDeformation,
    /// Max X, Y and Z velocity over time per named selection
    MaxDirectionalVelocity,
    /// Nodal contact pressure with node coordinates
    ContactPressure {
        /// Contact region name; repeat for several (default: every region)
        #[arg(long = "contact")]
        contacts: Vec<String>,
    },
    /// Mean stress of a prestress analysis and alternating stress of its children
    MeanAlternating {
        /// Prestress analysis (overrides the configuration)
        #[arg(long)]
        base: Option<String>,
        /// Child analysis; repeat for several
        #[arg(long = "child")]
        children: Vec<String>,
    },
}

impl Command {
    fn report(&self) -> Option<Report> {
        match self {
            Command::BeamStress => Some(Report::BeamStress),
            Command::JointReactions => Some(Report::JointReactions),
            Command::BeamProbes => Some(Report::BeamProbes),
            Command::BoltSummary => Some(Report::BoltSummary),
            Command::SurfaceReactions => Some(Report::SurfaceReactions),
            Command::MaxStress => Some(Report::MaxEquivalentStress),
            Command::MaxDeformation => Some(Report::MaxTotalDeformation),
            Command::MaxDirectionalDeformation => Some(Report::MaxDirectionalDeformation),
            Command::MaxDirectionalVelocity => Some(Report::MaxDirectionalVelocity),
            Command::ContactPressure { .. } => Some(Report::ContactPressure),
            Command::All | Command::MeanAlternating { .. } => None,
        }
    }
}

/// Configuration file (or defaults) with command-line overrides applied.
fn resolve_config(cli: &Cli) -> PostResult<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(length) = &cli.length_unit {
        config.units.length = length.clone();
    }
    if let Some(force) = &cli.force_unit {
        config.units.force = force.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if !cli.analyses.is_empty() {
        config.analyses = cli.analyses.clone();
    }
    if let Some(folder) = &cli.folder {
        config.named_selection_folder = folder.clone();
    }
    if let Some(cs) = &cli.coordinate_system {
        config.coordinate_system = Some(cs.clone());
    }
    if let Some(sigma) = cli.sigma {
        config.random_vibration_sigma = sigma;
    }
    if cli.static_last_only {
        config.static_last_time_only = true;
    }
    if let Some(convention) = cli.convention {
        config.convention = convention.into();
    }
    if let Command::ContactPressure { contacts } = &cli.command {
        if !contacts.is_empty() {
            config.contacts = contacts.clone();
        }
    }
    config.validate()?;
    Ok(config)
}

fn execute(cli: &Cli) -> PostResult<RunSummary> {
    let mut config = resolve_config(cli)?;
    let archive = ResultsArchive::load(&cli.archive)?;
    let handles = archive.handles(&[])?;
    let date = Local::now().date_naive();
    info!(archive = %cli.archive.display(), analyses = handles.len(), "loaded archive");

    match &cli.command {
        Command::All => pipeline::run(&archive, &handles, &config, date),
        Command::MeanAlternating { base, children } => {
            let prestress = match (base, config.prestress.take()) {
                (Some(base), _) => PrestressConfig {
                    base: base.clone(),
                    children: children.clone(),
                },
                (None, Some(mut configured)) => {
                    if !children.is_empty() {
                        configured.children = children.clone();
                    }
                    configured
                }
                (None, None) => {
                    return Err(PostError::invalid_input(
                        "base",
                        "",
                        "No prestress analysis given on the command line or in the configuration",
                    ))
                }
            };
            config.prestress = Some(prestress.clone());
            config.validate()?;
            pipeline::run_mean_alternating(&archive, &handles, &prestress, &config, date)
        }
        command => {
            config.reports = command.report().into_iter().collect();
            config.prestress = None;
            pipeline::run(&archive, &handles, &config, date)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match execute(&cli) {
        Ok(summary) => {
            if cli.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                for path in &summary.written {
                    println!("Open File: \"{}\"", path.display());
                }
                if !summary.skipped.is_empty() {
                    eprintln!(
                        "{} record(s) skipped; run with RUST_LOG=warn for details",
                        summary.skipped.len()
                    );
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            std::process::exit(1);
        }
    }
}
