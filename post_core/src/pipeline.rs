//! # Pipeline
//!
//! Drives the calculation passes for each analysis and writes one CSV per
//! report:
//!
//! 1. Derive the time scoping from the analysis kind
//! 2. Resolve beams, joints, the scoping folder and the summation point
//!    through the [`ModelTree`]
//! 3. Run the selected passes
//! 4. Convert records to output units and write the tables
//!
//! A record-level failure is logged and the record left out of its table.
//! Any other error aborts the run; files written before it stay on disk.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calculations::beam_probe::{beam_probe_table, bolt_summaries, BeamProbeRecord, BoltSummaryRecord};
use crate::calculations::contact_pressure::{contact_pressures, ContactPressureRecord, LocalFrame};
use crate::calculations::joint_reaction::{joint_reactions, JointReactionRecord};
use crate::calculations::peak_values::{
    max_directional_over_time, max_equivalent_stress, max_total_deformation, mean_alternating_summary,
    ChildAnalysis, DirectionalPeakRecord, DirectionalQuantity, MeanAlternatingSummary, PeakValueRecord,
};
use crate::calculations::stress_resultant::{compute_element_series, ElementStressRecord, PrincipalStresses};
use crate::calculations::surface_reaction::{surface_reactions, SurfaceReactionRecord};
use crate::calculations::SkippedRecord;
use crate::config::{PrestressConfig, Report, RunConfig};
use crate::errors::{PostError, PostResult};
use crate::export::{csv_file_name, date_stamp, header, write_table, Cell, Table};
use crate::fields::Axis;
use crate::model::{find_unique, ContactRegion, ModelTree};
use crate::results::AnalysisHandle;
use crate::time_scoping::TimeScoping;
use crate::units::UnitSystem;

// ============================================================================
// Units
// ============================================================================

/// Multipliers from model units to output units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputFactors {
    pub length: f64,
    pub force: f64,
    pub moment: f64,
    pub stress: f64,
    pub area: f64,
    pub inertia: f64,
    pub stiffness: f64,
}

impl OutputFactors {
    pub fn between(model: &UnitSystem, output: &UnitSystem) -> PostResult<Self> {
        Ok(OutputFactors {
            length: model.length_unit()?.factor_to(&output.length_unit()?)?,
            force: model.force_unit()?.factor_to(&output.force_unit()?)?,
            moment: model.moment_unit()?.factor_to(&output.moment_unit()?)?,
            stress: model.stress_unit()?.factor_to(&output.stress_unit()?)?,
            area: model.area_unit()?.factor_to(&output.area_unit()?)?,
            inertia: model.inertia_unit()?.factor_to(&output.inertia_unit()?)?,
            stiffness: model.stiffness_unit()?.factor_to(&output.stiffness_unit()?)?,
        })
    }

    pub fn identity() -> Self {
        OutputFactors {
            length: 1.0,
            force: 1.0,
            moment: 1.0,
            stress: 1.0,
            area: 1.0,
            inertia: 1.0,
            stiffness: 1.0,
        }
    }
}

/// Output units, their column labels and the model-to-output factors.
#[derive(Debug, Clone, PartialEq)]
pub struct TableUnits {
    pub output: UnitSystem,
    /// Time or frequency unit of the result sets
    pub time: String,
    pub factors: OutputFactors,
}

impl TableUnits {
    pub fn new(model: &UnitSystem, output: &UnitSystem, time: impl Into<String>) -> PostResult<Self> {
        Ok(TableUnits {
            output: output.clone(),
            time: time.into(),
            factors: OutputFactors::between(model, output)?,
        })
    }

    fn time_col(&self, name: &str) -> String {
        header(name, &self.time)
    }

    fn length_col(&self, name: &str) -> String {
        header(name, &self.output.length)
    }

    fn force_col(&self, name: &str) -> String {
        header(name, &self.output.force)
    }

    fn moment_col(&self, name: &str) -> String {
        header(name, &self.output.moment_symbol())
    }

    fn stress_col(&self, name: &str) -> String {
        header(name, &self.output.stress_symbol())
    }
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Tables
// ============================================================================

pub fn beam_stress_table(records: &[ElementStressRecord], units: &TableUnits) -> PostResult<Table> {
    let f = &units.factors;
    let mut cols = headers(&["Beam Connection Name", "Beam Connection ID", "Beam Element ID"]);
    cols.extend([
        units.time_col("Time"),
        "Set".to_string(),
        "Governing End".to_string(),
        units.force_col("Axial Force"),
        units.force_col("Shear Force"),
        units.moment_col("Torque"),
        units.moment_col("Bending Moment"),
        units.stress_col("Direct Stress"),
        units.stress_col("Bending Stress"),
        units.stress_col("Torsional Stress"),
        units.stress_col("Combined Stress"),
        units.stress_col("Equivalent Stress"),
        units.stress_col("Transverse Shear Stress"),
        units.stress_col("Maximum Shear Stress"),
        units.stress_col("Principal Stress 1"),
        units.stress_col("Principal Stress 2"),
    ]);
    let mut table = Table::new(cols);
    for record in records {
        let r = &record.resultant;
        let principal = |pick: fn(&PrincipalStresses) -> f64| {
            Cell::maybe(r.principal.as_ref().map(|p| pick(p) * f.stress))
        };
        table.push_row(vec![
            Cell::text(record.name.as_str()),
            record.connection_id.into(),
            record.element_id.into(),
            record.time.into(),
            record.set.into(),
            Cell::text(r.governing_end.to_string()),
            Cell::Float(r.axial_force * f.force),
            Cell::maybe(r.shear_force.map(|v| v * f.force)),
            Cell::Float(r.torque * f.moment),
            Cell::Float(r.bending_moment * f.moment),
            Cell::Float(r.direct_stress * f.stress),
            Cell::Float(r.bending_stress * f.stress),
            Cell::Float(r.torsional_stress * f.stress),
            Cell::Float(r.combined_stress * f.stress),
            Cell::Float(r.equivalent_stress * f.stress),
            principal(|p| p.transverse_shear),
            principal(|p| p.max_shear),
            principal(|p| p.sigma_1),
            principal(|p| p.sigma_2),
        ])?;
    }
    Ok(table)
}

pub fn joint_reaction_table(records: &[JointReactionRecord], units: &TableUnits) -> PostResult<Table> {
    let f = &units.factors;
    let mut cols = headers(&[
        "Joint Connection Name",
        "Joint Type",
        "Joint Element ID",
        "Joint Connection ID",
    ]);
    cols.extend([
        units.time_col("Time"),
        "Set".to_string(),
        units.force_col("FX"),
        units.force_col("FY"),
        units.force_col("FZ"),
        units.moment_col("MX"),
        units.moment_col("MY"),
        units.moment_col("MZ"),
    ]);
    let mut table = Table::new(cols);
    for record in records {
        let reaction = &record.reaction;
        let mut row = vec![
            Cell::text(record.name.as_str()),
            Cell::text(record.joint_type.as_str()),
            record.element_id.into(),
            record.connection_id.into(),
            record.time.into(),
            record.set.into(),
        ];
        row.extend(reaction.forces().iter().map(|v| Cell::Float(v * f.force)));
        row.extend(reaction.moments().iter().map(|v| Cell::Float(v * f.moment)));
        table.push_row(row)?;
    }
    Ok(table)
}

pub fn beam_probe_csv(records: &[BeamProbeRecord], units: &TableUnits) -> PostResult<Table> {
    let f = &units.factors;
    let out = &units.output;
    let mut cols = headers(&["Beam Connection Name", "Beam Element ID", "Material"]);
    cols.extend([
        units.length_col("Diameter"),
        units.length_col("Length"),
        header("Cross-Sectional Area", &out.area_symbol()),
        header("Moment of Inertia", &out.inertia_symbol()),
        header("Polar Moment of Inertia", &out.inertia_symbol()),
        header("Stiffness", &out.stiffness_symbol()),
        units.time_col("Time"),
        "Set".to_string(),
        units.force_col("Axial Force"),
        units.force_col("Shear Force"),
        units.moment_col("Torque"),
        units.moment_col("Bending Moment"),
        units.stress_col("Equivalent Stress"),
        units.stress_col("Direct Stress"),
        units.stress_col("Bending Stress"),
        units.stress_col("Combined Stress"),
        units.stress_col("Torsional Stress"),
    ]);
    let mut table = Table::new(cols);
    for record in records {
        let s = &record.section;
        let v = &record.values;
        table.push_row(vec![
            Cell::text(record.name.as_str()),
            record.element_id.into(),
            Cell::text(record.material.as_str()),
            Cell::Float(s.diameter * f.length),
            Cell::Float(s.length * f.length),
            Cell::Float(s.area * f.area),
            Cell::Float(s.moment_of_inertia * f.inertia),
            Cell::Float(s.polar_moment_of_inertia * f.inertia),
            Cell::Float(s.stiffness * f.stiffness),
            record.time.into(),
            record.set.into(),
            Cell::Float(v.axial_force * f.force),
            Cell::Float(v.shear_force * f.force),
            Cell::Float(v.torque * f.moment),
            Cell::Float(v.bending_moment * f.moment),
            Cell::Float(v.equivalent_stress * f.stress),
            Cell::Float(v.direct_stress * f.stress),
            Cell::Float(v.bending_stress * f.stress),
            Cell::Float(v.combined_stress * f.stress),
            Cell::Float(v.torsional_stress * f.stress),
        ])?;
    }
    Ok(table)
}

pub fn bolt_summary_table(records: &[BoltSummaryRecord], units: &TableUnits) -> PostResult<Table> {
    let f = &units.factors;
    let mut cols = headers(&["Beam Connection Name", "Beam Element ID"]);
    cols.extend([
        units.time_col("Time"),
        "Set".to_string(),
        units.force_col("Axial Force"),
        units.moment_col("Torque"),
        units.force_col("Maximum Shear Force"),
        units.moment_col("Maximum Bending Moment"),
        units.stress_col("Axial Stress"),
        units.stress_col("Maximum Bending Stress"),
        units.stress_col("Torsional Stress"),
        units.stress_col("Maximum Shear Stress"),
        units.stress_col("Maximum Equivalent Stress"),
    ]);
    let mut table = Table::new(cols);
    for record in records {
        let v = &record.values;
        table.push_row(vec![
            Cell::text(record.name.as_str()),
            record.element_id.into(),
            record.time.into(),
            record.set.into(),
            Cell::Float(v.axial_force * f.force),
            Cell::Float(v.torque * f.moment),
            Cell::Float(v.shear_force * f.force),
            Cell::Float(v.bending_moment * f.moment),
            Cell::Float(v.axial_stress * f.stress),
            Cell::Float(v.bending_stress * f.stress),
            Cell::Float(v.torsional_stress * f.stress),
            Cell::Float(v.shear_stress * f.stress),
            Cell::Float(v.equivalent_stress * f.stress),
        ])?;
    }
    Ok(table)
}

/// Surface reactions are already in output units.
pub fn surface_reaction_table(records: &[SurfaceReactionRecord], units: &TableUnits) -> PostResult<Table> {
    let mut cols = headers(&["Named Selection", "Named Selection ID", "Number of Nodes"]);
    cols.extend([
        units.time_col("Time"),
        "Set".to_string(),
        units.force_col("FX"),
        units.force_col("FY"),
        units.force_col("FZ"),
        units.force_col("F_Total"),
        units.moment_col("MX"),
        units.moment_col("MY"),
        units.moment_col("MZ"),
        units.moment_col("M_Total"),
    ]);
    let mut table = Table::new(cols);
    for record in records {
        let r = &record.reaction;
        let mut row = vec![
            Cell::text(record.name.as_str()),
            record.selection_id.into(),
            record.node_count.into(),
            record.time.into(),
            record.set.into(),
        ];
        row.extend(r.force.iter().map(|&v| Cell::Float(v)));
        row.push(Cell::Float(r.force_total));
        row.extend(r.moment.iter().map(|&v| Cell::Float(v)));
        row.push(Cell::Float(r.moment_total));
        table.push_row(row)?;
    }
    Ok(table)
}

/// Peak values are already in output units; `value_col` is the full header.
pub fn peak_value_table(
    records: &[PeakValueRecord],
    units: &TableUnits,
    value_col: String,
) -> PostResult<Table> {
    let mut cols = headers(&["Named Selection", "Named Selection ID"]);
    cols.extend([units.time_col("Time"), "Set".to_string(), value_col, "Node of Max".to_string()]);
    let mut table = Table::new(cols);
    for record in records {
        table.push_row(vec![
            Cell::text(record.name.as_str()),
            record.selection_id.into(),
            record.time.into(),
            record.set.into(),
            Cell::Float(record.peak.value),
            record.peak.entity_id.into(),
        ])?;
    }
    Ok(table)
}

/// Directional peaks are in model units; one value, node and time column
/// per axis.
pub fn directional_peak_table(
    records: &[DirectionalPeakRecord],
    units: &TableUnits,
    quantity: DirectionalQuantity,
) -> PostResult<Table> {
    let unit = match quantity {
        DirectionalQuantity::Deformation => units.output.length.clone(),
        DirectionalQuantity::Velocity => format!("{}*s^-1", units.output.length),
    };
    let mut cols = headers(&["Named Selection", "Named Selection ID"]);
    for axis in Axis::ALL {
        cols.push(header(&format!("{} Max {}", axis.label(), quantity.name()), &unit));
        cols.push(format!("{} Node of Max", axis.label()));
        cols.push(units.time_col(&format!("{} Time of Max", axis.label())));
    }
    let mut table = Table::new(cols);
    for record in records {
        let mut row = vec![Cell::text(record.name.as_str()), record.selection_id.into()];
        for axis in Axis::ALL {
            match record.axis(axis) {
                Some(p) => row.extend([
                    Cell::Float(p.peak.value * units.factors.length),
                    p.peak.entity_id.into(),
                    p.time.into(),
                ]),
                None => row.extend([Cell::Empty, Cell::Empty, Cell::Empty]),
            }
        }
        table.push_row(row)?;
    }
    Ok(table)
}

/// Contact pressure records are already in output units.
pub fn contact_pressure_table(
    records: &[ContactPressureRecord],
    units: &TableUnits,
    frame: &str,
) -> PostResult<Table> {
    let mut cols = headers(&["Contact Name", "Contact ID"]);
    cols.extend([
        units.time_col("Time"),
        "Set".to_string(),
        "Node ID".to_string(),
        units.length_col("Node X"),
        units.length_col("Node Y"),
        units.length_col("Node Z"),
        units.stress_col("Contact Pressure"),
        "Coordinate System".to_string(),
    ]);
    let mut table = Table::new(cols);
    for record in records {
        let mut row = vec![
            Cell::text(record.name.as_str()),
            record.contact_id.into(),
            record.time.into(),
            record.set.into(),
            record.node_id.into(),
        ];
        row.extend(record.position.iter().map(|&v| Cell::Float(v)));
        row.push(Cell::Float(record.pressure));
        row.push(Cell::text(frame));
        table.push_row(row)?;
    }
    Ok(table)
}

pub fn mean_alternating_table(summary: &MeanAlternatingSummary, units: &TableUnits) -> PostResult<Table> {
    let mut cols = headers(&["Named Selection", "Named Selection ID"]);
    cols.extend([
        units.time_col("Stat Str Time"),
        "Stat Str Set".to_string(),
        units.stress_col("Stat Str Max Eqv Stress"),
        "Node of Max".to_string(),
    ]);
    for child in &summary.child_names {
        cols.push(units.stress_col(&format!("{} Eqv Stress at Max SS Node", child)));
    }
    let mut table = Table::new(cols);
    for record in &summary.records {
        let mut row = vec![
            Cell::text(record.name.as_str()),
            record.selection_id.into(),
            record.static_time.into(),
            record.static_set.into(),
            Cell::Float(record.mean_stress),
            record.node.into(),
        ];
        row.extend(record.alternating.iter().map(|v| Cell::maybe(*v)));
        table.push_row(row)?;
    }
    Ok(table)
}

// ============================================================================
// Run
// ============================================================================

/// Files written by a run and the number of records left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedRecord>,
}

impl RunSummary {
    fn absorb(&mut self, report: Report, skipped: Vec<SkippedRecord>) {
        if !skipped.is_empty() {
            warn!(report = report.file_stem(), count = skipped.len(), "records skipped");
        }
        self.skipped.extend(skipped);
    }
}

/// Everything a single analysis pass needs.
struct AnalysisRun<'r, 'h, M: ?Sized> {
    model: &'r M,
    handle: &'r AnalysisHandle<'h>,
    config: &'r RunConfig,
    scoping: TimeScoping,
    units: TableUnits,
    date: NaiveDate,
}

impl<M> AnalysisRun<'_, '_, M>
where
    M: ModelTree + ?Sized,
{
    fn write(&self, report: Report, table: &Table) -> PostResult<PathBuf> {
        let kind = report.names_analysis_kind().then_some(self.handle.kind);
        let name = csv_file_name(&self.handle.name, kind, report.file_stem(), self.date);
        write_table(&self.config.output_dir, &name, table)
    }

    /// Configured coordinate system in output length units, global when
    /// none is configured
    fn report_frame(&self) -> PostResult<LocalFrame> {
        match &self.config.coordinate_system {
            Some(name) => {
                let cs = self.model.find_coordinate_system(name)?;
                Ok(LocalFrame::from_coordinate_system(&cs, self.units.factors.length))
            }
            None => Ok(LocalFrame::global()),
        }
    }

    /// Contacts named in the configuration, or every contact
    fn contacts(&self) -> PostResult<Vec<ContactRegion>> {
        let all = self.model.contacts()?;
        if self.config.contacts.is_empty() {
            return Ok(all);
        }
        self.config
            .contacts
            .iter()
            .map(|name| find_unique(&all, "contact", name, |c| c.name.as_str()).cloned())
            .collect()
    }

    fn run_report(&self, report: Report, summary: &mut RunSummary) -> PostResult<()> {
        let source = self.handle.source.as_ref();
        let table = match report {
            Report::BeamStress => {
                let beams = self.model.beam_connections()?;
                let output = compute_element_series(source, &beams, &self.scoping, self.config.convention)?;
                summary.absorb(report, output.skipped);
                beam_stress_table(&output.records, &self.units)?
            }
            Report::JointReactions => {
                let joints = self.model.joints()?;
                let output = joint_reactions(source, &joints, &self.scoping)?;
                summary.absorb(report, output.skipped);
                joint_reaction_table(&output.records, &self.units)?
            }
            Report::BeamProbes => {
                let beams = self.model.beam_connections()?;
                let output = beam_probe_table(source, self.model, &beams, &self.scoping)?;
                summary.absorb(report, output.skipped);
                beam_probe_csv(&output.records, &self.units)?
            }
            Report::BoltSummary => {
                let beams = self.model.beam_connections()?;
                let output = bolt_summaries(source, &beams, &self.scoping)?;
                summary.absorb(report, output.skipped);
                bolt_summary_table(&output.records, &self.units)?
            }
            Report::SurfaceReactions => {
                let folder = self.model.find_folder_by_name(&self.config.named_selection_folder)?;
                let output = surface_reactions(
                    source,
                    &folder,
                    self.report_frame()?.origin,
                    self.config.reaction_scale(self.handle.kind),
                    &self.scoping,
                    &self.config.units,
                )?;
                summary.absorb(report, output.skipped);
                surface_reaction_table(&output.records, &self.units)?
            }
            Report::MaxEquivalentStress => {
                let folder = self.model.find_folder_by_name(&self.config.named_selection_folder)?;
                let output = max_equivalent_stress(
                    source,
                    &folder,
                    &self.scoping,
                    &self.config.units.stress_unit()?,
                    self.config.result_scale(self.handle.kind),
                )?;
                summary.absorb(report, output.skipped);
                let col = self.units.stress_col("Max Eqv. Stress");
                peak_value_table(&output.records, &self.units, col)?
            }
            Report::MaxTotalDeformation => {
                let folder = self.model.find_folder_by_name(&self.config.named_selection_folder)?;
                let output = max_total_deformation(
                    source,
                    &folder,
                    &self.scoping,
                    &self.config.units.length_unit()?,
                    self.config.result_scale(self.handle.kind),
                )?;
                summary.absorb(report, output.skipped);
                let col = self.units.length_col("Max Total Displacement");
                peak_value_table(&output.records, &self.units, col)?
            }
            Report::MaxDirectionalDeformation | Report::MaxDirectionalVelocity => {
                let quantity = if report == Report::MaxDirectionalVelocity {
                    DirectionalQuantity::Velocity
                } else {
                    DirectionalQuantity::Deformation
                };
                let folder = self.model.find_folder_by_name(&self.config.named_selection_folder)?;
                let output = max_directional_over_time(
                    source,
                    &folder,
                    &self.scoping,
                    quantity,
                    self.config.result_scale(self.handle.kind),
                )?;
                summary.absorb(report, output.skipped);
                directional_peak_table(&output.records, &self.units, quantity)?
            }
            Report::ContactPressure => {
                let contacts = self.contacts()?;
                let frame = self.report_frame()?;
                let output = contact_pressures(
                    source,
                    &contacts,
                    &self.scoping,
                    &frame,
                    &self.config.units.stress_unit()?,
                    &self.config.units.length_unit()?,
                )?;
                summary.absorb(report, output.skipped);
                contact_pressure_table(&output.records, &self.units, &frame.name)?
            }
        };
        let path = self.write(report, &table)?;
        summary.written.push(path);
        Ok(())
    }
}

fn analysis_scoping(handle: &AnalysisHandle<'_>, config: &RunConfig) -> PostResult<TimeScoping> {
    let support = handle.source.time_freq_support()?;
    TimeScoping::for_analysis(handle.kind, &support, config.static_last_time_only)
}

/// Run the reports selected in `config` for one analysis.
pub fn run_analysis<M>(
    model: &M,
    handle: &AnalysisHandle<'_>,
    config: &RunConfig,
    date: NaiveDate,
) -> PostResult<RunSummary>
where
    M: ModelTree + ?Sized,
{
    let scoping = analysis_scoping(handle, config)?;
    let units = TableUnits::new(&model.unit_system()?, &config.units, scoping.unit.clone())?;
    info!(
        analysis = %handle.name,
        kind = %handle.kind,
        sets = scoping.len(),
        "processing analysis"
    );

    let run = AnalysisRun {
        model,
        handle,
        config,
        scoping,
        units,
        date,
    };
    let mut summary = RunSummary::default();
    for report in config.selected_reports() {
        run.run_report(report, &mut summary)?;
    }
    Ok(summary)
}

/// Write the mean/alternating stress summary for a prestress analysis and
/// its children: `Max_Eqv_stress_summary_{mm-dd-yy}.csv`.
pub fn run_mean_alternating<M>(
    model: &M,
    handles: &[AnalysisHandle<'_>],
    prestress: &PrestressConfig,
    config: &RunConfig,
    date: NaiveDate,
) -> PostResult<RunSummary>
where
    M: ModelTree + ?Sized,
{
    let base = find_unique(handles, "analysis", &prestress.base, |h| h.name.as_str())?;
    let base_support = base.source.time_freq_support()?;
    let base_scoping = TimeScoping::from_ids(&base_support, &[base_support.number_sets()])?;

    let mut children = Vec::with_capacity(prestress.children.len());
    for name in &prestress.children {
        let handle = find_unique(handles, "analysis", name, |h| h.name.as_str())?;
        children.push(ChildAnalysis {
            name: handle.name.clone(),
            source: handle.source.as_ref(),
            scoping: analysis_scoping(handle, config)?,
            scale: config.result_scale(handle.kind),
        });
    }

    let folder = model.find_folder_by_name(&config.named_selection_folder)?;
    let stress_unit = config.units.stress_unit()?;
    let result =
        mean_alternating_summary(base.source.as_ref(), &base_scoping, &folder, &children, &stress_unit)?;

    let units = TableUnits::new(&model.unit_system()?, &config.units, base_scoping.unit.clone())?;
    let table = mean_alternating_table(&result, &units)?;
    let name = format!("Max_Eqv_stress_summary_{}.csv", date_stamp(date));
    let path = write_table(&config.output_dir, &name, &table)?;

    let mut summary = RunSummary::default();
    if !result.skipped.is_empty() {
        warn!(count = result.skipped.len(), "selections skipped in mean/alternating summary");
    }
    summary.skipped = result.skipped;
    summary.written.push(path);
    Ok(summary)
}

/// Run every configured analysis, then the mean/alternating summary when a
/// prestress analysis is configured.
///
/// `handles` must cover every analysis the configuration names, including
/// prestress children that are not themselves processed.
pub fn run<M>(
    model: &M,
    handles: &[AnalysisHandle<'_>],
    config: &RunConfig,
    date: NaiveDate,
) -> PostResult<RunSummary>
where
    M: ModelTree + ?Sized,
{
    config.validate()?;
    let selected: Vec<&AnalysisHandle<'_>> = if config.analyses.is_empty() {
        handles.iter().collect()
    } else {
        config
            .analyses
            .iter()
            .map(|name| find_unique(handles, "analysis", name, |h| h.name.as_str()))
            .collect::<PostResult<Vec<_>>>()?
    };
    if selected.is_empty() && config.prestress.is_none() {
        return Err(PostError::invalid_input("analyses", "", "Nothing to process"));
    }

    let mut summary = RunSummary::default();
    for handle in selected {
        let analysis = run_analysis(model, handle, config, date)?;
        summary.written.extend(analysis.written);
        summary.skipped.extend(analysis.skipped);
    }

    if let Some(prestress) = &config.prestress {
        let mean_alt = run_mean_alternating(model, handles, prestress, config, date)?;
        summary.written.extend(mean_alt.written);
        summary.skipped.extend(mean_alt.skipped);
    }

    info!(
        files = summary.written.len(),
        skipped = summary.skipped.len(),
        output_dir = %config.output_dir.display(),
        "run complete"
    );
    Ok(summary)
}
