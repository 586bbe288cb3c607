//! # Export
//!
//! CSV tables and figure file layout.
//!
//! ## CSV dialect
//!
//! Comma delimiter, `|` as quote character, minimal quoting: a field is
//! quoted only when it contains the delimiter, the quote character, CR or
//! LF, and embedded quote characters are doubled. The first row holds the
//! column headers with their unit labels (`Axial Force [lbf]`).
//!
//! ## File names
//!
//! `"{analysis} - type={kind} - {Report}_{mm}-{dd}-{yy}.csv"`, with the
//! `type=` segment left out for reports that do not depend on the analysis
//! kind.
//!
//! ## Example
//!
//! ```rust
//! use post_core::export::{Cell, Table};
//!
//! let mut table = Table::new(vec!["Name".to_string(), "Set".to_string()]);
//! table.push_row(vec![Cell::text("Bolt, M12"), Cell::Int(1)]).unwrap();
//!
//! let mut out = Vec::new();
//! table.write_csv(&mut out).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "Name,Set\r\n|Bolt, M12|,1\r\n");
//! ```

use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{PostError, PostResult};
use crate::file_io::write_atomic;
use crate::time_scoping::AnalysisKind;

pub use crate::fields::Axis;

pub const DELIMITER: char = ',';
pub const QUOTE: char = '|';
const LINE_TERMINATOR: &str = "\r\n";

/// One CSV cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Float cell, or empty when the value is absent
    pub fn maybe(value: Option<f64>) -> Self {
        value.map(Cell::Float).unwrap_or(Cell::Empty)
    }

    fn render(&self) -> Cow<'_, str> {
        match self {
            Cell::Text(s) => quote_field(s),
            Cell::Int(v) => Cow::Owned(v.to_string()),
            Cell::Float(v) => Cow::Owned(v.to_string()),
            Cell::Empty => Cow::Borrowed(""),
        }
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Int(value as i64)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Int(i64::from(value))
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

/// Quote a field when it needs it.
pub fn quote_field(field: &str) -> Cow<'_, str> {
    let needs_quotes = field
        .chars()
        .any(|c| c == DELIMITER || c == QUOTE || c == '\r' || c == '\n');
    if !needs_quotes {
        return Cow::Borrowed(field);
    }
    let doubled = field.replace(QUOTE, "||");
    Cow::Owned(format!("{}{}{}", QUOTE, doubled, QUOTE))
}

/// Header with a unit label: `header("Axial Force", "lbf") == "Axial Force [lbf]"`
pub fn header(name: &str, unit: &str) -> String {
    format!("{} [{}]", name, unit)
}

/// A table of rows under a fixed header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row; it must have one cell per header.
    pub fn push_row(&mut self, row: Vec<Cell>) -> PostResult<()> {
        if row.len() != self.headers.len() {
            return Err(PostError::invalid_input(
                "row",
                row.len().to_string(),
                format!("Expected {} cells", self.headers.len()),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn write_line<'a, W, I>(writer: &mut W, cells: I) -> std::io::Result<()>
    where
        W: Write,
        I: IntoIterator<Item = Cow<'a, str>>,
    {
        for (k, cell) in cells.into_iter().enumerate() {
            if k > 0 {
                write!(writer, "{}", DELIMITER)?;
            }
            write!(writer, "{}", cell)?;
        }
        write!(writer, "{}", LINE_TERMINATOR)
    }

    /// Write the header row and every data row.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> PostResult<()> {
        let io_err = |e: std::io::Error| PostError::file_error("write csv", "<stream>", e.to_string());
        Self::write_line(writer, self.headers.iter().map(|h| quote_field(h))).map_err(io_err)?;
        for row in &self.rows {
            Self::write_line(writer, row.iter().map(Cell::render)).map_err(io_err)?;
        }
        Ok(())
    }

    /// Render to an in-memory CSV string.
    pub fn to_csv_string(&self) -> PostResult<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| PostError::SerializationError { reason: e.to_string() })
    }
}

/// `mm-dd-yy` date stamp
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%m-%d-%y").to_string()
}

/// CSV file name for a report.
///
/// ```rust
/// use chrono::NaiveDate;
/// use post_core::export::csv_file_name;
/// use post_core::time_scoping::AnalysisKind;
///
/// let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
/// assert_eq!(
///     csv_file_name("Static Structural", Some(AnalysisKind::Static), "Joint_Reactions", date),
///     "Static Structural - type=Static - Joint_Reactions_03-07-25.csv"
/// );
/// assert_eq!(
///     csv_file_name("Static Structural", None, "Bolt_Results", date),
///     "Static Structural - Bolt_Results_03-07-25.csv"
/// );
/// ```
pub fn csv_file_name(analysis: &str, kind: Option<AnalysisKind>, report: &str, date: NaiveDate) -> String {
    match kind {
        Some(kind) => format!("{} - type={} - {}_{}.csv", analysis, kind, report, date_stamp(date)),
        None => format!("{} - {}_{}.csv", analysis, report, date_stamp(date)),
    }
}

/// Write a table atomically into `dir`, creating the directory if needed.
pub fn write_table(dir: &Path, file_name: &str, table: &Table) -> PostResult<PathBuf> {
    fs::create_dir_all(dir)
        .map_err(|e| PostError::file_error("create directory", dir.display().to_string(), e.to_string()))?;
    let path = dir.join(file_name);
    let csv = table.to_csv_string()?;
    write_atomic(&path, csv.as_bytes())?;
    info!(path = %path.display(), rows = table.len(), "wrote csv");
    Ok(path)
}

// ============================================================================
// Figures
// ============================================================================

/// A figure attached to a result object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub name: String,
    /// Type name of the parent result, e.g. `DirectionalDeformation`
    pub result_type: String,
    /// Orientation of a directional parent result
    #[serde(default)]
    pub normal_axis: Option<Axis>,
}

/// Split a type name at capital letters: `TotalDeformation` → `Total Deformation`.
///
/// Single capitals are kept attached to the following word.
pub fn spaced_type_name(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for c in name.chars() {
        if c.is_ascii_uppercase() || words.is_empty() {
            words.push(String::new());
        }
        if let Some(word) = words.last_mut() {
            word.push(c);
        }
    }
    let mut result = String::new();
    for word in &words {
        result.push_str(word);
        if word.chars().count() > 1 {
            result.push(' ');
        }
    }
    result.trim_end().to_string()
}

/// Image directory for one figure:
/// `{root}/images/{analysis}_{mm-dd-yy}/{[X-Axis ]Result Type}/`
pub fn figure_dir(root: &Path, analysis: &str, figure: &Figure, date: NaiveDate) -> PathBuf {
    let mut subdir = spaced_type_name(&figure.result_type);
    if figure.result_type.contains("Directional") {
        let axis = figure.normal_axis.unwrap_or(Axis::Z);
        subdir = format!("{} {}", axis.label(), subdir);
    }
    root.join("images")
        .join(format!("{}_{}", analysis, date_stamp(date)))
        .join(subdir)
}

/// Renders figures to image files. Rendering belongs to the host.
pub trait FigureExporter {
    fn export_png(&mut self, figure: &Figure, path: &Path) -> PostResult<()>;
}

/// Export every figure of an analysis, returning the written paths.
pub fn export_figures<E>(
    exporter: &mut E,
    root: &Path,
    analysis: &str,
    figures: &[Figure],
    date: NaiveDate,
) -> PostResult<Vec<PathBuf>>
where
    E: FigureExporter + ?Sized,
{
    let mut written = Vec::with_capacity(figures.len());
    for figure in figures {
        let dir = figure_dir(root, analysis, figure, date);
        fs::create_dir_all(&dir)
            .map_err(|e| {
                PostError::file_error("create directory", dir.display().to_string(), e.to_string())
            })?;
        let path = dir.join(format!("{}.png", figure.name));
        exporter.export_png(figure, &path)?;
        written.push(path);
    }
    info!(analysis, figures = written.len(), "exported figures");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 5).unwrap()
    }

    #[test]
    fn test_minimal_quoting() {
        assert_eq!(quote_field("plain"), "plain");
        assert_eq!(quote_field("a,b"), "|a,b|");
        assert_eq!(quote_field("pipe|inside"), "|pipe||inside|");
        assert_eq!(quote_field("two\nlines"), "|two\nlines|");
        assert_eq!(quote_field("Axial Force [lbf]"), "Axial Force [lbf]");
    }

    #[test]
    fn test_table_rows_must_match_headers() {
        let mut table = Table::new(vec!["A".to_string(), "B".to_string()]);
        assert!(table.push_row(vec![Cell::Int(1)]).is_err());
        assert!(table.push_row(vec![Cell::Int(1), Cell::Empty]).is_ok());
        assert_eq!(table.to_csv_string().unwrap(), "A,B\r\n1,\r\n");
    }

    #[test]
    fn test_float_cells() {
        let mut table = Table::new(vec![header("Stress", "psi")]);
        table.push_row(vec![Cell::Float(3425.5)]).unwrap();
        table.push_row(vec![Cell::maybe(None)]).unwrap();
        assert_eq!(table.to_csv_string().unwrap(), "Stress [psi]\r\n3425.5\r\n\r\n");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            csv_file_name("Random Vibration", Some(AnalysisKind::Spectrum), "Max_Eqv_Stress", date()),
            "Random Vibration - type=Spectrum - Max_Eqv_Stress_11-05-24.csv"
        );
    }

    #[test]
    fn test_write_table() {
        let dir = temp_dir().join("postline_export_test");
        let mut table = Table::new(vec!["Set".to_string()]);
        table.push_row(vec![Cell::Int(1)]).unwrap();
        let path = write_table(&dir, "table.csv", &table).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Set\r\n1\r\n");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_spaced_type_name() {
        assert_eq!(spaced_type_name("TotalDeformation"), "Total Deformation");
        assert_eq!(spaced_type_name("EquivalentStress"), "Equivalent Stress");
        assert_eq!(spaced_type_name("XYPlot"), "XYPlot");
    }

    #[test]
    fn test_figure_dir_layout() {
        let root = Path::new("/user");
        let total = Figure {
            name: "Figure 1".to_string(),
            result_type: "TotalDeformation".to_string(),
            normal_axis: None,
        };
        assert_eq!(
            figure_dir(root, "Static Structural", &total, date()),
            Path::new("/user/images/Static Structural_11-05-24/Total Deformation")
        );

        let directional = Figure {
            name: "Figure 2".to_string(),
            result_type: "DirectionalDeformation".to_string(),
            normal_axis: Some(Axis::Y),
        };
        assert_eq!(
            figure_dir(root, "Modal", &directional, date()),
            Path::new("/user/images/Modal_11-05-24/Y-Axis Directional Deformation")
        );
    }

    struct Recorder(Vec<PathBuf>);

    impl FigureExporter for Recorder {
        fn export_png(&mut self, _figure: &Figure, path: &Path) -> PostResult<()> {
            self.0.push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn test_export_figures_names_files_after_figures() {
        let root = temp_dir().join("postline_figures_test");
        let figures = vec![Figure {
            name: "Bracket Stress".to_string(),
            result_type: "EquivalentStress".to_string(),
            normal_axis: None,
        }];
        let mut recorder = Recorder(Vec::new());
        let written = export_figures(&mut recorder, &root, "Static", &figures, date()).unwrap();
        assert_eq!(written, recorder.0);
        assert!(written[0].ends_with("Equivalent Stress/Bracket Stress.png"));
        let _ = fs::remove_dir_all(&root);
    }
}
