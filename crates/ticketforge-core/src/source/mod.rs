//! Tabular source adapter: reads task estimates out of a worksheet.
//!
//! Rows and columns are 1-based throughout, matching what users see in a
//! spreadsheet application.

mod column;
mod memory;
mod workbook;

pub use column::{MAX_COLUMN, column_to_number, number_to_column};
pub use memory::MemorySource;
pub use workbook::Workbook;

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Result, TicketError, ValidationError};
use crate::model::{ProcessType, RowRejection, TaskEstimate};

/// Value of a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
    Error(String),
    /// A formula with its cached result.
    Formula {
        formula: String,
        result: Box<CellValue>,
    },
}

impl CellValue {
    /// Text content, trimmed. `None` for empty or whitespace-only cells.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            Self::Empty => return None,
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Date(d) => d.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Self::Error(e) => format!("#ERROR: {e}"),
            Self::Formula { result, .. } => return result.as_text(),
        };
        if text.is_empty() { None } else { Some(text) }
    }

    /// Numeric interpretation used for effort cells.
    ///
    /// Text is read up to its first non-numeric character (`"8h"` is 8),
    /// booleans count as 1 and 0, and anything else is 0.
    #[must_use]
    pub fn as_effort(&self) -> f64 {
        match self {
            Self::Number(n) if n.is_nan() => 0.0,
            Self::Number(n) => *n,
            Self::Text(s) => leading_number(s.trim()).unwrap_or(0.0),
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Formula { result, .. } => result.as_effort(),
            Self::Empty | Self::Date(_) | Self::Error(_) => 0.0,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Longest prefix of `text` that reads as a decimal literal: sign, digits,
/// optional fraction, then an exponent only when digits follow it.
fn leading_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let skip_digits = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let start = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = skip_digits(start);
    let mut end = int_end;
    if bytes.get(int_end) == Some(&b'.') {
        end = skip_digits(int_end + 1);
    }
    let mantissa_digits = (int_end - start) + end.saturating_sub(int_end + 1);
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_start = end + 1;
        if matches!(bytes.get(exp_start), Some(b'+' | b'-')) {
            exp_start += 1;
        }
        let exp_end = skip_digits(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}

/// Read access to a workbook-like grid of cells.
pub trait TabularSource {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Last used `(row, column)` of `sheet`; `(0, 0)` for an empty sheet.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::SheetNotFound`] for an unknown sheet.
    fn dimensions(&self, sheet: &str) -> Result<(u32, u32)>;

    /// Cell at 1-based `column`/`row`; [`CellValue::Empty`] outside the used range.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::SheetNotFound`] for an unknown sheet.
    fn cell(&self, sheet: &str, column: u32, row: u32) -> Result<CellValue>;
}

/// Where the estimates live inside a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub sheet: String,
    /// First data row.
    pub start_row: u32,
    /// Last data row; the sheet's last used row when `None`.
    pub end_row: Option<u32>,
    pub task_column: String,
    /// Column holding the group (for example a screen name). Blank cells
    /// inherit the group of the row above, so merged cells work.
    pub group_column: Option<String>,
    pub process_columns: BTreeMap<ProcessType, String>,
}

/// A row that was read but not turned into an estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub row: u32,
    pub task_name: String,
    pub reason: RowRejection,
}

/// Estimates read from a sheet plus the rows that failed validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetEstimates {
    pub tasks: Vec<TaskEstimate>,
    pub skipped: Vec<SkippedRow>,
}

/// Read task estimates from `source` according to `layout`.
///
/// Rows with a blank task name are ignored silently. Rows that fail
/// [`TaskEstimate::validate`] are logged at warn level and reported in
/// [`SheetEstimates::skipped`].
///
/// # Errors
///
/// Returns an error for an unknown sheet, a bad column reference, or a
/// layout without process columns.
pub fn read_task_estimates(source: &dyn TabularSource, layout: &SourceLayout) -> Result<SheetEstimates> {
    if layout.process_columns.is_empty() {
        return Err(ValidationError::NoProcessColumns.into());
    }
    let task_col = column_to_number(&layout.task_column)?;
    let group_col = layout
        .group_column
        .as_deref()
        .map(column_to_number)
        .transpose()?;
    let process_cols = layout
        .process_columns
        .iter()
        .map(|(&p, col)| column_to_number(col).map(|n| (p, n)))
        .collect::<Result<Vec<_>>>()?;

    let (last_row, _) = source.dimensions(&layout.sheet)?;
    let end_row = layout.end_row.unwrap_or(last_row);
    let start_row = layout.start_row.max(1);

    let mut out = SheetEstimates::default();
    let mut current_group: Option<String> = None;

    for row in start_row..=end_row {
        if let Some(col) = group_col {
            if let Some(group) = source.cell(&layout.sheet, col, row)?.as_text() {
                current_group = Some(group);
            }
        }

        let Some(task_name) = source.cell(&layout.sheet, task_col, row)?.as_text() else {
            continue;
        };

        let mut estimate = TaskEstimate::new(task_name, current_group.clone());
        for &(process, col) in &process_cols {
            let hours = source.cell(&layout.sheet, col, row)?.as_effort();
            estimate.efforts.insert(process, hours);
        }

        match estimate.validate() {
            Ok(()) => out.tasks.push(estimate),
            Err(reason) => {
                tracing::warn!(row, task = %estimate.task_name, %reason, "skipping invalid estimate row");
                out.skipped.push(SkippedRow {
                    row,
                    task_name: estimate.task_name,
                    reason,
                });
            }
        }
    }

    tracing::info!(
        sheet = %layout.sheet,
        tasks = out.tasks.len(),
        skipped = out.skipped.len(),
        "read task estimates"
    );
    Ok(out)
}

/// A non-empty header cell and the column it sits in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnLabel {
    pub column: String,
    pub header: String,
}

/// Non-empty header cells of `header_row`, left to right.
///
/// # Errors
///
/// Returns [`TicketError::SheetNotFound`] for an unknown sheet.
pub fn column_labels(source: &dyn TabularSource, sheet: &str, header_row: u32) -> Result<Vec<ColumnLabel>> {
    let (_, last_col) = source.dimensions(sheet)?;
    let mut labels = Vec::new();
    for col in 1..=last_col {
        if let Some(header) = source.cell(sheet, col, header_row)?.as_text() {
            labels.push(ColumnLabel {
                column: number_to_column(col)?,
                header,
            });
        }
    }
    Ok(labels)
}

pub(crate) fn sheet_not_found(sheet: &str) -> TicketError {
    TicketError::SheetNotFound(sheet.to_string())
}
