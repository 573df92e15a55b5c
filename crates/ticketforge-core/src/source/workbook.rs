use calamine::{Data, Range, Reader, open_workbook_auto};
use std::path::{Path, PathBuf};

use super::{CellValue, TabularSource, sheet_not_found};
use crate::error::{Result, TicketError};

struct Sheet {
    name: String,
    values: Range<Data>,
    formulas: Option<Range<String>>,
}

/// A spreadsheet file (xlsx, xlsm, xls or ods) loaded into memory.
///
/// Every sheet is read when the workbook is opened, so later lookups cannot
/// fail on I/O.
pub struct Workbook {
    path: PathBuf,
    sheets: Vec<Sheet>,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("path", &self.path)
            .field("sheets", &self.sheets.iter().map(|s| &s.name).collect::<Vec<_>>())
            .finish()
    }
}

impl Workbook {
    /// Open and fully read the spreadsheet at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::SourceRead`] when the file cannot be opened or
    /// a sheet cannot be decoded.
    pub fn open(path: &Path) -> Result<Self> {
        let read_error = |e: calamine::Error| TicketError::SourceRead(format!("{}: {e}", path.display()));
        let mut workbook = open_workbook_auto(path).map_err(read_error)?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let values = workbook.worksheet_range(&name).map_err(read_error)?;
            let formulas = match workbook.worksheet_formula(&name) {
                Ok(range) => Some(range),
                Err(err) => {
                    tracing::debug!(sheet = %name, error = %err, "formulas unavailable");
                    None
                }
            };
            sheets.push(Sheet {
                name,
                values,
                formulas,
            });
        }
        tracing::debug!(path = %path.display(), sheets = sheets.len(), "opened workbook");

        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| sheet_not_found(name))
    }
}

fn convert(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        #[allow(clippy::cast_precision_loss)]
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map_or(CellValue::Number(dt.as_f64()), CellValue::Date),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

impl TabularSource for Workbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn dimensions(&self, sheet: &str) -> Result<(u32, u32)> {
        let sheet = self.sheet(sheet)?;
        Ok(sheet
            .values
            .end()
            .map_or((0, 0), |(row, col)| (row + 1, col + 1)))
    }

    fn cell(&self, sheet: &str, column: u32, row: u32) -> Result<CellValue> {
        let sheet = self.sheet(sheet)?;
        let (Some(r), Some(c)) = (row.checked_sub(1), column.checked_sub(1)) else {
            return Ok(CellValue::Empty);
        };
        let value = sheet
            .values
            .get_value((r, c))
            .map_or(CellValue::Empty, convert);
        let formula = sheet
            .formulas
            .as_ref()
            .and_then(|f| f.get_value((r, c)))
            .filter(|f| !f.is_empty());
        Ok(match formula {
            Some(formula) => CellValue::Formula {
                formula: formula.clone(),
                result: Box::new(value),
            },
            None => value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Workbook::open(&dir.path().join("absent.xlsx")).expect_err("must fail");
        assert!(matches!(err, TicketError::SourceRead(_)));
    }

    #[test]
    fn garbage_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fake.xlsx");
        std::fs::write(&path, b"not a zip archive").expect("write");
        assert!(matches!(
            Workbook::open(&path),
            Err(TicketError::SourceRead(_))
        ));
    }

    #[test]
    fn calamine_values_map_to_cells() {
        assert_eq!(convert(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(convert(&Data::Empty), CellValue::Empty);
        assert_eq!(
            convert(&Data::String("Login".into())),
            CellValue::Text("Login".into())
        );
        assert_eq!(convert(&Data::Bool(true)), CellValue::Bool(true));
    }
}
