use super::{CellValue, TabularSource, sheet_not_found};
use crate::error::Result;

/// In-memory grid of cells, one `Vec` of rows per sheet.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sheets: Vec<(String, Vec<Vec<CellValue>>)>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet; `rows[0]` is row 1.
    #[must_use]
    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        self.sheets.push((name.into(), rows));
        self
    }

    fn rows(&self, sheet: &str) -> Result<&[Vec<CellValue>]> {
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, rows)| rows.as_slice())
            .ok_or_else(|| sheet_not_found(sheet))
    }
}

impl TabularSource for MemorySource {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn dimensions(&self, sheet: &str) -> Result<(u32, u32)> {
        let rows = self.rows(sheet)?;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Ok((
            u32::try_from(rows.len()).unwrap_or(u32::MAX),
            u32::try_from(width).unwrap_or(u32::MAX),
        ))
    }

    fn cell(&self, sheet: &str, column: u32, row: u32) -> Result<CellValue> {
        let rows = self.rows(sheet)?;
        let value = row
            .checked_sub(1)
            .zip(column.checked_sub(1))
            .and_then(|(r, c)| rows.get(r as usize)?.get(c as usize))
            .cloned()
            .unwrap_or(CellValue::Empty);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_outside_the_grid_are_empty() {
        let source = MemorySource::new().with_sheet("S", vec![vec!["a".into()]]);
        assert_eq!(source.cell("S", 1, 1).expect("cell"), CellValue::Text("a".into()));
        assert_eq!(source.cell("S", 2, 1).expect("cell"), CellValue::Empty);
        assert_eq!(source.cell("S", 1, 0).expect("cell"), CellValue::Empty);
        assert_eq!(source.dimensions("S").expect("dims"), (1, 1));
        assert!(source.cell("T", 1, 1).is_err());
        assert_eq!(source.sheet_names(), vec!["S".to_string()]);
    }
}
