//! Row model for sqlpulse-rdbc
//!
//! The poller treats every scanned cell as raw text: semantic typing
//! (integer vs float vs string) happens later, in the transformation
//! engine. A cell is therefore `Option<String>` where `None` is SQL NULL.

use std::sync::Arc;

/// One scanned result row: shared column names plus raw textual cells.
#[derive(Debug, Clone)]
pub struct RawRow {
    columns: Arc<[String]>,
    cells: Vec<Option<String>>,
}

impl RawRow {
    /// Create a new row. Column and cell counts must match.
    pub fn new(columns: Arc<[String]>, cells: Vec<Option<String>>) -> Self {
        debug_assert_eq!(columns.len(), cells.len());
        Self { columns, cells }
    }

    /// Get cell count
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if row has no cells
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Get column names
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get all cells
    #[inline]
    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }

    /// Get cell by column index
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Option<String>> {
        self.cells.get(idx)
    }

    /// Get cell by column name (case-insensitive, first match)
    pub fn get_by_name(&self, name: &str) -> Option<&Option<String>> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.cells.get(idx))
    }

    /// Consume the row, returning its cells
    pub fn into_cells(self) -> Vec<Option<String>> {
        self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RawRow {
        let columns: Arc<[String]> = vec!["id".to_string(), "name".to_string()].into();
        RawRow::new(columns, vec![Some("5".into()), None])
    }

    #[test]
    fn test_row_access() {
        let row = row();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&Some("5".to_string())));
        assert_eq!(row.get(1), Some(&None));
        assert!(row.get(2).is_none());
    }

    #[test]
    fn test_get_by_name_case_insensitive() {
        let row = row();
        assert_eq!(row.get_by_name("NAME"), Some(&None));
        assert_eq!(row.get_by_name("id"), Some(&Some("5".to_string())));
        assert!(row.get_by_name("missing").is_none());
    }
}
