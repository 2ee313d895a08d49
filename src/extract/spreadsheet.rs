// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Spreadsheet extraction (XLSX/XLS) using calamine

use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

use super::TextBudget;
use crate::Result;

/// Concatenate cell values of every sheet, in file order, up to `max_chars`
pub fn extract_spreadsheet(path: &Path, max_chars: usize) -> Result<Option<String>> {
    let mut workbook = open_workbook_auto(path)?;
    let mut budget = TextBudget::new(max_chars);

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    for name in &sheet_names {
        let range = workbook.worksheet_range(name)?;
        if !append_sheet(&mut budget, name, &range) {
            break;
        }
    }

    Ok(budget.finish())
}

/// Returns `false` once the budget is exhausted, possibly mid-sheet
fn append_sheet(budget: &mut TextBudget, name: &str, range: &Range<Data>) -> bool {
    if !budget.push_line(&format!("[Sheet: {}]", name)) {
        return false;
    }
    for row in range.rows() {
        for cell in row {
            if matches!(cell, Data::Empty) {
                continue;
            }
            if !budget.push(&format!("{} ", cell)) {
                return false;
            }
        }
    }
    budget.push("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(cells: &[&[&str]]) -> Range<Data> {
        let rows = cells.len() as u32;
        let cols = cells.iter().map(|r| r.len()).max().unwrap_or(1) as u32;
        let mut range = Range::new((0, 0), (rows - 1, cols - 1));
        for (r, row) in cells.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String(value.to_string()));
                }
            }
        }
        range
    }

    #[test]
    fn sheets_are_prefixed_and_empty_cells_skipped() {
        let mut budget = TextBudget::new(1000);
        assert!(append_sheet(&mut budget, "Costs", &sheet(&[&["Item", "", "Amount"], &["Rent", "", "900"]])));
        assert!(append_sheet(&mut budget, "Notes", &sheet(&[&["Paid"]])));
        assert_eq!(
            budget.finish().unwrap(),
            "[Sheet: Costs]\nItem Amount Rent 900 \n[Sheet: Notes]\nPaid"
        );
    }

    #[test]
    fn stops_mid_sheet() {
        let mut budget = TextBudget::new(20);
        let data = sheet(&[&["alpha", "beta", "gamma", "delta"]]);
        assert!(!append_sheet(&mut budget, "S1", &data));
        // "[Sheet: S1]\n" is 12 characters, "alpha " brings it to 18, "beta " past 20
        assert_eq!(budget.finish().unwrap(), "[Sheet: S1]\nalpha be");
    }

    #[test]
    fn corrupt_workbook_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        assert!(extract_spreadsheet(&path, 100).is_err());
    }
}
