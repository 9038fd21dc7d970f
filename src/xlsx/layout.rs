//! Cell map of the work log worksheet.
//!
//! Exporter and importer both read their addresses from here, so the two
//! cannot drift apart.

use std::fmt;

/// Name of the worksheet holding the log.
pub const SHEET_NAME: &str = "일일업무일지";

pub const DATE_CELL: CellRef = CellRef::new(4, 2); // C4
pub const TIME_CELL: CellRef = CellRef::new(4, 4); // E4
pub const DEPARTMENT_CELL: CellRef = CellRef::new(5, 2); // C5
pub const AUTHOR_CELL: CellRef = CellRef::new(5, 4); // E5
pub const SPECIAL_NOTES_CELL: CellRef = CellRef::new(17, 1); // B17

/// First and last task rows (1-based, inclusive).
pub const TASK_FIRST_ROW: u32 = 8;
pub const TASK_LAST_ROW: u32 = 15;

pub const DESCRIPTION_COL: u16 = 1; // B
pub const COMPLETED_COL: u16 = 3; // D
pub const NOTES_COL: u16 = 4; // E

/// Written to the completion column for finished tasks.
pub const COMPLETED_MARK: &str = "O";
/// Also accepted as "finished" when importing.
pub const COMPLETED_WORD: &str = "완료";

pub const HALF_DAY_MARKER: &str = "반차";
pub const OASIS_MARKER: &str = "오아시스";

/// Rendered width of the description column, in pixels.
pub const DESCRIPTION_WIDTH_PX: f64 = 300.0;

/// A cell address: 1-based row, 0-based column (A = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u16,
}

impl CellRef {
    pub const fn new(row: u32, col: u16) -> Self {
        CellRef { row, col }
    }

    /// Parses an A1-style reference such as `B17` or `AA3`.
    pub fn parse(text: &str) -> Option<Self> {
        let split = text.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = text.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let mut col: u32 = 0;
        for c in letters.chars() {
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > u16::MAX as u32 {
                return None;
            }
        }
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(CellRef::new(row, (col - 1) as u16))
    }

    /// Zero-based `(row, col)` as used by calamine.
    pub fn zero_based(self) -> (u32, u32) {
        (self.row - 1, self.col as u32)
    }

    pub fn column_name(self) -> String {
        let mut n = self.col as u32 + 1;
        let mut name = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            name.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        name.iter().rev().collect()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_name(), self.row)
    }
}

/// Task rows in order.
pub fn task_rows() -> impl Iterator<Item = u32> {
    TASK_FIRST_ROW..=TASK_LAST_ROW
}
