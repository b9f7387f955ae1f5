//! Ticket grid and its structural invariants.
//!
//! A [`Ticket`] can only be obtained through [`Ticket::new`] (or
//! deserialization, which routes through it), so every `Ticket` in the
//! program satisfies the layout rules by construction:
//!
//! - 15 numbers in a 3×9 grid, 5 per row
//! - 1 to 3 numbers per column, drawn from that column's [`ColumnRange`]
//! - strictly ascending down each column
//! - no repeated numbers

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fingerprint::Fingerprint;

pub const ROWS: usize = 3;
pub const COLUMNS: usize = 9;
pub const CELLS: usize = ROWS * COLUMNS;
pub const NUMBERS_PER_TICKET: usize = 15;
pub const NUMBERS_PER_ROW: usize = 5;
pub const MAX_PER_COLUMN: usize = 3;

/// Highest number that can appear on a ticket or be called.
pub const MAX_NUMBER: u8 = 90;

/// Raw row-major cell matrix. `0` marks a blank cell.
pub type Grid = [[u8; COLUMNS]; ROWS];

/// The inclusive band of numbers eligible for one ticket column.
///
/// Column 0 holds 1-9, columns 1-7 hold their decade (10-19 .. 70-79),
/// and column 8 absorbs 90 as well (80-90).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnRange {
    start: u8,
    end: u8,
}

impl ColumnRange {
    /// Range for `column`. Columns past the last one clamp to it.
    #[must_use]
    pub const fn for_column(column: usize) -> Self {
        match column {
            0 => Self { start: 1, end: 9 },
            c if c >= COLUMNS - 1 => Self { start: 80, end: MAX_NUMBER },
            c => {
                let start = (c as u8) * 10;
                Self { start, end: start + 9 }
            }
        }
    }

    /// Column that a called number belongs to, if it is a valid number.
    #[must_use]
    pub const fn column_of(number: u8) -> Option<usize> {
        match number {
            0 => None,
            1..=9 => Some(0),
            80..=MAX_NUMBER => Some(COLUMNS - 1),
            n if n < 80 => Some((n / 10) as usize),
            _ => None,
        }
    }

    #[must_use]
    pub const fn start(self) -> u8 {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> u8 {
        self.end
    }

    #[must_use]
    pub const fn contains(self, value: u8) -> bool {
        value >= self.start && value <= self.end
    }

    #[must_use]
    pub const fn len(self) -> usize {
        (self.end - self.start) as usize + 1
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        false
    }

    pub fn values(self) -> impl Iterator<Item = u8> {
        self.start..=self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    #[error("ticket must have {expected} cells, got {actual}")]
    WrongCellCount { expected: usize, actual: usize },
    #[error("ticket must hold 15 numbers, got {count}")]
    WrongTotal { count: usize },
    #[error("row {row} must hold 5 numbers, got {count}")]
    RowCount { row: usize, count: usize },
    #[error("column {column} must hold 1 to 3 numbers, got {count}")]
    ColumnCount { column: usize, count: usize },
    #[error("value {value} at row {row}, column {column} is outside {start}-{end}")]
    OutOfRange {
        row: usize,
        column: usize,
        value: u8,
        start: u8,
        end: u8,
    },
    #[error("column {column} is not strictly ascending")]
    NotAscending { column: usize },
    #[error("number {value} appears more than once")]
    Duplicate { value: u8 },
}

/// A validated, immutable 3×9 Tambola ticket.
///
/// Serializes as the row-major list of 27 integers (0 = blank).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Ticket {
    grid: Grid,
}

impl Ticket {
    /// Validate `grid` and wrap it.
    pub fn new(grid: Grid) -> Result<Self, TicketError> {
        validate(&grid)?;
        Ok(Self { grid })
    }

    /// Build a ticket from the row-major flat encoding.
    pub fn from_cells(cells: &[u8]) -> Result<Self, TicketError> {
        if cells.len() != CELLS {
            return Err(TicketError::WrongCellCount {
                expected: CELLS,
                actual: cells.len(),
            });
        }
        let mut grid = [[0u8; COLUMNS]; ROWS];
        for (index, value) in cells.iter().enumerate() {
            grid[index / COLUMNS][index % COLUMNS] = *value;
        }
        Self::new(grid)
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Row-major flat encoding (27 cells, 0 = blank).
    #[must_use]
    pub fn cells(&self) -> [u8; CELLS] {
        let mut cells = [0u8; CELLS];
        for (row, values) in self.grid.iter().enumerate() {
            cells[row * COLUMNS..(row + 1) * COLUMNS].copy_from_slice(values);
        }
        cells
    }

    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<u8> {
        self.grid
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .filter(|value| *value != 0)
    }

    /// All 15 numbers in row-major order.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.grid.iter().flatten().copied().filter(|v| *v != 0)
    }

    /// The 5 numbers of `row`, left to right.
    pub fn row_numbers(&self, row: usize) -> impl Iterator<Item = u8> + '_ {
        self.grid[row].iter().copied().filter(|v| *v != 0)
    }

    /// The numbers of `column`, top to bottom.
    pub fn column_numbers(&self, column: usize) -> impl Iterator<Item = u8> + '_ {
        self.grid
            .iter()
            .map(move |row| row[column])
            .filter(|v| *v != 0)
    }

    #[must_use]
    pub fn contains(&self, number: u8) -> bool {
        number != 0 && self.grid.iter().flatten().any(|v| *v == number)
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

impl TryFrom<Vec<u8>> for Ticket {
    type Error = TicketError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_cells(&value)
    }
}

impl TryFrom<Grid> for Ticket {
    type Error = TicketError;

    fn try_from(value: Grid) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ticket> for Vec<u8> {
    fn from(value: Ticket) -> Self {
        value.cells().to_vec()
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.grid.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            let line = row
                .iter()
                .map(|value| {
                    if *value == 0 {
                        "..".to_string()
                    } else {
                        format!("{value:>2}")
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            f.write_str(&line)?;
        }
        Ok(())
    }
}

/// Check every structural invariant of a candidate grid.
pub fn validate(grid: &Grid) -> Result<(), TicketError> {
    let total = grid.iter().flatten().filter(|v| **v != 0).count();
    if total != NUMBERS_PER_TICKET {
        return Err(TicketError::WrongTotal { count: total });
    }

    for (row, values) in grid.iter().enumerate() {
        let count = values.iter().filter(|v| **v != 0).count();
        if count != NUMBERS_PER_ROW {
            return Err(TicketError::RowCount { row, count });
        }
    }

    let mut seen = [false; MAX_NUMBER as usize + 1];
    for column in 0..COLUMNS {
        let range = ColumnRange::for_column(column);
        let mut count = 0;
        let mut previous: Option<u8> = None;
        for (row, values) in grid.iter().enumerate() {
            let value = values[column];
            if value == 0 {
                continue;
            }
            if !range.contains(value) {
                return Err(TicketError::OutOfRange {
                    row,
                    column,
                    value,
                    start: range.start(),
                    end: range.end(),
                });
            }
            if previous.is_some_and(|prev| prev >= value) {
                return Err(TicketError::NotAscending { column });
            }
            let slot = &mut seen[value as usize];
            if *slot {
                return Err(TicketError::Duplicate { value });
            }
            *slot = true;
            previous = Some(value);
            count += 1;
        }
        if count == 0 || count > MAX_PER_COLUMN {
            return Err(TicketError::ColumnCount { column, count });
        }
    }

    Ok(())
}
