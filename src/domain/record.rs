//! Record and record table models
//!
//! A [`RecordTable`] is what a record source returns for one query window:
//! ordered column names and ordered rows. Row order is preserved by every
//! stage downstream.

use super::errors::SourceError;
use super::ids::{Identity, RecordId};
use super::{Result, TallyError};
use chrono::NaiveDate;
use std::sync::Arc;

/// Default name of the identifier column
pub const DEFAULT_ID_COLUMN: &str = "ID";

/// An immutable row with an identifier and one optional value per column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    values: Vec<Option<String>>,
}

impl Record {
    /// Identifier of the record
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// All values in column order (the identifier column included)
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Value at a column position
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }
}

/// Ordered rows sharing one column list
///
/// # Examples
///
/// ```
/// use tally::domain::record::RecordTable;
///
/// let table = RecordTable::from_rows(
///     vec!["ID".to_string(), "TITLE".to_string()],
///     "ID",
///     vec![
///         vec![Some("R0001".to_string()), Some("First".to_string())],
///         vec![Some("R0002".to_string()), None],
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.records()[1].id().as_str(), "R0002");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTable {
    columns: Arc<[String]>,
    id_index: usize,
    records: Vec<Record>,
}

impl RecordTable {
    /// Create an empty table; `id_column` must be one of `columns`
    pub fn new(columns: Vec<String>, id_column: &str) -> Result<Self> {
        let id_index = columns
            .iter()
            .position(|c| c == id_column)
            .ok_or_else(|| {
                SourceError::InvalidData(format!(
                    "identifier column '{}' not found in columns [{}]",
                    id_column,
                    columns.join(", ")
                ))
            })?;

        Ok(Self {
            columns: columns.into(),
            id_index,
            records: Vec::new(),
        })
    }

    /// Create a table and append the given rows in order
    pub fn from_rows(
        columns: Vec<String>,
        id_column: &str,
        rows: Vec<Vec<Option<String>>>,
    ) -> Result<Self> {
        let mut table = Self::new(columns, id_column)?;
        table.records.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append one row; the identifier cell must be present and non-blank
    pub fn push_row(&mut self, values: Vec<Option<String>>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(SourceError::InvalidData(format!(
                "row {} has {} values, expected {}",
                self.records.len() + 1,
                values.len(),
                self.columns.len()
            ))
            .into());
        }

        let raw_id = values[self.id_index].as_deref().unwrap_or_default();
        let id = RecordId::new(raw_id).map_err(|e| {
            TallyError::from(SourceError::InvalidData(format!(
                "row {}: {}",
                self.records.len() + 1,
                e
            )))
        })?;

        self.records.push(Record { id, values });
        Ok(())
    }

    /// New table with the same columns holding `records`
    pub fn with_records(&self, records: Vec<Record>) -> Self {
        Self {
            columns: Arc::clone(&self.columns),
            id_index: self.id_index,
            records,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Shared handle to the column list
    pub fn shared_columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    pub fn id_column(&self) -> &str {
        &self.columns[self.id_index]
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Query window handed to a record source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilter {
    /// Whose records to select
    pub identity: Identity,
    /// First day of the window (inclusive)
    pub date_start: NaiveDate,
    /// Last day of the window (inclusive)
    pub date_end: NaiveDate,
}

impl SourceFilter {
    /// Create a filter, rejecting a window whose start is after its end
    pub fn new(identity: Identity, date_start: NaiveDate, date_end: NaiveDate) -> Result<Self> {
        if date_start > date_end {
            return Err(TallyError::Validation(format!(
                "date_start {date_start} is after date_end {date_end}"
            )));
        }
        Ok(Self {
            identity,
            date_start,
            date_end,
        })
    }
}
