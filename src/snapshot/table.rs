//! In-memory tabular result of one extraction or transformation

use super::Value;
use crate::error::EtlError;
use eyre::Result;
use std::collections::HashMap;

/// Named columns and the rows under them
///
/// Every row has exactly one value per column; [`Snapshot::push_row`] enforces
/// that, so column access by index never goes out of bounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Snapshot {
    /// Create an empty snapshot with the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create a snapshot from columns and rows, checking row widths
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut snapshot = Self::new(columns);
        for row in rows {
            snapshot.push_row(row)?;
        }
        Ok(snapshot)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row
    ///
    /// # Errors
    /// Returns an error if the row width does not match the column count
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            eyre::bail!(
                "Row has {} value(s) but snapshot has {} column(s)",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a column holding one value per existing row
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> Result<()> {
        let name = name.into();
        if values.len() != self.rows.len() {
            eyre::bail!(
                "Column '{}' has {} value(s) but snapshot has {} row(s)",
                name,
                values.len(),
                self.rows.len()
            );
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        self.columns.push(name);
        Ok(())
    }

    /// Position of a column
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| {
                EtlError::MissingColumn {
                    column: name.to_string(),
                }
                .into()
            })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Values of one column, top to bottom
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Project onto `names`, in that order
    pub fn select(&self, names: &[&str]) -> Result<Snapshot> {
        let indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Snapshot {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Rename columns; names not present are ignored
    pub fn rename(mut self, renames: &[(&str, &str)]) -> Snapshot {
        for column in self.columns.iter_mut() {
            if let Some((_, to)) = renames.iter().find(|(from, _)| from == column) {
                *column = to.to_string();
            }
        }
        self
    }

    /// Left join `right` onto `self` where `left_on` equals `right_on`
    ///
    /// The result keeps every left row. A left row with several matches is
    /// repeated once per match; a row with none gets NULL for every right
    /// column. `right_on` itself is not carried over, and right columns whose
    /// name already exists on the left are suffixed with `_right`.
    pub fn left_join(&self, right: &Snapshot, left_on: &str, right_on: &str) -> Result<Snapshot> {
        let left_key = self.column_index(left_on)?;
        let right_key = right.column_index(right_on)?;

        let carried: Vec<usize> = (0..right.columns.len())
            .filter(|&i| i != right_key)
            .collect();

        let mut columns = self.columns.clone();
        for &i in &carried {
            let name = &right.columns[i];
            if self.has_column(name) {
                columns.push(format!("{}_right", name));
            } else {
                columns.push(name.clone());
            }
        }

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, row) in right.rows.iter().enumerate() {
            if let Some(key) = row[right_key].join_key() {
                index.entry(key).or_default().push(pos);
            }
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let matches = row[left_key]
                .join_key()
                .and_then(|key| index.get(&key))
                .filter(|m| !m.is_empty());

            match matches {
                Some(matches) => {
                    for &pos in matches {
                        let mut joined = row.clone();
                        joined.extend(carried.iter().map(|&i| right.rows[pos][i].clone()));
                        rows.push(joined);
                    }
                }
                None => {
                    let mut joined = row.clone();
                    joined.extend(carried.iter().map(|_| Value::Null));
                    rows.push(joined);
                }
            }
        }

        Ok(Snapshot { columns, rows })
    }
}
