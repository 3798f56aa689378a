use crate::constants::{NA_TOKENS, TIMESTAMP_FORMAT};
use crate::error::TableError;
use chrono::{NaiveDateTime, Timelike};
use std::fmt;

/// True for the cell texts read as missing values.
pub fn is_na(raw: &str) -> bool {
    NA_TOKENS.contains(&raw)
}

/// Storage type shared by every cell of a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
}

impl ColumnKind {
    /// `Int` when every non-missing cell is an integer, `Float` when every
    /// one is a finite number, `Text` otherwise. A column holding only
    /// missing values is `Text`.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a str>) -> ColumnKind {
        let mut kind = None;
        for raw in cells.into_iter().filter(|c| !is_na(c)) {
            let cell = if raw.parse::<i64>().is_ok() {
                ColumnKind::Int
            } else if raw.parse::<f64>().map_or(false, f64::is_finite) {
                ColumnKind::Float
            } else {
                return ColumnKind::Text;
            };
            kind = Some(match (kind, cell) {
                (Some(ColumnKind::Float), _) | (_, ColumnKind::Float) => ColumnKind::Float,
                _ => ColumnKind::Int,
            });
        }
        kind.unwrap_or(ColumnKind::Text)
    }

    /// Reads one cell of a column of this kind. Text is kept verbatim.
    pub fn parse(self, raw: &str) -> Value {
        if is_na(raw) {
            return Value::Null;
        }
        match self {
            ColumnKind::Int => raw.parse().map(Value::Int).unwrap_or_else(|_| Value::text(raw)),
            ColumnKind::Float => raw.parse().map(Value::Float).unwrap_or_else(|_| Value::text(raw)),
            ColumnKind::Text => Value::text(raw),
        }
    }
}

/// A single cell of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write_float(f, *x),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => match ts.nanosecond() {
                0 => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
                ns if ns % 1_000 == 0 => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.6f")),
                _ => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.9f")),
            },
        }
    }
}

/// Shortest round-trip digits. Positional with at least one decimal
/// ("6000.0") for exponents in -4..16, otherwise scientific with a signed
/// two-digit exponent ("1e+16", "2.5e-07"). NaN is written as an empty cell.
fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        return Ok(());
    }
    if x.is_infinite() {
        return f.write_str(if x > 0.0 { "inf" } else { "-inf" });
    }
    let sci = format!("{x:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if x != 0.0 && !(-4..16).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        return write!(f, "{mantissa}e{sign}{:02}", exp.abs());
    }
    let plain = x.to_string();
    if plain.contains('.') {
        f.write_str(&plain)
    } else {
        write!(f, "{plain}.0")
    }
}

/// Row-major in-memory dataset with named columns. Rows are identified by
/// position only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
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

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// First of `names` present in the table.
    pub fn first_column_of(&self, names: &[&str]) -> Result<usize, TableError> {
        names
            .iter()
            .find_map(|name| self.column_index(name))
            .ok_or_else(|| TableError::MissingColumn(names.join("|")))
    }

    pub fn get(&self, row: usize, column: usize) -> &Value {
        &self.rows[row][column]
    }

    pub fn set(&mut self, row: usize, column: usize, value: Value) {
        self.rows[row][column] = value;
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>, TableError> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Renames every listed column that exists; absent ones are skipped.
    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) {
        for column in self.columns.iter_mut() {
            if let Some((_, to)) = renames.iter().find(|(from, _)| *from == column.as_str()) {
                *column = (*to).to_string();
            }
        }
    }

    /// Removes the listed columns. Fails without modifying the table when
    /// any of them is absent.
    pub fn drop_columns(&mut self, names: &[&str]) -> Result<(), TableError> {
        let mut indices = names
            .iter()
            .map(|name| self.require_column(name))
            .collect::<Result<Vec<_>, _>>()?;
        indices.sort_unstable();
        indices.dedup();
        for idx in indices.into_iter().rev() {
            self.columns.remove(idx);
            for row in self.rows.iter_mut() {
                row.remove(idx);
            }
        }
        Ok(())
    }

    /// Appends a column computed per row, replacing an existing column of
    /// the same name in place.
    pub fn derive_column<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(&[Value]) -> Value,
    {
        let values: Vec<Value> = self.rows.iter().map(|r| f(r)).collect();
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<(), TableError>
    where
        F: FnMut(&Value) -> Value,
    {
        let idx = self.require_column(name)?;
        for row in self.rows.iter_mut() {
            row[idx] = f(&row[idx]);
        }
        Ok(())
    }

    /// Keeps rows for which `keep` returns true; returns how many were removed.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[Value]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|r| keep(r));
        before - self.rows.len()
    }

    /// New table holding the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}
