use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common Pandas dtypes.
/// Used in `BTreeSet`s downstream (filter options), so it must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.2}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Numeric view of the cell, used by aggregation and colour mapping.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text written to a CSV field. Floats keep a decimal point (`100.0`)
    /// so the column is read back as float, nulls become empty fields.
    pub fn to_field(&self) -> String {
        match self {
            CellValue::String(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(v) => format!("{v:?}"),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::Null => String::new(),
        }
    }

    fn kind(&self) -> Option<ColumnKind> {
        match self {
            CellValue::String(_) => Some(ColumnKind::Text),
            CellValue::Integer(_) => Some(ColumnKind::Integer),
            CellValue::Float(_) => Some(ColumnKind::Float),
            CellValue::Bool(_) => Some(ColumnKind::Bool),
            CellValue::Date(_) => Some(ColumnKind::Date),
            CellValue::Null => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnKind – one inferred dtype per column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Integer,
    Float,
    Bool,
    Date,
    Text,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    /// Infer a column's kind from its cells, widening mixed columns:
    /// integer + float → float, anything mixed with text → text.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a CellValue>) -> ColumnKind {
        Self::observe(cells).unwrap_or(ColumnKind::Text)
    }

    /// Like [`ColumnKind::infer`], but `None` when every cell is null.
    fn observe<'a>(cells: impl IntoIterator<Item = &'a CellValue>) -> Option<ColumnKind> {
        let mut kind: Option<ColumnKind> = None;
        for cell in cells {
            let Some(k) = cell.kind() else { continue };
            kind = Some(match (kind, k) {
                (None, k) => k,
                (Some(a), b) if a == b => a,
                (Some(ColumnKind::Integer), ColumnKind::Float)
                | (Some(ColumnKind::Float), ColumnKind::Integer) => ColumnKind::Float,
                _ => ColumnKind::Text,
            });
        }
        kind
    }

    /// Convert a cell so it matches this column kind.
    pub fn coerce(self, cell: CellValue) -> CellValue {
        match (self, cell) {
            (_, CellValue::Null) => CellValue::Null,
            (ColumnKind::Float, CellValue::Integer(i)) => CellValue::Float(i as f64),
            (ColumnKind::Text, CellValue::String(s)) => CellValue::String(s),
            (ColumnKind::Text, other) => CellValue::String(other.to_field()),
            (_, other) => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Row / Table – the loaded dataset and every view derived from it
// ---------------------------------------------------------------------------

/// One record; `cells[i]` belongs to `Table::columns[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<CellValue>,
}

/// An in-memory table: ordered columns, one kind per column, rows in
/// source order. Views produced by filtering are tables too.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub kinds: Vec<ColumnKind>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Build a table, inferring and normalizing each column's kind.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self::from_rows_with_kinds(columns, rows, |_| None)
    }

    /// Build a table where `known` fixes the kind of some columns.
    ///
    /// A known kind wins over the values, and also types a column with no
    /// values at all. Known integer columns still widen with their data
    /// (to float, or to text for non-numeric ids).
    pub fn from_rows_with_kinds(
        columns: Vec<String>,
        mut rows: Vec<Row>,
        known: impl Fn(&str) -> Option<ColumnKind>,
    ) -> Self {
        let kinds: Vec<ColumnKind> = columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let seen = ColumnKind::observe(rows.iter().filter_map(|r| r.cells.get(i)));
                match (known(name), seen) {
                    (Some(ColumnKind::Integer), Some(seen)) => seen,
                    (Some(kind), _) => kind,
                    (None, seen) => seen.unwrap_or(ColumnKind::Text),
                }
            })
            .collect();

        for row in &mut rows {
            row.cells.resize(columns.len(), CellValue::Null);
            let cells = std::mem::take(&mut row.cells);
            row.cells = cells
                .into_iter()
                .zip(&kinds)
                .map(|(cell, kind)| kind.coerce(cell))
                .collect();
        }

        Table {
            columns,
            kinds,
            rows,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.column_index(name).map(|i| self.kinds[i])
    }

    /// Cell at `row` for the named column.
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.cells.get(idx)
    }

    /// Sorted set of distinct values in a column (the filter options).
    pub fn distinct(&self, column: &str) -> BTreeSet<CellValue> {
        match self.column_index(column) {
            Some(idx) => self.rows.iter().map(|r| r.cells[idx].clone()).collect(),
            None => BTreeSet::new(),
        }
    }

    /// Non-null numeric values of a column, in row order.
    pub fn numeric_values(&self, column: &str) -> Vec<f64> {
        match self.column_index(column) {
            Some(idx) => self
                .rows
                .iter()
                .filter_map(|r| r.cells[idx].as_f64())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Earliest and latest date in a date column.
    pub fn date_span(&self, column: &str) -> Option<(NaiveDate, NaiveDate)> {
        let idx = self.column_index(column)?;
        let mut dates = self.rows.iter().filter_map(|r| r.cells[idx].as_date());
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// New table with the given rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            kinds: self.kinds.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Row indices ordered by a column (nulls last), stable for ties.
    pub fn sorted_indices(&self, column: &str, descending: bool) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        if let Some(idx) = self.column_index(column) {
            indices.sort_by(|&a, &b| {
                let (va, vb) = (&self.rows[a].cells[idx], &self.rows[b].cells[idx]);
                match (va.is_null(), vb.is_null()) {
                    (true, true) => std::cmp::Ordering::Equal,
                    (true, false) => std::cmp::Ordering::Greater,
                    (false, true) => std::cmp::Ordering::Less,
                    _ if descending => vb.cmp(va),
                    _ => va.cmp(vb),
                }
            });
        }
        indices
    }
}
