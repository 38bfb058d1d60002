use std::io::Read;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type, Int64Type};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, ColumnKind, Row, Table};
use super::schema::Schema;
use crate::error::DataFormatError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a dashboard table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line
/// * `.json`    – `[{ "Date": ..., "Region": ..., ... }, ...]`
/// * `.parquet` – flat columns of strings, numbers, booleans, dates
///
/// The result is normalized against `schema`: required columns checked,
/// the date column parsed, the amount column made numeric and the
/// identifier column synthesized when absent.
pub fn load_file(path: &Path, schema: &Schema) -> Result<Table, DataFormatError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "csv" => read_csv(open(path)?, schema)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => return Err(DataFormatError::UnsupportedFormat(other.to_string())),
    };

    let table = normalize(raw, schema)?;
    log::info!(
        "Loaded {} rows with columns {:?} from {}",
        table.len(),
        table.columns,
        path.display()
    );
    Ok(table)
}

/// Load CSV text from any reader (used for in-memory sources and tests).
pub fn load_csv_reader<R: Read>(reader: R, schema: &Schema) -> Result<Table, DataFormatError> {
    normalize(read_csv(reader, schema)?, schema)
}

fn open(path: &Path) -> Result<std::fs::File, DataFormatError> {
    std::fs::File::open(path).map_err(|source| DataFormatError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Cells as read from the source, before schema normalization.
struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, empty fields are nulls.
/// Each column's type is inferred over all of its values, except columns
/// the schema types as text or date: those are kept as read, so a category
/// like `"007"` survives and dates reach date detection.
fn read_csv<R: Read>(reader: R, schema: &Schema) -> Result<RawTable, DataFormatError> {
    let mut reader = csv::Reader::from_reader(reader);
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    // Column-major so inference sees whole columns.
    let mut fields: Vec<Vec<String>> = vec![Vec::new(); columns.len()];
    for result in reader.records() {
        let record = result?;
        for (i, column) in fields.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or("").to_string());
        }
    }
    let n_rows = fields.first().map_or(0, Vec::len);

    let typed: Vec<Vec<CellValue>> = columns
        .iter()
        .zip(fields)
        .map(|(name, values)| {
            match schema.column_kind(name) {
                Some(ColumnKind::Date | ColumnKind::Text) => values.into_iter().map(text_cell).collect(),
                _ => infer_csv_column(values),
            }
        })
        .collect();

    let rows = (0..n_rows)
        .map(|r| typed.iter().map(|col| col[r].clone()).collect())
        .collect();

    Ok(RawTable { columns, rows })
}

fn text_cell(s: String) -> CellValue {
    if s.is_empty() {
        CellValue::Null
    } else {
        CellValue::String(s)
    }
}

/// Pick the narrowest type every non-empty value parses as.
fn infer_csv_column(values: Vec<String>) -> Vec<CellValue> {
    let mut present = values.iter().filter(|v| !v.is_empty());

    if present.clone().all(|v| v.parse::<i64>().is_ok()) {
        return values
            .iter()
            .map(|v| v.parse::<i64>().map_or(CellValue::Null, CellValue::Integer))
            .collect();
    }
    if present.clone().all(|v| v.parse::<f64>().is_ok()) {
        return values
            .iter()
            .map(|v| v.parse::<f64>().map_or(CellValue::Null, CellValue::Float))
            .collect();
    }
    if present.all(|v| v == "true" || v == "false") {
        return values
            .iter()
            .map(|v| match v.as_str() {
                "" => CellValue::Null,
                other => CellValue::Bool(other == "true"),
            })
            .collect();
    }
    values.into_iter().map(text_cell).collect()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Date": 1672531200000, "Region": "North", "Claim Amount": 1200.5, ... },
///   ...
/// ]
/// ```
///
/// Integer dates are epoch milliseconds (the Pandas default). A key missing
/// from some records reads as null there.
fn read_json(path: &Path) -> Result<RawTable, DataFormatError> {
    let text = std::fs::read_to_string(path).map_err(|source| DataFormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root
        .as_array()
        .ok_or_else(|| DataFormatError::Malformed("expected top-level JSON array".into()))?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DataFormatError::Malformed(format!("row {} is not a JSON object", i + 1)))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map_or(CellValue::Null, json_to_cell))
                .collect()
        })
        .collect();

    Ok(RawTable { columns, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file, as written by **Pandas** (`df.to_parquet()`)
/// or **Polars** (`df.write_parquet()`).
///
/// Integer, float, decimal, string, dictionary, boolean, date and timestamp
/// columns are supported; timestamps are truncated to their date.
fn read_parquet(path: &Path) -> Result<RawTable, DataFormatError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let arrays: Vec<ArrayRef> = columns
            .iter()
            .zip(batch.columns())
            .map(|(name, col)| normalize_array(name, col))
            .collect::<Result<_, _>>()?;

        for row in 0..batch.num_rows() {
            rows.push(
                arrays
                    .iter()
                    .map(|col| cell_at(col, row))
                    .collect::<Result<Vec<_>, _>>()?,
            );
        }
    }

    Ok(RawTable { columns, rows })
}

// -- Parquet / Arrow helpers --

/// Cast a column to one of the five array types [`cell_at`] reads.
fn normalize_array(name: &str, col: &ArrayRef) -> Result<ArrayRef, DataFormatError> {
    let target = match col.data_type() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => DataType::Int64,
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => DataType::Float64,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View | DataType::Dictionary(_, _) => {
            DataType::Utf8
        }
        DataType::Boolean => DataType::Boolean,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => DataType::Date32,
        other => {
            return Err(DataFormatError::UnsupportedColumnType {
                column: name.to_string(),
                data_type: format!("{other:?}"),
            })
        }
    };
    Ok(cast(col, &target)?)
}

/// Extract a single cell from a normalized Arrow column at a given row.
fn cell_at(col: &ArrayRef, row: usize) -> Result<CellValue, DataFormatError> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let mismatch = || DataFormatError::Malformed(format!("unexpected array type {:?}", col.data_type()));
    let cell = match col.data_type() {
        DataType::Int64 => {
            CellValue::Integer(col.as_primitive_opt::<Int64Type>().ok_or_else(mismatch)?.value(row))
        }
        DataType::Float64 => {
            CellValue::Float(col.as_primitive_opt::<Float64Type>().ok_or_else(mismatch)?.value(row))
        }
        DataType::Utf8 => {
            CellValue::String(col.as_string_opt::<i32>().ok_or_else(mismatch)?.value(row).to_string())
        }
        DataType::Boolean => CellValue::Bool(col.as_boolean_opt().ok_or_else(mismatch)?.value(row)),
        DataType::Date32 => col
            .as_primitive_opt::<Date32Type>()
            .ok_or_else(mismatch)?
            .value_as_date(row)
            .map_or(CellValue::Null, CellValue::Date),
        _ => return Err(mismatch()),
    };
    Ok(cell)
}

// ---------------------------------------------------------------------------
// Schema normalization
// ---------------------------------------------------------------------------

fn normalize(raw: RawTable, schema: &Schema) -> Result<Table, DataFormatError> {
    let RawTable {
        mut columns,
        mut rows,
    } = raw;

    for required in schema.required_columns {
        if !columns.iter().any(|c| c == required) {
            return Err(DataFormatError::MissingColumn(required.to_string()));
        }
    }

    if schema.drop_incomplete_rows {
        let before = rows.len();
        rows.retain(|r| r.iter().all(|c| !c.is_null()));
        if rows.len() < before {
            log::debug!("Dropped {} incomplete rows", before - rows.len());
        }
    }

    if let Some(idx) = columns.iter().position(|c| c == schema.date_column) {
        parse_date_column(&mut rows, idx, schema.date_column)?;
    }
    if let Some(idx) = columns.iter().position(|c| c == schema.amount_column) {
        parse_amount_column(&mut rows, idx, schema.amount_column)?;
    }

    if !columns.iter().any(|c| c == schema.id_column) {
        columns.insert(0, schema.id_column.to_string());
        for (i, row) in rows.iter_mut().enumerate() {
            row.insert(0, CellValue::Integer(i as i64 + 1));
        }
    }

    let rows = rows.into_iter().map(|cells| Row { cells }).collect();
    Ok(Table::from_rows_with_kinds(columns, rows, |c| schema.column_kind(c)))
}

fn parse_amount_column(
    rows: &mut [Vec<CellValue>],
    idx: usize,
    column: &str,
) -> Result<(), DataFormatError> {
    for (i, row) in rows.iter_mut().enumerate() {
        let cell = std::mem::replace(&mut row[idx], CellValue::Null);
        row[idx] = match cell {
            CellValue::Integer(v) => CellValue::Float(v as f64),
            CellValue::String(s) => match s.trim().parse::<f64>() {
                Ok(v) => CellValue::Float(v),
                Err(_) => {
                    return Err(DataFormatError::InvalidNumber {
                        row: i + 1,
                        column: column.to_string(),
                        value: s,
                    })
                }
            },
            CellValue::Bool(b) => {
                return Err(DataFormatError::InvalidNumber {
                    row: i + 1,
                    column: column.to_string(),
                    value: b.to_string(),
                })
            }
            other => other,
        };
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Date detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum DateFormat {
    Date(&'static str),
    DateTime(&'static str),
    /// `YYYYMMDD`
    Compact,
    Rfc3339,
}

/// Tried in order; month-first wins over day-first when both fit.
const DATE_FORMATS: &[DateFormat] = &[
    DateFormat::Date("%Y-%m-%d"),
    DateFormat::Date("%Y/%m/%d"),
    DateFormat::Date("%m/%d/%Y"),
    DateFormat::Date("%d/%m/%Y"),
    DateFormat::Date("%d.%m.%Y"),
    DateFormat::Date("%b %d, %Y"),
    DateFormat::Date("%d %b %Y"),
    DateFormat::Compact,
    DateFormat::DateTime("%Y-%m-%d %H:%M:%S"),
    DateFormat::DateTime("%Y-%m-%d %H:%M:%S%.f"),
    DateFormat::DateTime("%Y-%m-%dT%H:%M:%S"),
    DateFormat::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
    DateFormat::DateTime("%Y-%m-%d %H:%M"),
    DateFormat::DateTime("%m/%d/%Y %H:%M"),
    DateFormat::Rfc3339,
];

impl DateFormat {
    fn parse(self, s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        match self {
            DateFormat::Date(f) => NaiveDate::parse_from_str(s, f).ok(),
            DateFormat::DateTime(f) => NaiveDateTime::parse_from_str(s, f).ok().map(|dt| dt.date()),
            DateFormat::Compact => parse_compact(s),
            DateFormat::Rfc3339 => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()),
        }
    }
}

fn parse_compact(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(s[..4].parse().ok()?, s[4..6].parse().ok()?, s[6..].parse().ok()?)
}

/// The first format that parses every value; failing that, the first one
/// that parses the first value, so the error names the offending row.
fn detect_date_format(values: &[&str]) -> Option<DateFormat> {
    DATE_FORMATS
        .iter()
        .copied()
        .find(|f| values.iter().all(|v| f.parse(v).is_some()))
        .or_else(|| {
            let first = values.first()?;
            DATE_FORMATS.iter().copied().find(|f| f.parse(first).is_some())
        })
}

fn parse_date_column(
    rows: &mut [Vec<CellValue>],
    idx: usize,
    column: &str,
) -> Result<(), DataFormatError> {
    let texts: Vec<&str> = rows
        .iter()
        .filter_map(|r| match &r[idx] {
            CellValue::String(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    let format = detect_date_format(&texts);
    if let Some(f) = format {
        log::debug!("Detected date format {f:?} for column '{column}'");
    }

    for (i, row) in rows.iter_mut().enumerate() {
        let cell = std::mem::replace(&mut row[idx], CellValue::Null);
        let parsed = match &cell {
            CellValue::Date(d) => Some(*d),
            CellValue::Integer(ms) => DateTime::from_timestamp_millis(*ms).map(|dt| dt.date_naive()),
            CellValue::String(s) => format.and_then(|f| f.parse(s)),
            _ => None,
        };
        match parsed {
            Some(d) => row[idx] = CellValue::Date(d),
            None => {
                return Err(DataFormatError::InvalidDate {
                    row: i + 1,
                    column: column.to_string(),
                    value: cell.to_field(),
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{CLAIMS, SALES};

    const HEADER: &str =
        "Date,Region,Policy Type,Vehicle Type,Gender,Claim Status,Claim Amount,Customer Age,Previous Claims";

    fn claims(body: &str) -> Result<Table, DataFormatError> {
        load_csv_reader(format!("{HEADER}\n{body}").as_bytes(), &CLAIMS)
    }

    #[test]
    fn synthesizes_claim_ids_in_file_order() {
        let table = claims(
            "2024-01-05,North,Comprehensive,Car,F,Approved,1200,34,0\n\
             2024-01-03,South,Third Party,Truck,M,Denied,300.5,51,2\n",
        )
        .unwrap();

        assert_eq!(table.columns[0], "Claim ID");
        assert_eq!(table.cell(0, "Claim ID"), Some(&CellValue::Integer(1)));
        assert_eq!(table.cell(1, "Claim ID"), Some(&CellValue::Integer(2)));
        assert_eq!(table.kind_of("Date"), Some(ColumnKind::Date));
        assert_eq!(table.kind_of("Claim Amount"), Some(ColumnKind::Float));
        assert_eq!(table.kind_of("Customer Age"), Some(ColumnKind::Integer));
        assert_eq!(table.cell(0, "Claim Amount"), Some(&CellValue::Float(1200.0)));
    }

    #[test]
    fn keeps_existing_identifier() {
        let csv = format!(
            "Claim ID,{HEADER}\n42,2024-01-05,North,Comprehensive,Car,F,Approved,1200,34,0\n"
        );
        let table = load_csv_reader(csv.as_bytes(), &CLAIMS).unwrap();
        assert_eq!(table.columns.len(), 10);
        assert_eq!(table.cell(0, "Claim ID"), Some(&CellValue::Integer(42)));
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let err = load_csv_reader("Date,Region\n2024-01-01,North\n".as_bytes(), &CLAIMS).unwrap_err();
        assert!(matches!(err, DataFormatError::MissingColumn(c) if c == "Policy Type"));
    }

    #[test]
    fn unparseable_date_is_rejected() {
        let err = claims(
            "2024-01-05,North,Comprehensive,Car,F,Approved,1200,34,0\n\
             soon,North,Comprehensive,Car,F,Approved,1200,34,0\n",
        )
        .unwrap_err();
        match err {
            DataFormatError::InvalidDate { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn detects_day_first_dates_from_whole_column() {
        let table = claims(
            "03/01/2024,North,Comprehensive,Car,F,Approved,1,34,0\n\
             25/01/2024,North,Comprehensive,Car,F,Approved,1,34,0\n",
        )
        .unwrap();
        assert_eq!(
            table.cell(0, "Date"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()))
        );
    }

    #[test]
    fn datetimes_are_truncated_to_dates() {
        let table = claims("2024-02-10 13:45:00,North,Comprehensive,Car,F,Approved,1,34,0\n").unwrap();
        assert_eq!(
            table.cell(0, "Date"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()))
        );
    }

    #[test]
    fn compact_dates_are_detected() {
        let table = claims(
            "20240105,North,Comprehensive,Car,F,Approved,1,34,0\n\
             20241231,South,Comprehensive,Car,M,Denied,2,40,1\n",
        )
        .unwrap();
        assert_eq!(
            table.cell(0, "Date"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()))
        );
        assert_eq!(
            table.cell(1, "Date"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()))
        );
    }

    #[test]
    fn numeric_looking_categories_stay_text() {
        let table = claims("2024-01-05,007,1,Car,2,Approved,1,34,0\n").unwrap();
        assert_eq!(table.cell(0, "Region"), Some(&CellValue::String("007".into())));
        assert_eq!(table.cell(0, "Gender"), Some(&CellValue::String("2".into())));
        assert_eq!(table.kind_of("Policy Type"), Some(ColumnKind::Text));
    }

    #[test]
    fn non_numeric_amount_is_rejected() {
        let err = claims("2024-01-05,North,Comprehensive,Car,F,Approved,lots,34,0\n").unwrap_err();
        assert!(matches!(err, DataFormatError::InvalidNumber { row: 1, .. }));
    }

    #[test]
    fn sales_drops_incomplete_rows_before_numbering() {
        let csv = "Date,Region,Sales Amount\n\
                   2024-01-01,North,10\n\
                   ,South,20\n\
                   2024-01-03,,30\n\
                   2024-01-04,East,40\n";
        let table = load_csv_reader(csv.as_bytes(), &SALES).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "Sale ID"), Some(&CellValue::Integer(2)));
        assert_eq!(table.cell(1, "Sales Amount"), Some(&CellValue::Float(40.0)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_file(Path::new("claims.xlsx"), &CLAIMS).unwrap_err();
        assert!(matches!(err, DataFormatError::UnsupportedFormat(e) if e == "xlsx"));
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let err = load_file(Path::new("/nonexistent/claims.csv"), &CLAIMS).unwrap_err();
        assert!(matches!(err, DataFormatError::Io { .. }));
    }
}
