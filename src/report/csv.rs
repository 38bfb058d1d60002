use crate::data::model::Table;
use crate::error::ExportError;

/// Serialize the whole view: header row, every column, every row.
pub fn export_csv(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.cells.iter().map(|c| c.to_field()))?;
    }
    let bytes = writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    log::info!("Exported {} rows to CSV ({} bytes)", table.len(), bytes.len());
    Ok(bytes)
}
