use std::path::PathBuf;

use anyhow::Context;
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    let schema = state.schema;
    ui.heading(schema.filter_heading);
    ui.separator();

    let table = match &state.table {
        Some(t) => t.clone(),
        None => {
            ui.label("No data loaded.");
            return;
        }
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            date_range(ui, state);
            ui.separator();

            // ---- Per-column filter widgets (collapsible) ----
            for col in schema.filter_columns {
                let all_values = table.distinct(col);
                let selected = state.selected_count(col);

                // Show count of selected / total in the header
                let header_text = format!("{col}  ({selected}/{})", all_values.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(col)
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        // Select all / none buttons
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(col);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(col);
                            }
                        });

                        for val in &all_values {
                            let mut checked = state
                                .selection
                                .categories
                                .get(*col)
                                .is_some_and(|s| s.contains(val));

                            // Colour swatch if this column drives the line colours
                            let mut text = RichText::new(val.to_string());
                            if let Some(cm) = &state.color_map {
                                if cm.column == *col {
                                    text = text.color(cm.color_for(val));
                                }
                            }

                            if ui.checkbox(&mut checked, text).changed() {
                                state.toggle_filter_value(col, val);
                            }
                        }
                    });
            }
        });
}

/// Start / end pickers. The range is taken as-is; an inverted range
/// simply shows no rows.
fn date_range(ui: &mut Ui, state: &mut AppState) {
    let Some(range) = state.selection.dates else {
        return;
    };
    let (mut start, mut end) = (range.start, range.end);

    ui.strong("Date range");
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("From");
        changed |= ui
            .add(DatePickerButton::new(&mut start).id_salt("date_start"))
            .changed();
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("To");
        changed |= ui
            .add(DatePickerButton::new(&mut end).id_salt("date_end"))
            .changed();
    });
    if changed {
        state.set_date_range(start, end);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} rows loaded, {} visible",
                table.len(),
                state.view.len()
            ));
        }

        ui.separator();

        let loaded = state.table.is_some();
        if ui
            .add_enabled(loaded, egui::Button::new("📄 Generate PDF Report"))
            .clicked()
        {
            save_pdf_dialog(state);
        }
        if ui
            .add_enabled(loaded, egui::Button::new("⬇ Download Filtered Data"))
            .clicked()
        {
            save_csv_dialog(state);
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::GREEN
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open data file")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load(&path);
    }
}

fn save_pdf_dialog(state: &mut AppState) {
    let Some(path) = save_dialog(state.schema.pdf_file_name, "PDF", "pdf") else {
        return;
    };
    let result = state
        .export_pdf()
        .map_err(anyhow::Error::from)
        .and_then(|bytes| write_export(&path, &bytes));
    report_outcome(state, &path, result);
}

fn save_csv_dialog(state: &mut AppState) {
    let Some(path) = save_dialog(state.schema.csv_file_name, "CSV", "csv") else {
        return;
    };
    let result = state
        .export_csv()
        .map_err(anyhow::Error::from)
        .and_then(|bytes| write_export(&path, &bytes));
    report_outcome(state, &path, result);
}

fn save_dialog(file_name: &str, label: &str, ext: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title(format!("Save {label}"))
        .set_file_name(file_name)
        .add_filter(label, &[ext])
        .save_file()
}

/// Bytes are fully serialized before this is called, so a failed export
/// never leaves a partial file behind.
fn write_export(path: &std::path::Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn report_outcome(state: &mut AppState, path: &std::path::Path, result: anyhow::Result<()>) {
    match result {
        Ok(()) => {
            log::info!("Saved {}", path.display());
            state.status_message = Some(format!("Saved {}", path.display()));
        }
        Err(e) => {
            log::error!("Export failed: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
