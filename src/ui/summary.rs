use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::heat_color;
use crate::data::model::CellValue;
use crate::data::stats::Statistic;
use crate::report::format::{format_currency, format_statistic};
use crate::state::AppState;
use crate::ui::plot;

// ---------------------------------------------------------------------------
// KPI row
// ---------------------------------------------------------------------------

pub fn kpis(ui: &mut Ui, state: &AppState) {
    let schema = state.schema;
    let kpis = &state.summary.kpis;

    let mut figures = vec![
        (schema.total_label, format_currency(kpis.total)),
        (schema.average_label, format_currency(kpis.average)),
    ];
    if let (Some(approved), Some(status)) = (kpis.approved_total, schema.status) {
        figures.push((status.approved_label, format_currency(approved)));
    }

    ui.columns(figures.len(), |columns| {
        for (col, (label, value)) in columns.iter_mut().zip(figures) {
            col.vertical_centered(|ui: &mut Ui| {
                ui.label(label);
                ui.label(RichText::new(value).heading().strong());
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// Statistic picker, the chosen values, and the status counts chart.
pub fn statistics(ui: &mut Ui, state: &mut AppState) {
    ui.heading("📈 Statistics");

    ui.horizontal_wrapped(|ui: &mut Ui| {
        for stat in Statistic::ALL {
            let mut checked = state.selected_stats.contains(&stat);
            if ui.checkbox(&mut checked, stat.label()).changed() {
                state.toggle_statistic(stat);
            }
        }
    });

    egui::Grid::new("statistics_grid")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            for line in &state.summary.statistics {
                ui.label(line.statistic.label());
                let value = match (line.statistic, line.value) {
                    (Statistic::Count, Some(n)) => format!("{n:.0}"),
                    (_, v) => format_statistic(v),
                };
                ui.monospace(value);
                ui.end_row();
            }
        });

    plot::status_counts(ui, state);
}

// ---------------------------------------------------------------------------
// Correlation heatmap
// ---------------------------------------------------------------------------

/// Pairwise correlations of the numeric columns. Undefined entries stay
/// blank and uncoloured.
pub fn correlation(ui: &mut Ui, state: &AppState) {
    let matrix = &state.charts.correlation;
    if matrix.columns.is_empty() {
        return;
    }

    ui.heading("Correlation Heatmap");
    egui::Grid::new("correlation_grid")
        .spacing([2.0, 2.0])
        .show(ui, |ui: &mut Ui| {
            ui.label("");
            for name in &matrix.columns {
                ui.strong(name);
            }
            ui.end_row();

            for (name, row) in matrix.columns.iter().zip(&matrix.values) {
                ui.strong(name);
                for value in row {
                    let text = value.map(|v| format!("{v:.2}")).unwrap_or_default();
                    let mut rich = RichText::new(format!("{text:^7}")).monospace();
                    if let Some(color) = heat_color(*value) {
                        rich = rich.background_color(color).color(egui::Color32::BLACK);
                    }
                    ui.label(rich);
                }
                ui.end_row();
            }
        });
}

// ---------------------------------------------------------------------------
// Detail table
// ---------------------------------------------------------------------------

/// Rows of the current view, newest first.
pub fn detail_table(ui: &mut Ui, state: &AppState) {
    let schema = state.schema;
    ui.heading("Detailed Records");

    if state.view.is_empty() {
        ui.label("No rows match the current filters.");
        return;
    }

    let columns: Vec<&str> = schema
        .detail_columns
        .iter()
        .copied()
        .filter(|c| state.view.column_index(c).is_some())
        .collect();

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(320.0)
        .columns(Column::auto().at_least(80.0), columns.len())
        .header(20.0, |mut header| {
            for name in &columns {
                header.col(|ui: &mut Ui| {
                    ui.strong(*name);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, state.display_order.len(), |mut row| {
                let index = state.display_order[row.index()];
                for name in &columns {
                    let text = match state.view.cell(index, name) {
                        Some(CellValue::Float(v)) if schema.is_amount(name) => format_currency(*v),
                        Some(cell) => cell.to_string(),
                        None => String::new(),
                    };
                    row.col(|ui: &mut Ui| {
                        ui.label(text);
                    });
                }
            });
        });
}
