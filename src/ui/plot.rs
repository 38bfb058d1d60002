use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints};

use crate::color::generate_palette;
use crate::data::charts::{x_to_date, BoxChart, GroupedBars, LineChart};
use crate::state::AppState;

const CHART_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Chart area (central panel)
// ---------------------------------------------------------------------------

/// Render every chart of the current view.
pub fn charts(ui: &mut Ui, state: &AppState) {
    if state.table.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view the dashboard  (File → Open…)");
        });
        return;
    }

    ui.heading("📊 Visual Analytics");
    line_chart(ui, state, &state.charts.line);
    for (i, bars) in state.charts.bars.iter().enumerate() {
        grouped_bar_chart(ui, &format!("bars_{i}"), bars);
    }
    if let Some(boxes) = &state.charts.boxes {
        box_chart(ui, boxes);
    }
}

/// Claims count by status, shown next to the statistics.
pub fn status_counts(ui: &mut Ui, state: &AppState) {
    if let Some(counts) = &state.charts.status_counts {
        grouped_bar_chart(ui, "status_counts", counts);
    }
}

fn line_chart(ui: &mut Ui, state: &AppState, chart: &LineChart) {
    ui.label(&chart.title);
    let amount_label = state.schema.amount_column;

    Plot::new("line_chart")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label(state.schema.date_column)
        .y_axis_label(amount_label)
        .x_axis_formatter(|mark, _range| {
            x_to_date(mark.value)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(false)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for series in &chart.series {
                // Determine colour from the colour-by column.
                let color = state
                    .color_map
                    .as_ref()
                    .map(|cm| cm.color_for(&series.name))
                    .unwrap_or(Color32::LIGHT_BLUE);

                let points: PlotPoints = series.points.iter().copied().collect();
                let line = Line::new(points)
                    .name(series.name.to_string())
                    .color(color)
                    .width(1.5);

                plot_ui.line(line);
            }
        });
}

/// Side-by-side bars: category `c` sits at x = `c`, groups are offset
/// within the unit slot.
fn grouped_bar_chart(ui: &mut Ui, id: &str, chart: &GroupedBars) {
    ui.label(&chart.title);

    let n_groups = chart.groups.len().max(1);
    let width = 0.8 / n_groups as f64;
    let palette = generate_palette(chart.groups.len());
    let categories = chart.categories.clone();

    Plot::new(id)
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_formatter(move |mark, _range| category_label(&categories, mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (g, (name, values)) in chart.groups.iter().zip(&chart.values).enumerate() {
                let offset = (g as f64 - (n_groups as f64 - 1.0) / 2.0) * width;
                let bars: Vec<Bar> = values
                    .iter()
                    .enumerate()
                    .map(|(c, v)| {
                        Bar::new(c as f64 + offset, *v)
                            .width(width)
                            .name(format!("{} / {name}", chart.categories[c]))
                    })
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).name(name).color(palette[g]));
            }
        });
}

fn box_chart(ui: &mut Ui, chart: &BoxChart) {
    ui.label(&chart.title);

    let palette = generate_palette(chart.boxes.len());
    let categories: Vec<String> = chart.boxes.iter().map(|b| b.category.clone()).collect();

    Plot::new("box_chart")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_formatter(move |mark, _range| category_label(&categories, mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (i, b) in chart.boxes.iter().enumerate() {
                let spread = BoxSpread::new(b.lower_whisker, b.q1, b.median, b.q3, b.upper_whisker);
                let elem = BoxElem::new(i as f64, spread)
                    .name(&b.category)
                    .box_width(0.5);
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&b.category).color(palette[i]));
            }
        });
}

/// Axis label for integer positions only.
fn category_label(categories: &[String], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    categories.get(rounded as usize).cloned().unwrap_or_default()
}
