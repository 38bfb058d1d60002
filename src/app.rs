use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot, summary};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: KPIs, statistics, charts, records ----
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.heading(self.state.schema.title);
                    ui.separator();

                    if self.state.table.is_some() {
                        summary::kpis(ui, &self.state);
                        ui.separator();
                        summary::statistics(ui, &mut self.state);
                        ui.separator();
                    }
                    plot::charts(ui, &self.state);
                    if self.state.table.is_some() {
                        ui.separator();
                        summary::correlation(ui, &self.state);
                        ui.separator();
                        summary::detail_table(ui, &self.state);
                    }
                });
        });
    }
}
