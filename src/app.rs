use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::LoadConfig;
use crate::state::AppState;
use crate::ui::{charts, panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct KitchenPnlApp {
    pub state: AppState,
}

impl KitchenPnlApp {
    /// Build the app and try the configured source straight away.
    pub fn new(config: LoadConfig) -> Self {
        let mut state = AppState::new(config.clone());
        state.load(config);
        Self { state }
    }
}

impl eframe::App for KitchenPnlApp {
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

        // ---- Central panel: charts + snapshot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            dashboard(ui, &self.state);
        });
    }
}

fn dashboard(ui: &mut Ui, state: &AppState) {
    if let Some(err) = &state.schema_error {
        ui.heading(RichText::new("Cannot build the dashboard").color(Color32::RED));
        ui.label(err.to_string());
        ui.add_space(8.0);
        ui.strong("Columns after cleaning:");
        for col in err.columns() {
            ui.monospace(col);
        }
        ui.add_space(8.0);
        ui.label("Check the header row setting or open another file.");
        return;
    }

    if state.table.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a P&L file to build the dashboard  (File → Open…)");
        });
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading(RichText::new("Kitchen Level P&L Dashboard").size(22.0));
            charts::section_gap(ui);
            charts::monthly_trend_chart(ui, state);
            charts::section_gap(ui);
            charts::category_pie(ui, state);
            charts::section_gap(ui);
            charts::store_bar_chart(ui, state);
            charts::section_gap(ui);
            table::snapshot_table(ui, state);
        });
}
