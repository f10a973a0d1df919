use eframe::egui::{self, Align, Layout, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

const HEADERS: [&str; 5] = ["STORE", "MONTH", "NET_REVENUE", "GROSS_MARGIN", "KITCHEN_EBITDA"];

fn text(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("")
}

fn number(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Filtered kitchen snapshot: one row per visible record.
pub fn snapshot_table(ui: &mut Ui, state: &AppState) {
    ui.heading("Filtered Kitchen Snapshot");
    let rows = &state.views.snapshot;

    ui.push_id("snapshot_table", |ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(Layout::left_to_right(Align::Center))
            .column(Column::auto().at_least(120.0))
            .column(Column::auto().at_least(90.0))
            .columns(Column::auto().at_least(110.0), 2)
            .column(Column::remainder())
            .max_scroll_height(360.0)
            .header(20.0, |mut header| {
                for name in HEADERS {
                    header.col(|ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, rows.len(), |mut row| {
                    let r = &rows[row.index()];
                    row.col(|ui| {
                        ui.label(text(&r.store));
                    });
                    row.col(|ui| {
                        ui.label(text(&r.month));
                    });
                    for v in [r.net_revenue, r.gross_margin, r.kitchen_ebitda] {
                        row.col(|ui| {
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                ui.label(number(v));
                            });
                        });
                    }
                });
            });
    });

    if rows.is_empty() {
        ui.label(egui::RichText::new("No rows match the current filters.").weak());
    }
}
