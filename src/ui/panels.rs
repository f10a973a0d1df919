use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::LoadConfig;
use crate::data::filter::NumericRange;
use crate::data::model::{CategoricalField, NumericField};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.table.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // Clone what we need so we can mutate state inside the loop.
    let options = state.options.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Display-only slider ----
            let field = NumericField::KitchenEbitda;
            let mut range = state.selection.range(field);
            ui.label(RichText::new("display only, does not filter").weak().small());
            if range_sliders(ui, field, options.range(field), &mut range) {
                // Kept in the selection for display; `apply` ignores it.
                *state.selection.range_mut(field) = range;
            }
            ui.separator();

            // ---- Multi-select per categorical field (collapsible) ----
            for field in CategoricalField::ALL {
                let all_values = options.values(field);
                let n_selected = state.selection.values(field).len();
                let header_text = format!("{}  ({n_selected}/{})", field.label(), all_values.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(field.column())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        // Select all / none buttons
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(field);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(field);
                            }
                        });

                        for val in all_values {
                            let mut checked = state.selection.values(field).contains(val);
                            if ui.checkbox(&mut checked, val.as_str()).changed() {
                                state.toggle_value(field, val);
                            }
                        }
                    });
            }
            ui.separator();

            // ---- Range filters ----
            for field in [NumericField::GrossMargin, NumericField::NetRevenue] {
                let mut range = state.selection.range(field);
                if range_sliders(ui, field, options.range(field), &mut range) {
                    state.set_range(field, range);
                }
                ui.add_space(4.0);
            }
        });
}

/// Two sliders bounding `range` to the observed `[min, max]`.  Returns
/// whether the user moved either end.
fn range_sliders(
    ui: &mut Ui,
    field: NumericField,
    bounds: Option<(f64, f64)>,
    range: &mut NumericRange,
) -> bool {
    ui.strong(field.label());
    let Some((min, max)) = bounds else {
        ui.label("no values");
        return false;
    };

    let mut changed = false;
    changed |= ui
        .add(egui::Slider::new(&mut range.lo, min..=max).text("from"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut range.hi, min..=max).text("to"))
        .changed();
    if range.lo > range.hi {
        std::mem::swap(&mut range.lo, &mut range.hi);
    }
    changed
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
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
            let can_export = state.table.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export snapshot…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label("Header row");
        let mut header_row = state.config.header_row;
        if ui
            .add(egui::DragValue::new(&mut header_row).range(0..=100))
            .changed()
        {
            state.set_header_row(header_row);
        }

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} rows loaded, {} visible",
                table.len(),
                state.visible_indices.len()
            ));
            ui.separator();
        }

        let chronological = state.chronological_months;
        if ui
            .selectable_label(chronological, "Chronological months")
            .clicked()
        {
            state.set_chronological_months(!chronological);
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open kitchen P&L data")
        .add_filter(
            "Supported files",
            &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv", "json", "parquet", "pq"],
        )
        .add_filter("Spreadsheets", &["xlsx", "xlsm", "xlsb", "xls", "ods"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        let config = LoadConfig {
            path,
            header_row: state.config.header_row,
            sheet: None,
        };
        state.load(config);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered snapshot")
        .set_file_name("kitchen_snapshot.csv")
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        match state.export_snapshot(&path) {
            Ok(()) => {
                state.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to export snapshot: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
