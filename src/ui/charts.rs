use std::f32::consts::{FRAC_PI_2, TAU};
use std::ops::RangeInclusive;

use eframe::egui::{self, Color32, RichText, Sense, Shape, Stroke, Ui, Vec2};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints};

use crate::color::generate_palette;
use crate::data::aggregate::shares;
use crate::state::AppState;

const CHART_HEIGHT: f32 = 280.0;

/// X-axis formatter showing `labels[i]` at integer positions only.
fn label_formatter(
    labels: Vec<String>,
) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String + 'static {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let i = mark.value.round();
        if (mark.value - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Monthly trend (line chart)
// ---------------------------------------------------------------------------

/// Net revenue, gross margin and kitchen EBITDA summed per month.
pub fn monthly_trend_chart(ui: &mut Ui, state: &AppState) {
    ui.heading("Monthly Trend: Revenue, Margin, EBITDA");
    let trend = &state.views.monthly;
    if trend.is_empty() {
        ui.label("No rows match the current filters.");
        return;
    }

    let labels: Vec<String> = trend.iter().map(|m| m.month.clone()).collect();
    let colors = generate_palette(3);
    let series: [(&str, Vec<f64>); 3] = [
        ("NET_REVENUE", trend.iter().map(|m| m.net_revenue).collect()),
        ("GROSS_MARGIN", trend.iter().map(|m| m.gross_margin).collect()),
        ("KITCHEN_EBITDA", trend.iter().map(|m| m.kitchen_ebitda).collect()),
    ];

    Plot::new("monthly_trend")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label("MONTH")
        .x_axis_formatter(label_formatter(labels))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for ((name, values), color) in series.into_iter().zip(colors) {
                let points: PlotPoints = values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| [i as f64, v])
                    .collect();
                plot_ui.line(Line::new(points).name(name).color(color).width(2.0));
            }
        });
}

// ---------------------------------------------------------------------------
// EBITDA category distribution (pie chart)
// ---------------------------------------------------------------------------

/// Share of filtered rows per EBITDA category, drawn with the painter.
pub fn category_pie(ui: &mut Ui, state: &AppState) {
    ui.heading("EBITDA Category Distribution");
    let counts = &state.views.categories;
    if counts.is_empty() {
        ui.label("No rows match the current filters.");
        return;
    }
    let fractions = shares(counts);
    let colors: Vec<Color32> = counts
        .iter()
        .map(|c| state.category_colors.color_for(&c.category))
        .collect();

    ui.horizontal(|ui| {
        let size = CHART_HEIGHT.min(ui.available_width() * 0.5);
        let (rect, _) = ui.allocate_exact_size(Vec2::splat(size), Sense::hover());
        let painter = ui.painter_at(rect);
        let center = rect.center();
        let radius = size * 0.45;
        let separator = Stroke::new(1.0, ui.visuals().extreme_bg_color);

        // Start at 12 o'clock, go clockwise.  Slices are split into pieces
        // of at most a quarter turn so every polygon stays convex.
        let mut start = -FRAC_PI_2;
        for (&fraction, &color) in fractions.iter().zip(&colors) {
            let sweep = fraction as f32 * TAU;
            let pieces = (sweep / FRAC_PI_2).ceil().max(1.0) as usize;
            for p in 0..pieces {
                let a0 = start + sweep * p as f32 / pieces as f32;
                let a1 = start + sweep * (p + 1) as f32 / pieces as f32;
                let steps = 24;
                let mut points = vec![center];
                for k in 0..=steps {
                    let a = a0 + (a1 - a0) * k as f32 / steps as f32;
                    points.push(center + radius * Vec2::angled(a));
                }
                painter.add(Shape::convex_polygon(points, color, Stroke::NONE));
            }
            if fractions.len() > 1 {
                painter.line_segment([center, center + radius * Vec2::angled(start)], separator);
            }
            start += sweep;
        }

        ui.vertical(|ui| {
            for ((count, fraction), color) in counts.iter().zip(&fractions).zip(&colors) {
                ui.horizontal(|ui| {
                    let (dot, _) = ui.allocate_exact_size(Vec2::new(10.0, 10.0), Sense::hover());
                    ui.painter_at(dot).circle_filled(dot.center(), 4.0, *color);
                    ui.label(&count.category);
                    ui.label(
                        RichText::new(format!("{} rows ({:.1}%)", count.count, fraction * 100.0))
                            .color(ui.visuals().weak_text_color()),
                    );
                });
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Store performance (bar chart)
// ---------------------------------------------------------------------------

/// Net revenue summed per store.
pub fn store_bar_chart(ui: &mut Ui, state: &AppState) {
    ui.heading("Store-wise Net Revenue");
    let stores = &state.views.stores;
    if stores.is_empty() {
        ui.label("No rows match the current filters.");
        return;
    }

    let labels: Vec<String> = stores.iter().map(|s| s.store.clone()).collect();
    let bars: Vec<Bar> = stores
        .iter()
        .enumerate()
        .map(|(i, s)| Bar::new(i as f64, s.net_revenue).name(&s.store).width(0.6))
        .collect();
    let color = generate_palette(1)
        .first()
        .copied()
        .unwrap_or(Color32::LIGHT_BLUE);

    Plot::new("store_performance")
        .height(CHART_HEIGHT)
        .x_axis_label("STORE")
        .y_axis_label("NET_REVENUE")
        .x_axis_formatter(label_formatter(labels))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("NET_REVENUE").color(color));
        });
}

/// Fixed-width separator between dashboard sections.
pub fn section_gap(ui: &mut Ui) {
    ui.add_space(8.0);
    ui.add(egui::Separator::default().spacing(12.0));
}
