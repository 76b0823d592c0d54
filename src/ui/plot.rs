use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints};

use vk_stats::chart::ChartKind;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Metric chart (central panel)
// ---------------------------------------------------------------------------

/// Render the prepared chart in the central panel.
pub fn metric_plot(ui: &mut Ui, state: &AppState) {
    if state.table.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open an export to view statistics  (File → Open…)");
        });
        return;
    }
    let Some(chart) = &state.chart else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("Nothing to draw for the current selection.");
        });
        return;
    };

    let color = state.colors.color_for(chart.metric);
    let name = chart.metric.as_str();
    let (x_label, y_label) = match chart.kind {
        ChartKind::Histogram => ("Value", "Days"),
        ChartKind::HorizontalBar => (name, "Day"),
        _ => ("Day", name),
    };

    Plot::new("metric_plot")
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| match chart.kind {
            ChartKind::Line => {
                let points: PlotPoints = chart.points().map(|(x, y)| [x, y]).collect();
                plot_ui.line(Line::new(points).name(name).color(color).width(1.5));
            }
            ChartKind::Bar | ChartKind::HorizontalBar => {
                let bars: Vec<Bar> = chart.points().map(|(x, y)| Bar::new(x, y)).collect();
                let mut bar_chart = BarChart::new(bars).name(name).color(color);
                if chart.kind == ChartKind::HorizontalBar {
                    bar_chart = bar_chart.horizontal();
                }
                plot_ui.bar_chart(bar_chart);
            }
            ChartKind::Histogram => {
                let bars: Vec<Bar> = chart
                    .bins
                    .iter()
                    .map(|bin| Bar::new(bin.center(), bin.count as f64).width(bin.width()))
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).name(name).color(color));
            }
        });
}
