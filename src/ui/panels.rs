use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use vk_stats::chart::ChartKind;
use vk_stats::data::filter::AGE_BRACKETS;
use vk_stats::data::loader::{load_file, LoadOptions};
use vk_stats::{Gender, Metric};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – query widgets
// ---------------------------------------------------------------------------

/// Render the left query panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Query");
    ui.separator();

    let Some(table) = &state.table else {
        ui.label("No export loaded.");
        return;
    };

    // Clone what we need so we can mutate state below.
    let cities = table.available_cities();
    let countries = table.available_countries();
    let (first_day, last_day) = (table.start_date(), table.end_date());

    let mut changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Metric selector ----
            ui.strong("Metric");
            let mut metric = state.metric;
            egui::ComboBox::from_id_salt("metric")
                .selected_text(metric.as_str())
                .show_ui(ui, |ui: &mut Ui| {
                    for m in Metric::ALL {
                        ui.selectable_value(&mut metric, m, m.as_str());
                    }
                });
            if metric != state.metric {
                state.set_metric(metric);
            }
            ui.separator();

            // ---- Sub-key widgets ----
            if matches!(state.metric, Metric::Age | Metric::GenderAge) {
                ui.strong("Age");
                egui::ComboBox::from_id_salt("age")
                    .selected_text(state.age.as_str())
                    .show_ui(ui, |ui: &mut Ui| {
                        for bracket in AGE_BRACKETS {
                            changed |= ui
                                .selectable_value(&mut state.age, bracket.to_string(), bracket)
                                .changed();
                        }
                    });
            }
            if matches!(state.metric, Metric::Gender | Metric::GenderAge) {
                ui.strong("Gender");
                ui.horizontal(|ui: &mut Ui| {
                    for gender in Gender::ALL {
                        changed |= ui.radio_value(&mut state.gender, gender, gender.code()).changed();
                    }
                });
            }
            if state.metric == Metric::City {
                changed |= name_selector(ui, "city", &mut state.city, &cities);
            }
            if state.metric == Metric::Country {
                changed |= name_selector(ui, "country", &mut state.country, &countries);
            }

            // ---- Date range ----
            ui.separator();
            ui.strong("Dates");
            ui.label(format!("available {first_day} … {last_day}"));
            ui.horizontal(|ui: &mut Ui| {
                ui.label("from");
                changed |= ui
                    .add(DatePickerButton::new(&mut state.start).id_salt("start_date"))
                    .changed();
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("to");
                changed |= ui
                    .add(DatePickerButton::new(&mut state.end).id_salt("end_date"))
                    .changed();
            });
            if ui.small_button("Full range").clicked() {
                state.start = first_day;
                state.end = last_day;
                changed = true;
            }

            // ---- Chart options ----
            ui.separator();
            ui.strong("Chart");
            ui.horizontal(|ui: &mut Ui| {
                ui.label("x offset");
                changed |= ui.add(egui::DragValue::new(&mut state.offset)).changed();
            });
            for kind in ChartKind::allowed_for(state.metric) {
                changed |= ui.radio_value(&mut state.kind, *kind, kind.label()).changed();
            }
        });

    if changed {
        state.refresh();
    }
}

fn name_selector(ui: &mut Ui, id: &str, selected: &mut Option<String>, names: &[String]) -> bool {
    let mut changed = false;
    ui.strong(id);
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected.as_deref().unwrap_or("—"))
        .show_ui(ui, |ui: &mut Ui| {
            for name in names {
                changed |= ui
                    .selectable_value(selected, Some(name.clone()), name)
                    .changed();
            }
        });
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
        });

        ui.separator();

        if let Some(name) = state.source_name() {
            ui.strong(name);
        }
        if let Some(table) = &state.table {
            ui.label(format!(
                "{} rows, {} … {}",
                table.len(),
                table.start_date(),
                table.end_date()
            ));
        }
        if let Some(chart) = &state.chart {
            ui.separator();
            ui.label(format!("{}: {} points", chart.metric, chart.values.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open statistics export")
        .add_filter("Supported files", &["xls", "csv"])
        .add_filter("Excel 97-2003", &["xls"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        match load_file(&path, &LoadOptions::default()) {
            Ok(table) => {
                log::info!(
                    "Loaded {} rows from {} ({} … {})",
                    table.len(),
                    path.display(),
                    table.start_date(),
                    table.end_date()
                );
                state.set_table(table, &path);
            }
            Err(e) => {
                let e = anyhow::Error::new(e);
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
