use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use yieldscope::data::ingest::format_field;
use yieldscope::render::draw;

use super::color32;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets and record list
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.records.is_empty() {
        ui.label("No records loaded.");
        return;
    }

    let mut changed = false;

    // ---- Drift field range ----
    changed |= ui
        .checkbox(&mut state.field_enabled, "Drift field [V/cm]")
        .changed();
    ui.add_enabled_ui(state.field_enabled, |ui: &mut Ui| {
        changed |= range_row(ui, &mut state.field_range, 1.0);
    });

    // ---- Recoil energy range (whole record must fit) ----
    changed |= ui
        .checkbox(&mut state.energy_enabled, "Recoil energy [keV]")
        .changed();
    ui.add_enabled_ui(state.energy_enabled, |ui: &mut Ui| {
        changed |= range_row(ui, &mut state.energy_range, 0.1);
    });

    // ---- Interaction type ----
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Interaction");
        let current = state.interaction.clone().unwrap_or_else(|| "Any".into());
        egui::ComboBox::from_id_salt("interaction")
            .selected_text(current)
            .show_ui(ui, |ui: &mut Ui| {
                if ui
                    .selectable_label(state.interaction.is_none(), "Any")
                    .clicked()
                {
                    state.interaction = None;
                    changed = true;
                }
                for kind in &state.interaction_types {
                    let is_current = state.interaction.as_deref() == Some(kind.as_str());
                    if ui.selectable_label(is_current, kind).clicked() {
                        state.interaction = Some(kind.clone());
                        changed = true;
                    }
                }
            });
    });

    if changed {
        state.refilter();
    }

    ui.separator();
    ui.strong(format!(
        "Records  ({}/{})",
        state.visible_indices.len(),
        state.records.len()
    ));

    // ---- Record list, coloured by dataset name ----
    let mut clicked = None;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for &idx in &state.visible_indices {
                let r = &state.records[idx];
                let text = RichText::new(format!(
                    "{}  {} V/cm  ({})",
                    r.identification,
                    format_field(r.field),
                    r.yield_type
                ))
                .color(color32(state.color_map.color_for(&r.name)));
                if ui
                    .selectable_label(state.selected == Some(idx), text)
                    .clicked()
                {
                    clicked = Some(idx);
                }
            }
        });

    if clicked.is_some() {
        state.select(clicked);
    }
}

/// Min/max drag values; returns whether either moved.
fn range_row(ui: &mut Ui, range: &mut (f64, f64), speed: f64) -> bool {
    ui.horizontal(|ui: &mut Ui| {
        let lo = ui.add(egui::DragValue::new(&mut range.0).speed(speed).prefix("min "));
        let hi = ui.add(egui::DragValue::new(&mut range.1).speed(speed).prefix("max "));
        if range.0 > range.1 {
            std::mem::swap(&mut range.0, &mut range.1);
        }
        lo.changed() || hi.changed()
    })
    .inner
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.figure.is_some(), egui::Button::new("Save figure…"))
                .clicked()
            {
                save_figure_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if !state.records.is_empty() {
            ui.label(format!(
                "{} records loaded, {} visible",
                state.records.len(),
                state.visible_indices.len()
            ));
        }

        ui.separator();
        ui.label(format!("Model: {}", state.model.profile().name));

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let Some(dir) = rfd::FileDialog::new()
        .set_title("Open a folder of record files")
        .pick_folder()
    else {
        return;
    };

    match yieldscope::data::loader::load_dir(&dir) {
        Ok(records) => {
            log::info!("Loaded {} records from {}", records.len(), dir.display());
            state.set_records(records);
        }
        Err(e) => {
            log::error!("Failed to load records: {e}");
            state.status_message = Some(format!("Error: {e}"));
        }
    }
}

pub fn save_figure_dialog(state: &mut AppState) {
    let Some(figure) = &state.figure else {
        return;
    };
    let Some(path) = rfd::FileDialog::new()
        .set_title("Save figure")
        .add_filter("SVG", &["svg"])
        .add_filter("PNG", &["png"])
        .set_file_name(yieldscope::render::DEFAULT_FIGURE_FILE)
        .save_file()
    else {
        return;
    };

    match draw::save_figure(figure, &path) {
        Ok(()) => {
            log::info!("Saved figure to {}", path.display());
            state.status_message = None;
        }
        Err(e) => {
            log::error!("Failed to save figure: {e}");
            state.status_message = Some(format!("Error: {e}"));
        }
    }
}
