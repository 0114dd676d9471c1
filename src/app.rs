use eframe::egui;

use yieldscope::physics::ParametricNrModel;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct YieldscopeApp {
    pub state: AppState,
}

impl YieldscopeApp {
    pub fn new(model: ParametricNrModel) -> Self {
        Self {
            state: AppState::new(model),
        }
    }
}

impl eframe::App for YieldscopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters and record list ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: comparison plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::comparison_plot(ui, &self.state);
        });
    }
}
