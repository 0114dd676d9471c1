use eframe::egui::Ui;
use egui_plot::{Corner, HLine, Legend, Line, LineStyle, Plot, PlotPoints, Points};

use yieldscope::render::draw::format_tick;
use yieldscope::render::{Mark, Panel};

use super::color32;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Comparison plot (central panel)
// ---------------------------------------------------------------------------

/// Render the selected record's figure: data and model above, residuals below.
pub fn comparison_plot(ui: &mut Ui, state: &AppState) {
    let Some(figure) = &state.figure else {
        ui.centered_and_justified(|ui: &mut Ui| {
            if state.records.is_empty() {
                ui.heading("Open a folder of records to compare  (File → Open folder…)");
            } else {
                ui.heading("No record selected");
            }
        });
        return;
    };

    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(&figure.title);
        if let Some(r) = state.selected_record() {
            ui.label(format!(
                "{} · {} samples · {}",
                r.interaction_type,
                r.len(),
                r.name
            ));
        }
    });
    let height = ui.available_height();
    let Some(lower) = &figure.lower else {
        panel_plot(ui, "upper", &figure.upper, height);
        return;
    };
    panel_plot(ui, "upper", &figure.upper, height * 0.68);
    let rest = ui.available_height();
    panel_plot(ui, "lower", lower, rest);
}

fn panel_plot(ui: &mut Ui, id: &str, panel: &Panel, height: f32) {
    let scale = panel.y_scale;
    let (x0, x1) = panel.x_range;

    Plot::new(id)
        .height(height)
        .legend(Legend::default().position(Corner::LeftTop))
        .x_axis_label(panel.x_label.as_str())
        .y_axis_label(panel.y_label.as_str())
        .include_x(x0)
        .include_x(x1)
        .include_y(scale.forward(panel.y_range.0))
        .include_y(scale.forward(panel.y_range.1))
        .y_axis_formatter(move |mark, _range| format_tick(scale.inverse(mark.value)))
        .show(ui, |plot_ui| {
            let guide = color32(yieldscope::color::GUIDE);

            for &y in &panel.hlines {
                plot_ui.hline(
                    HLine::new(scale.forward(y))
                        .color(guide)
                        .style(LineStyle::dashed_loose()),
                );
            }

            for bar in &panel.error_bars {
                let seg = vec![
                    [bar.from.0, scale.forward(bar.from.1)],
                    [bar.to.0, scale.forward(bar.to.1)],
                ];
                plot_ui.line(Line::new(PlotPoints::from(seg)).color(guide).width(1.0));
            }

            for series in &panel.series {
                let pts: Vec<[f64; 2]> = series
                    .points
                    .iter()
                    .map(|&(x, y)| [x, scale.forward(y)])
                    .collect();
                let color = color32(series.color);
                let name = series.label.clone().unwrap_or_default();
                match series.mark {
                    Mark::Markers => plot_ui.points(
                        Points::new(PlotPoints::from(pts))
                            .name(name)
                            .color(color)
                            .radius(3.0),
                    ),
                    Mark::DashedLine => plot_ui.line(
                        Line::new(PlotPoints::from(pts))
                            .name(name)
                            .color(color)
                            .style(LineStyle::dashed_dense())
                            .width(2.0),
                    ),
                }
            }
        });
}
