pub mod panels;
pub mod plot;

use eframe::egui::Color32;
use yieldscope::color::Rgb;

pub fn color32(c: Rgb) -> Color32 {
    Color32::from_rgb(c.0, c.1, c.2)
}
