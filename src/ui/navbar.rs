use egui::{Color32, RichText};

pub const NAVBAR_HEIGHT: f32 = 72.0;

/// Static branding header. The search box is a placeholder and filters nothing.
#[derive(Debug, Default)]
pub struct Navbar {
    search: String,
}

impl Navbar {
    pub fn show(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("navbar")
            .exact_height(NAVBAR_HEIGHT)
            .frame(
                egui::Frame::none()
                    .fill(Color32::from_rgb(0x0f, 0x21, 0x30))
                    .inner_margin(egui::Margin::symmetric(24.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.vertical(|ui| {
                        ui.add_space(14.0);
                        ui.label(
                            RichText::new("GN Division Viewer")
                                .size(18.0)
                                .strong()
                                .color(Color32::from_rgb(0xe6, 0xee, 0xf8)),
                        );
                        ui.label(
                            RichText::new("Sri Lanka — GN Divisions")
                                .size(12.0)
                                .color(Color32::from_rgb(0x94, 0xa3, 0xb8)),
                        );
                    });

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let (rect, _) = ui.allocate_exact_size(egui::vec2(40.0, 40.0), egui::Sense::hover());
                        ui.painter().circle(
                            rect.center(),
                            20.0,
                            Color32::from_rgb(0x0f, 0x17, 0x2a),
                            egui::Stroke::new(1.0, Color32::from_white_alpha(10)),
                        );
                        ui.painter().text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            "AS",
                            egui::FontId::proportional(14.0),
                            Color32::from_rgb(0x94, 0xa3, 0xb8),
                        );
                        ui.add_space(12.0);
                        ui.add(
                            egui::TextEdit::singleline(&mut self.search)
                                .hint_text("Search divisions...")
                                .desired_width(220.0),
                        );
                    });
                });
            });
    }
}
