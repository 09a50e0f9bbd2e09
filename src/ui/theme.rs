use egui::{
    style::{Selection, Visuals, WidgetVisuals, Widgets},
    Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle,
};

/// Page background behind every panel.
pub const PAGE_BG: Color32 = Color32::from_rgb(0x07, 0x10, 0x26);
/// Backdrop of the map area, visible until tiles arrive.
pub const MAP_BG: Color32 = Color32::from_rgb(0x0f, 0x17, 0x2a);

fn widget(bg_fill: Color32, bg_stroke: Stroke, fg: Color32, expansion: f32) -> WidgetVisuals {
    WidgetVisuals {
        bg_fill,
        weak_bg_fill: bg_fill,
        bg_stroke,
        fg_stroke: Stroke::new(1.0, fg),
        rounding: Rounding::same(8.0),
        expansion,
    }
}

pub fn dark_theme_style(ctx: &egui::Context) -> Style {
    let mut style = (*ctx.style()).clone();

    style.text_styles = [
        (TextStyle::Heading, FontId::new(22.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
    ]
    .into();

    let text = Color32::from_rgb(0xed, 0xf2, 0xf7);
    let faint = Stroke::new(1.0, Color32::from_white_alpha(15));

    style.visuals = Visuals::dark();
    style.visuals.override_text_color = Some(text);
    style.visuals.widgets = Widgets {
        noninteractive: widget(PAGE_BG, faint, text, 0.0),
        inactive: widget(Color32::from_rgb(0x0b, 0x12, 0x20), faint, text, 0.0),
        hovered: widget(Color32::from_rgb(0x11, 0x1c, 0x33), Stroke::new(1.0, Color32::from_gray(120)), Color32::WHITE, 0.5),
        active: widget(Color32::from_rgb(0x15, 0x24, 0x40), Stroke::new(1.0, Color32::WHITE), Color32::WHITE, 1.0),
        open: widget(Color32::from_rgb(0x0b, 0x12, 0x20), faint, Color32::WHITE, 0.0),
    };

    style.visuals.selection = Selection {
        bg_fill: Color32::from_rgb(0x0e, 0x6e, 0x6b),
        stroke: Stroke::new(1.0, Color32::WHITE),
    };
    style.visuals.extreme_bg_color = Color32::from_rgb(0x0b, 0x12, 0x20);
    style.visuals.window_rounding = Rounding::same(12.0);
    style.visuals.window_shadow = egui::Shadow {
        offset: egui::vec2(0.0, 6.0),
        blur: 24.0,
        spread: 0.0,
        color: Color32::from_black_alpha(150),
    };
    style.visuals.window_fill = Color32::from_rgb(0x08, 0x18, 0x27);
    style.visuals.window_stroke = faint;
    style.visuals.panel_fill = PAGE_BG;

    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    style.spacing.item_spacing = egui::vec2(8.0, 8.0);

    style
}
