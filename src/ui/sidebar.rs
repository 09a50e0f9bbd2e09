use std::collections::HashSet;
use std::sync::Arc;

use egui::{Color32, RichText};

use crate::map::division::{BoundaryLayer, DivisionFeature};
use crate::map::measure::Metrics;
use crate::selection::SelectionController;

pub const SIDEBAR_WIDTH: f32 = 320.0;

const CARD_FILL: Color32 = Color32::from_rgb(0x07, 0x10, 0x26);
const CARD_TITLE: Color32 = Color32::from_rgb(0xcb, 0xd5, 0xe1);
const CARD_TEXT: Color32 = Color32::from_rgb(0xed, 0xf2, 0xf7);
const AREA_ACCENT: Color32 = Color32::from_rgb(0xfb, 0xbf, 0x24);
const PERIMETER_ACCENT: Color32 = Color32::from_rgb(0x60, 0xa5, 0xfa);
const POPULATION_ACCENT: Color32 = Color32::from_rgb(0x86, 0xef, 0xac);
pub const TEAL: Color32 = Color32::from_rgb(0x0e, 0xa5, 0xa0);

/// Labels that stand in for a missing name in the source data.
fn is_placeholder(label: &str) -> bool {
    label.is_empty() || label.eq_ignore_ascii_case("unknown") || label.eq_ignore_ascii_case("undefined")
}

/// Divisions matching a free-text query, one per display label, in dataset order.
///
/// The query is matched case-insensitively against the label, GN name and DS name.
/// Features without a usable label are left out.
pub fn filter_divisions<'a>(
    features: &'a [Arc<DivisionFeature>],
    query: &str,
) -> Vec<&'a Arc<DivisionFeature>> {
    let query = query.trim().to_lowercase();
    let mut seen = HashSet::new();
    features
        .iter()
        .filter(|feature| {
            let label = feature.label().trim();
            if is_placeholder(label) {
                return false;
            }
            let haystack = format!("{} {} {}", label, feature.gn_name(), feature.ds_name()).to_lowercase();
            haystack.contains(&query)
        })
        .filter(|feature| seen.insert(feature.label().trim().to_string()))
        .collect()
}

fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_area(metrics: Option<Metrics>) -> String {
    match metrics {
        Some(m) if m.area_m2 > 0.0 => format!("{:.3} sqkm", m.area_km2()),
        _ => "—".to_string(),
    }
}

pub fn format_perimeter(metrics: Option<Metrics>) -> String {
    match metrics {
        Some(m) if m.perimeter_m > 0.0 => format!("{:.2} m", m.perimeter_m),
        _ => String::new(),
    }
}

pub fn format_population(population: Option<u32>) -> String {
    population.map(group_thousands).unwrap_or_default()
}

/// What the user asked for in the sidebar this frame.
pub enum SidebarAction {
    Select(Option<Arc<DivisionFeature>>),
}

#[derive(Debug)]
pub struct Sidebar {
    pub open: bool,
    filter: String,
}

impl Default for Sidebar {
    fn default() -> Self {
        Self {
            open: true,
            filter: String::new(),
        }
    }
}

fn card(ui: &mut egui::Ui, title: &str, accent: Color32, value: impl Into<String>) {
    egui::Frame::none()
        .fill(CARD_FILL)
        .rounding(12.0)
        .inner_margin(egui::Margin::symmetric(14.0, 12.0))
        .stroke(egui::Stroke::new(1.0, Color32::from_white_alpha(8)))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(title).size(13.0).strong().color(accent));
            ui.label(RichText::new(value.into()).size(15.0).color(CARD_TEXT));
        });
}

impl Sidebar {
    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        boundaries: &BoundaryLayer,
        selection: &SelectionController,
    ) -> Option<SidebarAction> {
        let mut action = None;
        egui::SidePanel::left("division_sidebar")
            .resizable(false)
            .exact_width(SIDEBAR_WIDTH)
            .frame(
                egui::Frame::none()
                    .fill(Color32::from_rgb(0x07, 0x10, 0x26))
                    .inner_margin(24.0),
            )
            .show_animated(ctx, self.open, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    action = self.contents(ui, boundaries, selection);
                });
            });
        action
    }

    fn contents(
        &mut self,
        ui: &mut egui::Ui,
        boundaries: &BoundaryLayer,
        selection: &SelectionController,
    ) -> Option<SidebarAction> {
        let mut action = None;

        ui.label(RichText::new("Division Info").size(22.0).strong().color(Color32::from_rgb(0xe6, 0xee, 0xf8)));
        ui.add_space(12.0);

        ui.add(
            egui::TextEdit::singleline(&mut self.filter)
                .hint_text("Filter division (ADM3_EN / DS / GN)...")
                .desired_width(f32::INFINITY),
        );
        ui.add_space(12.0);

        let current = selection.current();
        let selected_text = current
            .map(|s| s.feature.label().to_string())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| "Select Division (ADM3_EN)".to_string());

        let matches = filter_divisions(boundaries.features(), &self.filter);
        egui::ComboBox::from_id_salt("division_select")
            .width(ui.available_width())
            .height(400.0)
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                if ui.selectable_label(current.is_none(), "Select Division (ADM3_EN)").clicked() {
                    action = Some(SidebarAction::Select(None));
                }
                for feature in &matches {
                    let label = feature.label().trim();
                    let is_current = current.is_some_and(|s| s.feature.label().trim() == label);
                    let text = format!("{} - {}", label, feature.list_suffix());
                    if ui.selectable_label(is_current, text).clicked() {
                        action = Some(SidebarAction::Select(boundaries.find_by_label(feature.label()).cloned()));
                    }
                }
            });
        ui.label(
            RichText::new(format!("{} of {} divisions", matches.len(), boundaries.len()))
                .small()
                .color(Color32::from_gray(140)),
        );
        ui.add_space(18.0);

        let Some(current) = current else {
            return action;
        };
        let feature = &current.feature;

        ui.spacing_mut().item_spacing.y = 12.0;
        card(ui, "ADM3_EN", CARD_TITLE, feature.label());
        card(ui, "ADM2_EN / DS", CARD_TITLE, feature.ds_division());
        if !feature.province().is_empty() {
            card(ui, "Province", CARD_TITLE, feature.province());
        }
        ui.columns(2, |columns| {
            card(&mut columns[0], "Area (sqkm)", AREA_ACCENT, format_area(selection.metrics()));
            card(&mut columns[1], "Perimeter", PERIMETER_ACCENT, format_perimeter(selection.metrics()));
        });

        egui::Frame::none()
            .fill(Color32::from_rgb(0x07, 0x32, 0x46))
            .rounding(12.0)
            .inner_margin(egui::Margin::symmetric(14.0, 12.0))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.label(RichText::new("Population (est)").size(12.0).strong().color(POPULATION_ACCENT));
                        ui.label(RichText::new(format_population(selection.population())).size(18.0).color(Color32::from_rgb(0xf0, 0xff, 0xf4)));
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let clear = egui::Button::new(RichText::new("Clear").color(Color32::WHITE)).fill(TEAL);
                        if ui.add(clear).clicked() {
                            action = Some(SidebarAction::Select(None));
                        }
                    });
                });
            });

        egui::CollapsingHeader::new("All attributes")
            .default_open(false)
            .show(ui, |ui| {
                let mut keys: Vec<&String> = feature.properties.keys().collect();
                keys.sort();
                egui::Grid::new("division_attributes").striped(true).show(ui, |ui| {
                    for key in keys {
                        ui.label(RichText::new(key).monospace());
                        ui.label(feature.properties[key].to_string());
                        ui.end_row();
                    }
                });
            });

        action
    }
}
