use egui::{Align2, Area, Context, Frame, Id, Order, RichText, Ui};

use crate::gui::app;
use crate::network::device::DeviceRecord;
use crate::scan::source::ProbeReport;

/// Lifecycle of the on-demand deep probe shown at the bottom of the panel.
#[derive(Debug, Clone, Default)]
pub enum ProbeState {
    #[default]
    Idle,
    Loading,
    Done(ProbeReport),
    Failed(String),
}

/// What the caller needs to react to after drawing the panel.
#[derive(Debug, Clone, Default)]
pub struct DetailPanelResponse {
    pub close_clicked: bool,
    pub probe_clicked: bool,
    pub admin_clicked: bool,
}

/// Floating inspector for the selected device.
///
/// Anchored to the graph corner rather than the node itself, since the
/// layout keeps nodes moving. `record` is `None` only for the synthetic
/// gateway anchor, which has no backing scan record.
pub struct DetailPanel<'a> {
    pub device_id: &'a str,
    pub record: Option<&'a DeviceRecord>,
    pub is_router: bool,
    pub probe: &'a ProbeState,
}

impl DetailPanel<'_> {
    pub fn show(&self, ctx: &Context) -> DetailPanelResponse {
        let mut resp = DetailPanelResponse::default();
        Area::new(Id::new("device_detail_panel"))
            .anchor(Align2::LEFT_TOP, egui::vec2(16.0, 16.0))
            .order(Order::Foreground)
            .show(ctx, |ui| {
                Frame::window(&ctx.style()).show(ui, |ui| {
                    ui.set_min_width(260.0);
                    ui.horizontal(|ui| {
                        ui.heading(self.device_id);
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("✖").on_hover_text("Close").clicked() {
                                resp.close_clicked = true;
                            }
                        });
                    });
                    ui.separator();

                    match self.record {
                        Some(record) => self.render_record(ui, record),
                        None => {
                            // Synthetic anchor: nothing was scanned here.
                            ui.label("Gateway anchor (no scan record)");
                        }
                    }

                    ui.separator();
                    ui.horizontal(|ui| {
                        let probing = matches!(self.probe, ProbeState::Loading);
                        if ui
                            .add_enabled(!probing, egui::Button::new("Deep scan"))
                            .on_hover_text("Probe OS and services on this device")
                            .clicked()
                        {
                            resp.probe_clicked = true;
                        }
                        if self.is_router && ui.button("Open admin panel").clicked() {
                            resp.admin_clicked = true;
                        }
                    });

                    self.render_probe(ui);
                });
            });
        resp
    }

    fn render_record(&self, ui: &mut Ui, record: &DeviceRecord) {
        labeled_row(ui, "HOST", record.hostname_display());
        labeled_row(ui, "MAC", record.mac_display());
        labeled_row(ui, "VENDOR", record.vendor_display());
        labeled_row(ui, "TYPE", &record.kind.as_str().to_uppercase());
        labeled_row(ui, "LATENCY", record.latency_display());
        labeled_row(
            ui,
            "STATUS",
            if record.active { "ONLINE" } else { "OFFLINE" },
        );
        labeled_row(ui, "PORTS", &record.ports_display());
    }

    fn render_probe(&self, ui: &mut Ui) {
        match self.probe {
            ProbeState::Idle => {}
            ProbeState::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("probing...");
                });
            }
            ProbeState::Done(report) => {
                ui.separator();
                labeled_row(ui, "OS", &report.os);
                if report.services.is_empty() {
                    ui.label("No services detected");
                } else {
                    collapsible_section(ui, "Services", true, |ui| {
                        bullet_list(ui, report.services.iter());
                    });
                }
            }
            ProbeState::Failed(message) => {
                ui.colored_label(app::get_theme().red, format!("probe failed: {}", message));
            }
        }
    }
}

fn labeled_row(ui: &mut Ui, label: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(label).strong().monospace());
        ui.label(RichText::new(value).monospace());
    });
}

/// Small collapsing block used to keep panel content modular.
pub fn collapsible_section(
    ui: &mut Ui,
    title: &str,
    default_open: bool,
    add_contents: impl FnOnce(&mut Ui),
) {
    egui::CollapsingHeader::new(title)
        .default_open(default_open)
        .show(ui, add_contents);
}

pub fn bullet_list<I, T>(ui: &mut Ui, items: I)
where
    I: Iterator<Item = T>,
    T: std::fmt::Display,
{
    for item in items {
        ui.label(format!("• {}", item));
    }
}
