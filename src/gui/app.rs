use std::sync::{Arc, mpsc};
use std::time::{Instant, SystemTime};

use eframe::egui;
use egui::{CentralPanel, CollapsingHeader, Context, SidePanel, Ui};
use egui_extras::{Column, TableBuilder};
use egui_graphs::{
    FruchtermanReingoldWithCenterGravity, FruchtermanReingoldWithCenterGravityState,
    LayoutForceDirected, SettingsInteraction, SettingsNavigation,
};
use petgraph::{Directed, csr::DefaultIx};
use tokio::runtime::Runtime;

use crate::data_aquisition::http::ScanApiClient;
use crate::gui::detail_panel::{DetailPanel, ProbeState};
use crate::gui::edge_anim;
use crate::gui::edge_shape::LinkShape;
use crate::gui::node_shape::{self, DeviceNodeShape};
use crate::gui::overlay::{self, AnimationOverlay, FRAME_INTERVAL};
use crate::network::device::{DeviceNode, DeviceRecord, DeviceType, NetworkStats, listing_order};
use crate::network::edge::Link;
use crate::network::network_graph::TopologyGraph;
use crate::scan::session::{MonitorState, MonitoringSession, POLL_INTERVAL};
use crate::scan::source::{ProbeReport, QualityReport, ScanBackend, ScanError, ScanSnapshot};

pub fn main(rt: Arc<Runtime>) {
    let native_options = eframe::NativeOptions::default();
    let result = eframe::run_native(
        "LAN Topology Monitor",
        native_options,
        Box::new(move |cc| {
            let app = App::new(cc, rt.clone());
            Ok(Box::new(app) as Box<dyn eframe::App>)
        }),
    );

    if let Err(e) = result {
        println!("{}", e);
    }
}

type Layout = FruchtermanReingoldWithCenterGravity;
type LayoutState = FruchtermanReingoldWithCenterGravityState;

/// Accent palette shared by the shapes, the overlay and the panels.
pub fn get_theme() -> catppuccin_egui::Theme {
    catppuccin_egui::MOCHA
}

/// Device-type filter cycled from the side panel. Filtered-out nodes are
/// dimmed, never removed; reconciliation identity is unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    All,
    Mobile,
    Desktop,
    Server,
}

impl TypeFilter {
    pub const CYCLE: [TypeFilter; 4] = [
        TypeFilter::All,
        TypeFilter::Mobile,
        TypeFilter::Desktop,
        TypeFilter::Server,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TypeFilter::All => "All",
            TypeFilter::Mobile => "Mobile",
            TypeFilter::Desktop => "Desktop",
            TypeFilter::Server => "Server",
        }
    }

    pub fn matches(&self, kind: DeviceType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Mobile => kind == DeviceType::Mobile,
            TypeFilter::Desktop => matches!(kind, DeviceType::Desktop | DeviceType::Laptop),
            TypeFilter::Server => kind == DeviceType::Server,
        }
    }
}

/// Everything the background tasks report back to the UI thread.
enum AppEvent {
    InitialStatus(Result<ScanSnapshot, ScanError>),
    LocalIp(Result<String, ScanError>),
    StartAck(Result<(), ScanError>),
    StopAck(Result<(), ScanError>),
    Scan {
        epoch: u64,
        result: Result<ScanSnapshot, ScanError>,
    },
    Probe {
        ip: String,
        result: Result<ProbeReport, ScanError>,
    },
}

struct App {
    backend: Arc<dyn ScanBackend>,
    session: MonitoringSession,
    graph: TopologyGraph,
    overlay: AnimationOverlay,

    runtime: Arc<Runtime>,
    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,

    layout_state: LayoutState,

    local_ip: Option<String>,
    devices: Vec<DeviceRecord>,
    stats: NetworkStats,
    quality: Option<QualityReport>,
    last_snapshot_at: Option<SystemTime>,
    last_error: Option<String>,

    selected_device: Option<String>,
    probe: ProbeState,
    filter: TypeFilter,

    base_url_edit: String,
}

impl App {
    fn new(cc: &eframe::CreationContext<'_>, runtime: Arc<Runtime>) -> Self {
        catppuccin_egui::set_theme(&cc.egui_ctx, get_theme());

        let client = ScanApiClient::default();
        let base_url_edit = client.base_url().to_string();
        let (events_tx, events_rx) = mpsc::channel();

        let app = Self {
            backend: Arc::new(client),
            session: MonitoringSession::new(POLL_INTERVAL),
            graph: TopologyGraph::default(),
            overlay: AnimationOverlay::default(),
            runtime,
            events_tx,
            events_rx,
            layout_state: LayoutState::default(),
            local_ip: None,
            devices: Vec::new(),
            stats: NetworkStats::default(),
            quality: None,
            last_snapshot_at: None,
            last_error: None,
            selected_device: None,
            probe: ProbeState::Idle,
            filter: TypeFilter::All,
            base_url_edit,
        };
        app.fetch_initial(&cc.egui_ctx);
        app
    }

    fn spawn<F>(&self, ctx: &Context, fut: F)
    where
        F: std::future::Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let event = fut.await;
            let _ = tx.send(event);
            ctx.request_repaint();
        });
    }

    /// One-shot startup fetches: resume an in-progress backend session and
    /// mark the operator's own device.
    fn fetch_initial(&self, ctx: &Context) {
        let backend = self.backend.clone();
        self.spawn(ctx, async move {
            AppEvent::InitialStatus(backend.fetch_snapshot().await)
        });
        let backend = self.backend.clone();
        self.spawn(ctx, async move { AppEvent::LocalIp(backend.local_ip().await) });
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::InitialStatus(Ok(snapshot)) => {
                    if snapshot.is_scanning {
                        println!("[app] Backend scan already active, resuming monitoring");
                        self.session.adopt_running(Instant::now());
                    }
                    self.apply_snapshot(snapshot);
                }
                AppEvent::InitialStatus(Err(e)) => {
                    eprintln!("[app] Initial status fetch failed: {}", e);
                    self.last_error = Some(e.to_string());
                }
                AppEvent::LocalIp(Ok(ip)) => {
                    println!("[app] Local device is {}", ip);
                    self.local_ip = Some(ip);
                }
                AppEvent::LocalIp(Err(e)) => {
                    eprintln!("[app] Local ip lookup failed: {}", e);
                }
                AppEvent::StartAck(Ok(())) => {
                    self.session.confirm_start(Instant::now());
                }
                AppEvent::StartAck(Err(e)) => {
                    eprintln!("[app] Scan start request failed: {}", e);
                    self.session.fail_start();
                    self.last_error = Some(e.to_string());
                }
                AppEvent::StopAck(Ok(())) => {}
                AppEvent::StopAck(Err(e)) => {
                    // The local session is already stopped either way.
                    eprintln!("[app] Scan stop request failed: {}", e);
                }
                AppEvent::Scan { epoch, result } => {
                    if !self.session.accepts(epoch) {
                        println!("[app] Dropping stale poll response (epoch {})", epoch);
                    } else {
                        match result {
                            Ok(snapshot) => self.apply_snapshot(snapshot),
                            Err(e) => {
                                // Prior graph state stays untouched; the next
                                // tick retries.
                                eprintln!("[app] Poll failed: {}", e);
                                self.last_error = Some(e.to_string());
                            }
                        }
                        self.session.poll_finished(Instant::now());
                    }
                }
                AppEvent::Probe { ip, result } => {
                    if self.selected_device.as_deref() == Some(ip.as_str()) {
                        self.probe = match result {
                            Ok(report) => ProbeState::Done(report),
                            Err(e) => ProbeState::Failed(e.to_string()),
                        };
                    }
                }
            }
        }
    }

    /// The reconcile half of a poll tick.
    fn apply_snapshot(&mut self, snapshot: ScanSnapshot) {
        let report = self.graph.reconcile(&snapshot.devices, self.local_ip.as_deref());
        if report.nodes_added + report.nodes_removed + report.edges_added + report.edges_removed > 0
        {
            println!(
                "[app] Reconciled snapshot: +{}/-{} nodes, +{}/-{} edges",
                report.nodes_added, report.nodes_removed, report.edges_added, report.edges_removed
            );
        }
        self.stats = report.stats;
        self.devices = snapshot.devices;
        self.quality = Some(snapshot.quality);
        self.last_snapshot_at = Some(SystemTime::now());
        self.last_error = None;
    }

    fn maybe_poll(&mut self, ctx: &Context) {
        if self.session.poll_due(Instant::now()) {
            let backend = self.backend.clone();
            let epoch = self.session.epoch();
            self.spawn(ctx, async move {
                AppEvent::Scan {
                    epoch,
                    result: backend.fetch_snapshot().await,
                }
            });
        }
    }

    fn request_start(&mut self, ctx: &Context) {
        if !self.session.begin_start() {
            return;
        }
        println!("[app] Requesting backend scan start");
        let backend = self.backend.clone();
        self.spawn(ctx, async move { AppEvent::StartAck(backend.start_scan().await) });
    }

    fn request_stop(&mut self, ctx: &Context) {
        println!("[app] Stopping monitoring");
        self.session.begin_stop();
        let backend = self.backend.clone();
        self.spawn(ctx, async move { AppEvent::StopAck(backend.stop_scan().await) });
    }

    fn request_probe(&mut self, ctx: &Context, ip: &str) {
        self.probe = ProbeState::Loading;
        println!("[app] Probing {}", ip);
        let backend = self.backend.clone();
        let ip = ip.to_string();
        self.spawn(ctx, async move {
            let result = backend.probe_device(&ip).await;
            AppEvent::Probe { ip, result }
        });
    }

    fn apply_backend_url(&mut self, ctx: &Context) {
        let client = ScanApiClient::new(&self.base_url_edit);
        self.base_url_edit = client.base_url().to_string();
        println!("[app] Switched backend to {}", client.base_url());
        self.backend = Arc::new(client);
        self.fetch_initial(ctx);
    }

    /// Mirror the engine's selection into our own state.
    fn read_data(&mut self) {
        if let Some(node_index) = self.graph.graph.selected_nodes().first() {
            if let Some(id) = self.graph.node_id(*node_index) {
                if self.selected_device.as_deref() != Some(id.as_str()) {
                    self.selected_device = Some(id);
                    self.probe = ProbeState::Idle;
                }
            }
        }
    }

    /// Publish the ids the current filter dims; consumed by the node shape
    /// during the draw pass. The router is always shown.
    fn publish_filter_dims(&self) {
        let filter = self.filter;
        node_shape::set_dimmed_ids(
            self.devices
                .iter()
                .filter(|d| !d.is_router_candidate() && !filter.matches(d.kind))
                .map(|d| d.ip.clone()),
        );
    }

    fn render_side_panel(&mut self, ui: &mut Ui, ctx: &Context) {
        let theme = get_theme();
        ui.heading("LAN Topology Monitor");

        match self.session.state() {
            MonitorState::Running => {
                ui.colored_label(theme.green, "SCANNER STATUS: ACTIVE MONITORING")
            }
            MonitorState::Starting => ui.colored_label(theme.yellow, "SCANNER STATUS: STARTING"),
            MonitorState::Stopped => ui.label("SCANNER STATUS: STANDBY"),
        };

        let button_label = match self.session.state() {
            MonitorState::Stopped => "Start monitoring",
            _ => "Stop monitoring",
        };
        if ui.button(button_label).clicked() {
            match self.session.state() {
                MonitorState::Stopped => self.request_start(ctx),
                _ => self.request_stop(ctx),
            }
        }

        if let Some(quality) = &self.quality {
            let hover = if quality.issues.is_empty() {
                "Network is healthy.".to_string()
            } else {
                format!("Issues:\n{}", quality.issues.join("\n"))
            };
            ui.label(format!("NET HEALTH: {}%", quality.score))
                .on_hover_text(hover);
        }
        ui.label(format!("NODES: {}", self.stats.total));

        ui.separator();

        CollapsingHeader::new("Backend")
            .default_open(false)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("URL");
                    ui.text_edit_singleline(&mut self.base_url_edit);
                });
                if ui.button("Connect").clicked() {
                    println!("[app] Pressed connect button");
                    self.apply_backend_url(ctx);
                }
                if ui.button("Open report").clicked() {
                    ctx.open_url(egui::OpenUrl::new_tab(self.backend.report_url()));
                }
                if ui.button("Print snapshot data").clicked() {
                    println!("[app] Pressed print snapshot data button");
                    match serde_json::to_string_pretty(&self.devices) {
                        Ok(json) => println!("{}", json),
                        Err(err) => println!("Error serializing snapshot: {}", err),
                    }
                }
                if let Some(ts) = self.last_snapshot_at {
                    ui.label(format!(
                        "Last snapshot: {}",
                        humantime::format_rfc3339_seconds(ts)
                    ));
                }
                if let Some(err) = &self.last_error {
                    ui.colored_label(theme.red, err);
                }
            });

        ui.separator();

        ui.horizontal(|ui| {
            ui.label(format!("SRV {}", self.stats.server));
            ui.label(format!("DSK {}", self.stats.desktop));
            ui.label(format!("MOB {}", self.stats.mobile));
            ui.label(format!("ETC {}", self.stats.other));
        });

        ui.horizontal(|ui| {
            ui.label("Filter");
            for filter in TypeFilter::CYCLE {
                ui.selectable_value(&mut self.filter, filter, filter.label());
            }
        });

        ui.separator();

        self.render_devices_section(ui);

        ui.separator();

        // Forces section
        CollapsingHeader::new("Forces").default_open(false).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.add(egui::Slider::new(&mut self.layout_state.base.k_scale, 0.2..=3.0).text("k_scale"));
                info_icon(ui, "Scale ideal edge length k; >1 spreads the layout, <1 compacts it.");
            });
            ui.horizontal(|ui| {
                ui.add(egui::Slider::new(&mut self.layout_state.base.c_attract, 0.1..=3.0).text("c_attract"));
                info_icon(ui, "Multiplier for attractive force along edges (higher pulls connected nodes together).");
            });
            ui.horizontal(|ui| {
                ui.add(egui::Slider::new(&mut self.layout_state.base.c_repulse, 0.1..=3.0).text("c_repulse"));
                info_icon(ui, "Multiplier for repulsive force between nodes (higher pushes nodes apart).");
            });

            ui.separator();
            ui.label("Extras");
            ui.horizontal(|ui| {
                ui.checkbox(&mut self.layout_state.extras.0.enabled, "center_gravity");
                info_icon(ui, "Enable/disable center gravity force.");
            });
            ui.add_enabled_ui(self.layout_state.extras.0.enabled, |ui| {
                ui.horizontal(|ui| {
                    ui.add(egui::Slider::new(&mut self.layout_state.extras.0.params.c, 0.0..=2.0).text("center_strength"));
                    info_icon(ui, "Coefficient for pull toward viewport/graph center.");
                });
            });
        });

        ui.separator();
        if ui.button("Print node ids").clicked() {
            println!("[app] Pressed print node ids button");
            for node in self.graph.graph.nodes_iter() {
                println!("{}", node.1.payload().id);
            }
        }
    }

    fn render_devices_section(&mut self, ui: &mut Ui) {
        CollapsingHeader::new("Devices")
            .default_open(true)
            .show(ui, |ui| {
                if self.devices.is_empty() {
                    ui.label("No devices yet. Start monitoring to scan.");
                    return;
                }

                let rows: Vec<(String, DeviceType, bool, String, String)> =
                    listing_order(&self.devices)
                        .into_iter()
                        .map(|d| {
                            (
                                d.ip.clone(),
                                d.kind,
                                d.active,
                                d.hostname_display().to_string(),
                                d.latency_display().to_string(),
                            )
                        })
                        .collect();

                let mut select: Option<String> = None;
                let table = TableBuilder::new(ui)
                    .striped(true)
                    .resizable(true)
                    .column(Column::auto().at_least(100.0))
                    .column(Column::auto().at_least(60.0))
                    .column(Column::auto().at_least(55.0))
                    .column(Column::auto().at_least(80.0))
                    .column(Column::auto().at_least(55.0));

                table
                    .header(20.0, |mut header| {
                        header.col(|ui| {
                            ui.strong("IP");
                        });
                        header.col(|ui| {
                            ui.strong("Type");
                        });
                        header.col(|ui| {
                            ui.strong("Status");
                        });
                        header.col(|ui| {
                            ui.strong("Host");
                        });
                        header.col(|ui| {
                            ui.strong("Latency");
                        });
                    })
                    .body(|mut body| {
                        for (ip, kind, active, hostname, latency) in rows {
                            body.row(22.0, |mut row| {
                                row.col(|ui| {
                                    if ui
                                        .small_button(ip.as_str())
                                        .on_hover_text("Inspect this device")
                                        .clicked()
                                    {
                                        select = Some(ip.clone());
                                    }
                                });
                                row.col(|ui| {
                                    ui.label(kind.as_str().to_uppercase());
                                });
                                row.col(|ui| {
                                    if active {
                                        ui.colored_label(get_theme().green, "ONLINE");
                                    } else {
                                        ui.colored_label(get_theme().overlay0, "OFFLINE");
                                    }
                                });
                                row.col(|ui| {
                                    ui.label(hostname);
                                });
                                row.col(|ui| {
                                    ui.label(latency);
                                });
                            })
                        }
                    });

                if let Some(ip) = select {
                    self.selected_device = Some(ip);
                    self.probe = ProbeState::Idle;
                }
            });
    }

    fn render(&mut self, ctx: &Context) {
        SidePanel::right("right_panel").show(ctx, |ui| self.render_side_panel(ui, ctx));

        CentralPanel::default().show(ctx, |ui| {
            egui_graphs::set_layout_state(ui, self.layout_state.clone(), None);

            // Frame prep: the mark collector is per-pass, the filter dim set
            // is recomputed, the anchor stays put, finished fades go away.
            overlay::clear_node_marks();
            self.publish_filter_dims();
            self.graph.pin_router();
            edge_anim::cleanup_finished();

            let widget = &mut egui_graphs::GraphView::<
                DeviceNode,
                Link,
                Directed,
                DefaultIx,
                DeviceNodeShape,
                LinkShape,
                LayoutState,
                LayoutForceDirected<Layout>,
            >::new(&mut self.graph.graph)
            .with_navigations(
                &SettingsNavigation::default()
                    .with_zoom_and_pan_enabled(false)
                    .with_fit_to_screen_enabled(true),
            )
            .with_interactions(&SettingsInteraction::default().with_node_selection_enabled(true));
            let _response = ui.add(widget);

            // The overlay reads the positions the node shapes just exported.
            let marks = overlay::take_node_marks();
            if self.session.is_running() {
                self.overlay
                    .paint(ui.painter(), &marks, get_theme().teal, Instant::now());
                ui.ctx().request_repaint_after(FRAME_INTERVAL);
            }
        });

        if let Some(id) = self.selected_device.clone() {
            let record = self.graph.record(&id).cloned();
            let is_router = self.graph.router_id() == Some(id.as_str());
            let panel = DetailPanel {
                device_id: &id,
                record: record.as_ref(),
                is_router,
                probe: &self.probe,
            };
            let resp = panel.show(ctx);
            if resp.close_clicked {
                self.selected_device = None;
                self.probe = ProbeState::Idle;
            }
            if resp.probe_clicked {
                self.request_probe(ctx, &id);
            }
            if resp.admin_clicked {
                ctx.open_url(egui::OpenUrl::new_tab(format!("http://{}", id)));
            }
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        self.drain_events();
        self.maybe_poll(ctx);
        self.read_data();
        self.render(ctx);
    }
}

fn info_icon(ui: &mut egui::Ui, tip: &str) {
    ui.add_space(4.0);
    ui.small_button("ℹ").on_hover_text(tip);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_expected_classes() {
        assert!(TypeFilter::All.matches(DeviceType::Printer));
        assert!(TypeFilter::Mobile.matches(DeviceType::Mobile));
        assert!(!TypeFilter::Mobile.matches(DeviceType::Desktop));
        // Laptops count as desktops, like the stats do.
        assert!(TypeFilter::Desktop.matches(DeviceType::Laptop));
        assert!(TypeFilter::Desktop.matches(DeviceType::Desktop));
        assert!(TypeFilter::Server.matches(DeviceType::Server));
        assert!(!TypeFilter::Server.matches(DeviceType::Unknown));
    }
}
