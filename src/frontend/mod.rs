//! Frontend module: the eframe presentation collaborator
//!
//! The frontend owns no acquisition logic. It writes operator intent into
//! the shared [`AcquisitionControl`], ticks the [`FrameConsumer`] on a
//! fixed period, and renders the consumer's read-only snapshots: the
//! register table (current + previous), the stack and instruction
//! histories, and the port list.

use crate::backend::{self, AcquisitionControl, FrontendLink, PortInfo, StatusEvent};
use crate::config::AppConfig;
use crate::consumer::FrameConsumer;
use crate::types::{AcquisitionStats, LinkStatus};
use crossbeam_channel::Receiver;
use egui::{Color32, RichText};
use std::sync::Arc;
use std::time::Duration;

/// The main application
pub struct DebuggerApp {
    control: Arc<AcquisitionControl>,
    consumer: FrameConsumer,
    events: Receiver<StatusEvent>,
    ports: Vec<PortInfo>,
    link_status: LinkStatus,
    stats: AcquisitionStats,
    last_error: Option<String>,
    /// Consumer drain period
    tick: Duration,
}

impl DebuggerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        frontend: FrontendLink,
        config: &AppConfig,
    ) -> Self {
        let FrontendLink {
            frames,
            events,
            control,
        } = frontend;

        Self {
            control,
            consumer: FrameConsumer::new(frames),
            events,
            ports: backend::list_ports(),
            link_status: LinkStatus::Idle,
            stats: AcquisitionStats::default(),
            last_error: None,
            tick: config.consumer.tick(),
        }
    }

    fn process_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                StatusEvent::Link(status) => {
                    self.link_status = status;
                    if status == LinkStatus::Reading {
                        self.last_error = None;
                    }
                }
                StatusEvent::LinkError(err) => {
                    self.link_status = LinkStatus::Error;
                    self.last_error = Some(err);
                }
                StatusEvent::Stats(stats) => {
                    self.stats = stats;
                }
                StatusEvent::Shutdown => {
                    tracing::info!("Acquisition shutdown received");
                }
            }
        }
    }

    fn refresh_ports(&mut self) {
        self.ports = backend::list_ports();
    }

    fn dump(&mut self) {
        if self.consumer.history_len() == 0 {
            return;
        }
        if let Some(path) = rfd::FileDialog::new().set_file_name("dump.txt").save_file() {
            if let Err(e) = self.consumer.dump_to(&path) {
                tracing::error!("Dump failed: {}", e);
                self.last_error = Some(format!("Dump failed: {}", e));
            }
        }
    }

    fn render_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Dump").clicked() {
                        self.dump();
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close();
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let (color, text) = status_style(self.link_status);
                    ui.colored_label(color, text);
                });
            });
        });
    }

    fn render_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.spacing_mut().item_spacing.x = 8.0;

                let (color, text) = status_style(self.link_status);
                ui.colored_label(color, "●");
                ui.label(RichText::new(text).small());

                ui.separator();
                ui.label(RichText::new(format!("Frames: {}", self.stats.frames_decoded)).small());

                ui.separator();
                let error_color = if self.stats.decode_failures > 0 {
                    Color32::LIGHT_RED
                } else {
                    Color32::GRAY
                };
                ui.colored_label(
                    error_color,
                    RichText::new(format!("Discarded: {}", self.stats.decode_failures)).small(),
                );

                ui.separator();
                ui.label(RichText::new(format!("Timeouts: {}", self.stats.read_timeouts)).small());

                if let Some(error) = &self.last_error {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.colored_label(Color32::RED, RichText::new(error).small());
                    });
                }
            });
        });
    }

    fn render_control_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("control_panel")
            .resizable(true)
            .default_height(150.0)
            .show(ctx, |ui| {
                ui.columns(2, |cols| {
                    self.render_port_list(&mut cols[0]);
                    self.render_controls(&mut cols[1]);
                });
            });
    }

    fn render_port_list(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Serial Ports");
            if ui.button("⟳").on_hover_text("Refresh port list").clicked() {
                self.refresh_ports();
            }
        });
        ui.separator();

        let selected_port = self.control.selected_port();
        egui::ScrollArea::vertical()
            .id_salt("port_list")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if self.ports.is_empty() {
                    ui.colored_label(Color32::GRAY, "No serial ports found");
                }
                for port in &self.ports {
                    let is_selected = selected_port.as_deref() == Some(port.name.as_str());
                    if ui
                        .selectable_label(is_selected, port.display_name())
                        .clicked()
                    {
                        self.control.select_port(Some(port.name.clone()));
                    }
                }
            });
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Controls");
        ui.separator();

        let has_port = self.control.selected_port().is_some();
        let enabled = self.control.is_enabled();

        ui.horizontal(|ui| {
            if ui
                .add_enabled(has_port && !enabled, egui::Button::new("Start"))
                .clicked()
            {
                self.control.start();
            }
            if ui
                .add_enabled(enabled, egui::Button::new("Stop"))
                .clicked()
            {
                self.control.stop();
            }
        });

        if !has_port {
            ui.colored_label(Color32::GRAY, "Select a serial port to start");
        }
    }

    fn render_snapshots(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(3, |cols| {
                render_register_table(&mut cols[0], &self.consumer);
                render_history_list(&mut cols[1], "Stack Trace", self.consumer.stack());
                render_history_list(&mut cols[2], "Instructions", self.consumer.instructions());
            });
        });
    }
}

impl eframe::App for DebuggerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.consumer.tick();
        self.process_events();

        self.render_menu_bar(ctx);
        self.render_status_bar(ctx);
        self.render_control_panel(ctx);
        self.render_snapshots(ctx);

        // The consumer drains on this cadence whether or not input events
        // arrive
        ctx.request_repaint_after(self.tick);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        // The worker observes this within one read timeout; main joins it
        // after eframe returns
        self.control.stop();
    }
}

fn status_style(status: LinkStatus) -> (Color32, &'static str) {
    match status {
        LinkStatus::Reading => (Color32::GREEN, "Reading"),
        LinkStatus::Connecting => (Color32::YELLOW, "Connecting..."),
        LinkStatus::Idle => (Color32::GRAY, "Idle"),
        LinkStatus::Error => (Color32::RED, "Error"),
    }
}

fn render_register_table(ui: &mut egui::Ui, consumer: &FrameConsumer) {
    ui.heading("Registers");
    ui.separator();

    egui::Grid::new("register_table")
        .num_columns(3)
        .striped(true)
        .min_col_width(50.0)
        .show(ui, |ui| {
            ui.strong("Register");
            ui.strong("Value");
            ui.strong("Previous");
            ui.end_row();

            for (reg, value) in consumer.registers() {
                ui.label(reg.label());
                ui.label(RichText::new(format!("{}", value.current)).monospace());
                ui.label(
                    RichText::new(format!("{}", value.previous))
                        .monospace()
                        .small(),
                );
                ui.end_row();
            }
        });
}

fn render_history_list(ui: &mut egui::Ui, title: &str, entries: &[String]) {
    ui.heading(title);
    ui.separator();

    egui::ScrollArea::vertical()
        .id_salt(title)
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for entry in entries {
                ui.label(RichText::new(entry).monospace());
            }
        });
}
