//! Serial Debug Monitor - Main Entry Point
//!
//! Spawns the acquisition thread, then hands the presentation-side
//! handles to the eframe application.

use serialdbg_rs::{
    backend::{AcquisitionBackend, SerialLink},
    config::AppConfig,
    frontend::DebuggerApp,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,serialdbg_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Serial Debug Monitor");

    let config = AppConfig::load_or_default();

    #[cfg(not(feature = "mock-link"))]
    let link: Box<dyn SerialLink> = Box::new(serialdbg_rs::backend::SerialPortLink::new(
        config.link.baud_rate,
        config.link.read_timeout(),
    ));

    // `--features mock-link` runs against a simulated target
    #[cfg(feature = "mock-link")]
    let link: Box<dyn SerialLink> = Box::new(serialdbg_rs::backend::MockLink::frame_generator(
        std::time::Duration::from_millis(20),
    ));

    let (backend, frontend) = AcquisitionBackend::new(&config, link);
    let running = backend.stop_handle();
    let worker_handle = std::thread::spawn(move || backend.run());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 500.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("Serial Debug Monitor"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Serial Debug Monitor",
        native_options,
        Box::new(move |cc| Ok(Box::new(DebuggerApp::new(cc, frontend, &config)))),
    );

    // Signal the worker to stop and wait for it; it observes the flag
    // within one read timeout and closes the link before exiting
    tracing::info!("Shutting down...");
    running.store(false, std::sync::atomic::Ordering::SeqCst);
    if worker_handle.join().is_err() {
        tracing::warn!("Acquisition worker panicked during shutdown");
    }

    result
}
