//! Price monitor runtime
//!
//! Loads settings, verifies connectivity and the API key, then runs the
//! emitter and evaluator alongside the terminal dashboard.
//!
//! Usage:
//!   cargo run --release --bin pricewatch [-- --headless]
//!
//! Environment variables:
//!   PRICEWATCH_SETTINGS - settings file (default: config/settings.json)
//!   OPENAI_API_KEY      - reasoning service credential (required)
//!   RUST_LOG            - log filter (default: warn with the dashboard, info headless)

use {
    dotenv::dotenv,
    log::{error, info},
    pricewatch::{
        config::Settings,
        connectivity,
        reasoning::ReasoningService,
        runtime::{log_alerts, Pipeline},
        ui::{run_ui, Dashboard},
    },
    std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let headless = std::env::args().skip(1).any(|arg| arg == "--headless");

    // stderr shares the tty with the dashboard, so keep it quiet unless RUST_LOG asks otherwise
    let default_filter = if headless { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    let settings = Settings::from_env().map_err(|e| {
        error!("❌ Failed to load settings: {}", e);
        e
    })?;

    info!("🚀 Starting {}...", settings.application.name);
    info!("📊 Configuration:");
    info!("   ├─ Model: {} @ {}", settings.api.openai.model, settings.api.openai.base_url);
    info!("   ├─ Products: {}", settings.products.len());
    info!("   ├─ Categories: {}", settings.monitoring.categories.join(", "));
    info!(
        "   ├─ Price drop threshold: {:.1}%",
        settings.monitoring.price_drop_threshold * 100.0
    );
    info!("   ├─ Decision rule: {:?}", settings.monitoring.decision_rule);
    info!(
        "   └─ Emission delay: {}-{}s",
        settings.simulation.min_delay_secs, settings.simulation.max_delay_secs
    );

    info!("🔌 Running startup checks...");
    let client = connectivity::run_startup_checks(&settings.api.openai)
        .await
        .map_err(|e| {
            error!("❌ Startup check failed: {}", e);
            e
        })?;

    let catalog = settings.catalog()?;
    let service: Arc<dyn ReasoningService> = Arc::new(client);
    let pipeline = Pipeline::start(&settings, catalog, service)?;
    info!("✅ Pipeline running (emitter: {})", pipeline.emitter_running());

    if headless {
        info!("🔄 Headless mode, press CTRL+C to shutdown");
        tokio::select! {
            _ = log_alerts(pipeline.outbound.clone(), settings.refresh_interval()) => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("❌ Failed to listen for CTRL+C: {}", e);
                }
                info!("⚠️  Received CTRL+C, shutting down...");
            }
        }
    } else {
        let dashboard = Dashboard {
            inbound: pipeline.inbound.clone(),
            outbound: pipeline.outbound.clone(),
            stats: pipeline.stats.clone(),
            settings: settings.clone(),
            stop: Arc::new(AtomicBool::new(false)),
        };
        let stop = dashboard.stop.clone();
        let mut ui_handle = tokio::task::spawn_blocking(move || run_ui(dashboard));

        let result = tokio::select! {
            result = &mut ui_handle => result,
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => {
                        info!("⚠️  Received CTRL+C, shutting down...");
                        // The UI thread notices the flag at its next poll and restores the terminal
                        stop.store(true, Ordering::Relaxed);
                    }
                    Err(e) => error!("❌ Failed to listen for CTRL+C: {}", e),
                }
                ui_handle.await
            }
        };

        match result {
            Ok(Ok(())) => info!("UI exited"),
            Ok(Err(e)) => error!("UI error: {}", e),
            Err(e) => error!("UI task failed: {}", e),
        }
    }

    pipeline.shutdown();
    Ok(())
}
