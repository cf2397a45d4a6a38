//! Pipeline wiring
//!
//! Creates fresh inbound/outbound queues, builds the emitter and evaluator
//! from validated settings, and spawns them as independent tokio tasks.

use {
    crate::{
        catalog::Catalog,
        config::{ConfigError, Settings},
        emitter::{EmitterConfig, PriceEmitter},
        evaluator::{Evaluator, EvaluatorConfig, EvaluatorStats, Prompts},
        event::PriceEvent,
        queue::EventQueue,
        reasoning::{Agent, ReasoningService},
    },
    std::{sync::Arc, time::Duration},
    tokio::task::JoinHandle,
};

/// Running pipeline: queue handles for the display plus task handles
pub struct Pipeline {
    pub inbound: EventQueue<PriceEvent>,
    pub outbound: EventQueue<PriceEvent>,
    pub stats: EvaluatorStats,
    emitter: Option<JoinHandle<()>>,
    evaluator: JoinHandle<()>,
}

impl Pipeline {
    /// Spawn the emitter (unless disabled) and the evaluator
    pub fn start(
        settings: &Settings,
        catalog: Catalog,
        service: Arc<dyn ReasoningService>,
    ) -> Result<Self, ConfigError> {
        let inbound = EventQueue::new();
        let outbound = EventQueue::new();

        let prompts = Prompts::from_settings(&settings.prompts)
            .map_err(|e| ConfigError::InvalidValue(format!("prompts: {}", e)))?;
        let evaluator = Evaluator::new(
            inbound.clone(),
            outbound.clone(),
            Agent::new(settings.agents.analyst.clone(), service.clone()),
            Agent::new(settings.agents.notifier.clone(), service),
            prompts,
            EvaluatorConfig::from(settings),
        );
        let stats = evaluator.stats();

        let emitter = if settings.simulation.enabled {
            let emitter = PriceEmitter::new(
                catalog,
                inbound.clone(),
                EmitterConfig::from(&settings.simulation),
            );
            Some(tokio::spawn(emitter.run()))
        } else {
            log::info!("⚠️  Price emitter simulation disabled in settings");
            None
        };

        let evaluator = tokio::spawn(evaluator.run());

        Ok(Self {
            inbound,
            outbound,
            stats,
            emitter,
            evaluator,
        })
    }

    pub fn emitter_running(&self) -> bool {
        self.emitter.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn shutdown(self) {
        if let Some(emitter) = self.emitter {
            emitter.abort();
        }
        self.evaluator.abort();
        log::info!("✅ Pipeline tasks stopped");
    }
}

/// Log alerts as they arrive on the outbound queue (headless mode)
pub async fn log_alerts(outbound: EventQueue<PriceEvent>, poll_interval: Duration) {
    let mut seen = 0usize;
    let mut timer = tokio::time::interval(poll_interval);

    loop {
        timer.tick().await;

        // Outbound is append-only, so anything past `seen` is new
        let alerts = outbound.snapshot();
        for alert in alerts.iter().skip(seen) {
            log::warn!(
                "🚨 {} [{}] ours ${:.2} / theirs ${:.2} ({:+.1}%)\n{}",
                alert.product_name,
                alert.category,
                alert.our_price,
                alert.competitor_price,
                -alert.price_diff_pct(),
                alert.alert_details.as_deref().unwrap_or("")
            );
        }
        seen = alerts.len();
    }
}
