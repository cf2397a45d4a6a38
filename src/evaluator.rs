//! Two-stage reasoning pipeline
//!
//! ## Flow per event
//!
//! ```text
//! inbound.pop()
//!     ↓
//! stage1(event)     → analysis      (analyst persona)
//!     ↓
//! stage2(analysis)  → notification  (notifier persona, always runs)
//!     ↓
//! DecisionRule::decide(analysis, analysis + notification)
//!     ↓
//! ALERT  → outbound.push(event with alert_details)
//! IGNORE → dropped
//! ```
//!
//! Events are processed strictly one at a time. A failure in either stage
//! drops that event only; the loop moves on to the next one.

use {
    crate::{
        config::{PromptSettings, Settings},
        event::PriceEvent,
        queue::EventQueue,
        reasoning::{Agent, PromptFields, PromptTemplate, ReasoningError, TemplateError},
    },
    serde::{Deserialize, Serialize},
    std::{
        future::Future,
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc,
        },
        time::Duration,
    },
};

/// Literal token whose presence promotes an event under the substring rule
pub const ALERT_MARKER: &str = "ALERT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Alert,
    Ignore,
}

/// How the final verdict is extracted from reasoning output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionRule {
    /// Use a `{"decision": ..., "rationale": ...}` object from the analysis
    /// when present, otherwise fall back to the substring rule
    #[default]
    Structured,
    /// Alert iff the combined output contains `ALERT`
    Substring,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    decision: String,
    #[serde(default)]
    rationale: Option<String>,
}

/// Last well-formed verdict object in `text`, if any
fn structured_verdict(text: &str) -> Option<Decision> {
    let mut found = None;

    for (idx, _) in text.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&text[idx..]).into_iter::<Verdict>();
        if let Some(Ok(verdict)) = stream.next() {
            let decision = match verdict.decision.trim().to_ascii_uppercase().as_str() {
                "ALERT" => Decision::Alert,
                "IGNORE" => Decision::Ignore,
                _ => continue,
            };
            if let Some(rationale) = verdict.rationale.as_deref() {
                log::debug!("Verdict {:?}: {}", decision, rationale);
            }
            found = Some(decision);
        }
    }

    found
}

impl DecisionRule {
    pub fn decide(&self, analysis: &str, combined: &str) -> Decision {
        if *self == DecisionRule::Structured {
            if let Some(decision) = structured_verdict(analysis) {
                return decision;
            }
        }

        if combined.contains(ALERT_MARKER) {
            Decision::Alert
        } else {
            Decision::Ignore
        }
    }
}

/// Text attached to an alert: analysis followed by the notification
pub fn combine(analysis: &str, notification: &str) -> String {
    format!("{}\n\n{}", analysis, notification)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analysis,
    Notification,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Analysis => write!(f, "pricing analysis"),
            Stage::Notification => write!(f, "notification drafting"),
        }
    }
}

#[derive(Debug)]
pub enum EvaluationError {
    Reasoning { stage: Stage, source: ReasoningError },
    Timeout { stage: Stage, after: Duration },
}

impl EvaluationError {
    pub fn stage(&self) -> Stage {
        match self {
            EvaluationError::Reasoning { stage, .. } | EvaluationError::Timeout { stage, .. } => *stage,
        }
    }
}

impl std::fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationError::Reasoning { stage, source } => write!(f, "{} failed: {}", stage, source),
            EvaluationError::Timeout { stage, after } => {
                write!(f, "{} timed out after {:.1}s", stage, after.as_secs_f64())
            }
        }
    }
}

impl std::error::Error for EvaluationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvaluationError::Reasoning { source, .. } => Some(source),
            EvaluationError::Timeout { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    pub categories: Vec<String>,
    /// Fraction, e.g. 0.05 for 5%
    pub price_drop_threshold: f64,
    pub decision_rule: DecisionRule,
    pub stage_timeout: Option<Duration>,
}

impl From<&Settings> for EvaluatorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            categories: settings.monitoring.categories.clone(),
            price_drop_threshold: settings.monitoring.price_drop_threshold,
            decision_rule: settings.monitoring.decision_rule,
            stage_timeout: settings.stage_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompts {
    pub pricing_analysis: PromptTemplate,
    pub notification: PromptTemplate,
}

impl Prompts {
    pub fn from_settings(prompts: &PromptSettings) -> Result<Self, TemplateError> {
        Ok(Self {
            pricing_analysis: PromptTemplate::parse(&prompts.pricing_analysis)?,
            notification: PromptTemplate::parse(&prompts.notification)?,
        })
    }
}

#[derive(Debug, Default)]
struct StatsInner {
    processed: AtomicU64,
    alerted: AtomicU64,
    ignored: AtomicU64,
    failed: AtomicU64,
}

/// Shared evaluator counters, readable from the dashboard
#[derive(Debug, Clone, Default)]
pub struct EvaluatorStats {
    inner: Arc<StatsInner>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub alerted: u64,
    pub ignored: u64,
    pub failed: u64,
}

impl EvaluatorStats {
    fn record(&self, outcome: &Result<Decision, EvaluationError>) {
        let counter = match outcome {
            Ok(Decision::Alert) => &self.inner.alerted,
            Ok(Decision::Ignore) => &self.inner.ignored,
            Err(_) => &self.inner.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.inner.processed.fetch_add(1, Ordering::Release);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.inner.processed.load(Ordering::Acquire),
            alerted: self.inner.alerted.load(Ordering::Relaxed),
            ignored: self.inner.ignored.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
        }
    }
}

pub struct Evaluator {
    inbound: EventQueue<PriceEvent>,
    outbound: EventQueue<PriceEvent>,
    analyst: Agent,
    notifier: Agent,
    prompts: Prompts,
    config: EvaluatorConfig,
    stats: EvaluatorStats,
}

impl Evaluator {
    pub fn new(
        inbound: EventQueue<PriceEvent>,
        outbound: EventQueue<PriceEvent>,
        analyst: Agent,
        notifier: Agent,
        prompts: Prompts,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            inbound,
            outbound,
            analyst,
            notifier,
            prompts,
            config,
            stats: EvaluatorStats::default(),
        }
    }

    pub fn stats(&self) -> EvaluatorStats {
        self.stats.clone()
    }

    pub fn analysis_fields(&self, event: &PriceEvent) -> PromptFields {
        PromptFields::new()
            .with("product_name", &event.product_name)
            .with("category", &event.category)
            .with("our_price", format!("{:.2}", event.our_price))
            .with("competitor_price", format!("{:.2}", event.competitor_price))
            .with("desired_categories", self.config.categories.join(", "))
            .with(
                "price_drop_threshold",
                format!("{:.1}", self.config.price_drop_threshold * 100.0),
            )
    }

    async fn with_timeout<F>(&self, stage: Stage, call: F) -> Result<String, EvaluationError>
    where
        F: Future<Output = Result<String, ReasoningError>>,
    {
        let result = match self.config.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| EvaluationError::Timeout { stage, after: limit })?,
            None => call.await,
        };
        result.map_err(|source| EvaluationError::Reasoning { stage, source })
    }

    /// Pricing analysis: expected to end with an ALERT or IGNORE verdict
    pub async fn stage1(&self, event: &PriceEvent) -> Result<String, EvaluationError> {
        let fields = self.analysis_fields(event);
        self.with_timeout(
            Stage::Analysis,
            self.analyst.evaluate(&self.prompts.pricing_analysis, &fields),
        )
        .await
    }

    /// Notification drafting from the completed analysis
    pub async fn stage2(&self, analysis: &str) -> Result<String, EvaluationError> {
        let fields = PromptFields::new().with("analysis", analysis);
        self.with_timeout(
            Stage::Notification,
            self.notifier.evaluate(&self.prompts.notification, &fields),
        )
        .await
    }

    /// Run both stages for one event and forward it if it is an alert
    pub async fn process_event(&self, event: PriceEvent) -> Result<Decision, EvaluationError> {
        log::info!("Processing event #{} for {}", event.seq, event.product_name);

        let analysis = self.stage1(&event).await?;
        let notification = self.stage2(&analysis).await?;
        let combined = combine(&analysis, &notification);

        let decision = self.config.decision_rule.decide(&analysis, &combined);
        match decision {
            Decision::Alert => {
                log::info!(
                    "🚨 Alert generated for {} (ours ${:.2}, theirs ${:.2})",
                    event.product_name,
                    event.our_price,
                    event.competitor_price
                );
                self.outbound.push(event.into_alert(combined));
            }
            Decision::Ignore => {
                log::debug!("Ignored event #{} for {}", event.seq, event.product_name);
            }
        }

        Ok(decision)
    }

    /// Wait for the next inbound event and evaluate it
    pub async fn process_next(&self) -> Result<Decision, EvaluationError> {
        let event = self.inbound.pop().await;
        let seq = event.seq;

        let outcome = self.process_event(event).await;
        if let Err(e) = &outcome {
            log::error!("❌ Event processing error (event #{}): {}", seq, e);
        }
        self.stats.record(&outcome);
        outcome
    }

    pub async fn run(self) {
        log::info!("🧠 Event processor started");
        loop {
            let _ = self.process_next().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::Product,
        reasoning::{Persona, ReasoningService},
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    type Script = Box<dyn Fn(&Persona, &str) -> Result<String, ReasoningError> + Send + Sync>;

    struct Scripted {
        script: Script,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl Scripted {
        fn new(
            script: impl Fn(&Persona, &str) -> Result<String, ReasoningError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Box::new(script),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ReasoningService for Scripted {
        async fn complete(&self, persona: &Persona, prompt: &str) -> Result<String, ReasoningError> {
            self.prompts
                .lock()
                .unwrap()
                .push((persona.role.clone(), prompt.to_string()));
            (self.script)(persona, prompt)
        }
    }

    fn evaluator_with(service: Arc<Scripted>, config: EvaluatorConfig) -> (Evaluator, EventQueue<PriceEvent>, EventQueue<PriceEvent>) {
        let inbound = EventQueue::new();
        let outbound = EventQueue::new();
        let evaluator = Evaluator::new(
            inbound.clone(),
            outbound.clone(),
            Agent::new(Persona::analyst(), service.clone()),
            Agent::new(Persona::notifier(), service),
            Prompts::from_settings(&PromptSettings::default()).unwrap(),
            config,
        );
        (evaluator, inbound, outbound)
    }

    fn default_config() -> EvaluatorConfig {
        EvaluatorConfig::from(&Settings::with_api(Default::default()))
    }

    fn event(seq: u64, competitor_price: f64) -> PriceEvent {
        let tv = Product::new(1, "4K Smart TV", "electronics", 799.99);
        PriceEvent::new(seq, &tv, competitor_price, Utc::now())
    }

    fn is_analyst(persona: &Persona) -> bool {
        persona.role == "Pricing Intelligence Analyst"
    }

    #[test]
    fn test_substring_rule() {
        let rule = DecisionRule::Substring;
        assert_eq!(rule.decide("", "...ALERT: significant drop..."), Decision::Alert);
        assert_eq!(rule.decide("", "IGNORE: price increase"), Decision::Ignore);
        // Marker match is case-sensitive
        assert_eq!(rule.decide("", "alert lowercase"), Decision::Ignore);
        // Ignores structure entirely
        assert_eq!(
            rule.decide(r#"{"decision": "IGNORE"}"#, r#"{"decision": "IGNORE"} no ALERT needed"#),
            Decision::Alert
        );
    }

    #[test]
    fn test_structured_rule_prefers_verdict_object() {
        let rule = DecisionRule::Structured;
        let analysis = "Price rose. No ALERT warranted.\n{\"decision\": \"IGNORE\", \"rationale\": \"increase\"}";
        assert_eq!(rule.decide(analysis, &combine(analysis, "No action needed.")), Decision::Ignore);

        let analysis = "Big drop.\n{\"decision\": \"alert\", \"rationale\": \"50% below\"}";
        assert_eq!(rule.decide(analysis, &combine(analysis, "")), Decision::Alert);
    }

    #[test]
    fn test_structured_rule_takes_last_verdict() {
        let analysis = r#"Draft: {"decision": "ALERT"} ... revised: {"decision": "IGNORE", "rationale": "not monitored"}"#;
        assert_eq!(DecisionRule::Structured.decide(analysis, analysis), Decision::Ignore);
    }

    #[test]
    fn test_structured_rule_falls_back_to_substring() {
        let rule = DecisionRule::Structured;
        assert_eq!(rule.decide("ALERT: drop", "ALERT: drop"), Decision::Alert);
        assert_eq!(rule.decide("IGNORE", "IGNORE"), Decision::Ignore);
        // Unknown decision values do not count as a verdict
        let odd = r#"{"decision": "MAYBE"} ALERT"#;
        assert_eq!(rule.decide(odd, odd), Decision::Alert);
    }

    #[test]
    fn test_decision_rule_serde_names() {
        assert_eq!(serde_json::to_string(&DecisionRule::Substring).unwrap(), "\"substring\"");
        let rule: DecisionRule = serde_json::from_str("\"structured\"").unwrap();
        assert_eq!(rule, DecisionRule::Structured);
    }

    #[tokio::test]
    async fn test_stage1_prompt_contents() {
        let service = Scripted::new(|_, _| Ok("IGNORE".to_string()));
        let (evaluator, _, _) = evaluator_with(service.clone(), default_config());

        evaluator.stage1(&event(0, 400.0)).await.unwrap();

        let prompts = service.prompts.lock().unwrap();
        let (role, prompt) = &prompts[0];
        assert_eq!(role, "Pricing Intelligence Analyst");
        assert!(prompt.contains("Product: 4K Smart TV"));
        assert!(prompt.contains("Category: electronics"));
        assert!(prompt.contains("Our price: $799.99"));
        assert!(prompt.contains("Competitor price: $400.00"));
        assert!(prompt.contains("electronics, appliances, smart home"));
        assert!(prompt.contains("more than 5.0% below"));
        assert!(prompt.contains(r#"{"decision": "ALERT" | "IGNORE""#));
    }

    #[tokio::test]
    async fn test_stage2_receives_stage1_output() {
        let service = Scripted::new(|persona, prompt| {
            if is_analyst(persona) {
                Ok("ANALYSIS-TEXT-123 ALERT".to_string())
            } else {
                assert!(prompt.contains("ANALYSIS-TEXT-123"));
                Ok("ALERT: notify team".to_string())
            }
        });
        let (evaluator, _, outbound) = evaluator_with(service.clone(), default_config());

        let decision = evaluator.process_event(event(0, 400.0)).await.unwrap();
        assert_eq!(decision, Decision::Alert);

        let prompts = service.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[1].0, "Notification Manager");

        let alerts = outbound.snapshot();
        assert_eq!(
            alerts[0].alert_details.as_deref(),
            Some("ANALYSIS-TEXT-123 ALERT\n\nALERT: notify team")
        );
    }

    #[tokio::test]
    async fn test_stage2_runs_even_when_ignoring() {
        let service = Scripted::new(|_, _| Ok("IGNORE: price increase".to_string()));
        let (evaluator, _, outbound) = evaluator_with(service.clone(), default_config());

        let decision = evaluator.process_event(event(0, 839.99)).await.unwrap();

        assert_eq!(decision, Decision::Ignore);
        assert_eq!(service.prompts.lock().unwrap().len(), 2);
        assert!(outbound.is_empty());
    }

    #[tokio::test]
    async fn test_stage1_failure_skips_stage2_and_drops_event() {
        let service = Scripted::new(|_, _| Err(ReasoningError::Http("connection reset".to_string())));
        let (evaluator, inbound, outbound) = evaluator_with(service.clone(), default_config());
        inbound.push(event(0, 400.0));

        let err = evaluator.process_next().await.unwrap_err();

        assert_eq!(err.stage(), Stage::Analysis);
        assert_eq!(service.prompts.lock().unwrap().len(), 1);
        assert!(inbound.is_empty());
        assert!(outbound.is_empty());
        assert_eq!(
            evaluator.stats().snapshot(),
            StatsSnapshot { processed: 1, alerted: 0, ignored: 0, failed: 1 }
        );
    }

    #[tokio::test]
    async fn test_template_error_is_per_event_failure() {
        let service = Scripted::new(|_, _| Ok("ALERT".to_string()));
        let inbound = EventQueue::new();
        let outbound = EventQueue::new();
        let prompts = Prompts {
            pricing_analysis: PromptTemplate::parse("{unknown_field}").unwrap(),
            notification: PromptTemplate::parse("{analysis}").unwrap(),
        };
        let evaluator = Evaluator::new(
            inbound.clone(),
            outbound.clone(),
            Agent::new(Persona::analyst(), service.clone()),
            Agent::new(Persona::notifier(), service.clone()),
            prompts,
            default_config(),
        );

        inbound.push(event(0, 400.0));
        let err = evaluator.process_next().await.unwrap_err();

        assert!(matches!(
            err,
            EvaluationError::Reasoning { stage: Stage::Analysis, source: ReasoningError::Prompt(_) }
        ));
        assert!(service.prompts.lock().unwrap().is_empty());
        assert!(outbound.is_empty());
    }

    struct Stalled;

    #[async_trait]
    impl ReasoningService for Stalled {
        async fn complete(&self, _: &Persona, _: &str) -> Result<String, ReasoningError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_timeout_hook() {
        let service = Arc::new(Stalled);
        let config = EvaluatorConfig {
            stage_timeout: Some(Duration::from_secs(5)),
            ..default_config()
        };
        let evaluator = Evaluator::new(
            EventQueue::new(),
            EventQueue::new(),
            Agent::new(Persona::analyst(), service.clone()),
            Agent::new(Persona::notifier(), service),
            Prompts::from_settings(&PromptSettings::default()).unwrap(),
            config,
        );

        let err = evaluator.process_event(event(0, 400.0)).await.unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Timeout { stage: Stage::Analysis, after } if after == Duration::from_secs(5)
        ));
    }

    #[tokio::test]
    async fn test_process_next_is_fifo() {
        let service = Scripted::new(|_, _| Ok("ALERT".to_string()));
        let (evaluator, inbound, outbound) = evaluator_with(service, default_config());

        for seq in 0..5 {
            inbound.push(event(seq, 400.0));
        }
        for _ in 0..5 {
            evaluator.process_next().await.unwrap();
        }

        let seqs: Vec<u64> = outbound.snapshot().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
        assert_eq!(evaluator.stats().snapshot().alerted, 5);
    }
}
