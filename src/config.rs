//! Settings loaded once at startup
//!
//! The settings file is JSON (default `config/settings.json`, override with
//! `PRICEWATCH_SETTINGS`). The `api` section is required because the startup
//! checks cannot run without it. Every other section is optional: when it is
//! missing the built-in default is used and a warning is logged. Values are
//! validated regardless of where they came from, and any invalid value is a
//! fatal `ConfigError`.

use {
    crate::{
        catalog::{sample_products, Catalog, Product},
        evaluator::DecisionRule,
        reasoning::{Persona, PromptTemplate},
    },
    serde::{Deserialize, Serialize},
    std::{env, fs, path::Path, time::Duration},
};

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";
pub const SETTINGS_PATH_VAR: &str = "PRICEWATCH_SETTINGS";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: String, reason: String },
    Parse(String),
    MissingSection(&'static str),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, reason } => {
                write!(f, "Failed to read settings file {}: {}", path, reason)
            }
            ConfigError::Parse(msg) => write!(f, "Malformed settings file: {}", msg),
            ConfigError::MissingSection(name) => {
                write!(f, "Missing required settings section: {}", name)
            }
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub name: String,
    pub description: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            name: "AI Pricing Monitor".to_string(),
            description: "Real-time competitor price monitoring with AI-powered analysis".to_string(),
        }
    }
}

/// Emitter cadence and price variation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub enabled: bool,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    /// Lower bound of the competitor/our price ratio
    pub price_variation_min: f64,
    /// Upper bound of the competitor/our price ratio
    pub price_variation_max: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay_secs: 0.5,
            max_delay_secs: 1.5,
            price_variation_min: 0.8,
            price_variation_max: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub refresh_interval_secs: f64,
    pub categories: Vec<String>,
    /// Fraction, e.g. 0.05 for 5%
    pub price_drop_threshold: f64,
    pub decision_rule: DecisionRule,
    /// Per-stage reasoning timeout; unset means wait indefinitely
    pub stage_timeout_secs: Option<f64>,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 1.0,
            categories: vec![
                "electronics".to_string(),
                "appliances".to_string(),
                "smart home".to_string(),
            ],
            price_drop_threshold: 0.05,
            decision_rule: DecisionRule::default(),
            stage_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub health_check_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_tokens: Option<u32>,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            health_check_url: "https://status.openai.com/api/v2/status.json".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.3,
            timeout_secs: 30,
            max_tokens: None,
        }
    }
}

impl OpenAiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    pub openai: OpenAiSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub analyst: Persona,
    pub notifier: Persona,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            analyst: Persona::analyst(),
            notifier: Persona::notifier(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub pricing_analysis: String,
    pub notification: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            pricing_analysis: DEFAULT_PRICING_ANALYSIS_TEMPLATE.to_string(),
            notification: DEFAULT_NOTIFICATION_TEMPLATE.to_string(),
        }
    }
}

pub const DEFAULT_PRICING_ANALYSIS_TEMPLATE: &str = "\
Analyze the following competitor price observation.

Product: {product_name}
Category: {category}
Our price: ${our_price}
Competitor price: ${competitor_price}

Monitored categories: {desired_categories}
Raise an ALERT only when the product is in a monitored category and the competitor \
price is more than {price_drop_threshold}% below ours. Otherwise decide IGNORE.

Explain your reasoning in a few sentences, then finish with a single JSON object on its own line:
{{\"decision\": \"ALERT\" | \"IGNORE\", \"rationale\": \"<one sentence>\"}}";

pub const DEFAULT_NOTIFICATION_TEMPLATE: &str = "\
Here is the pricing analyst's assessment:

{analysis}

If the assessment decided ALERT, write a short notification for the pricing team that starts \
with \"ALERT:\" and states the product, both prices, the size of the drop and a recommended \
action. If the assessment decided IGNORE, reply with \"No action needed.\" and nothing else.";

/// On-disk shape; optional sections are resolved in `Settings::from_file_contents`
#[derive(Debug, Deserialize)]
struct SettingsFile {
    application: Option<ApplicationSettings>,
    simulation: Option<SimulationSettings>,
    monitoring: Option<MonitoringSettings>,
    api: Option<ApiSettings>,
    agents: Option<AgentSettings>,
    prompts: Option<PromptSettings>,
    products: Option<Vec<Product>>,
}

/// Validated, read-only application settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub simulation: SimulationSettings,
    pub monitoring: MonitoringSettings,
    pub api: ApiSettings,
    pub agents: AgentSettings,
    pub prompts: PromptSettings,
    pub products: Vec<Product>,
}

fn or_default<T: Default>(section: Option<T>, name: &str) -> T {
    section.unwrap_or_else(|| {
        log::warn!("⚠️  Settings section '{}' missing, using built-in defaults", name);
        T::default()
    })
}

impl Settings {
    /// Load from the path in `PRICEWATCH_SETTINGS`, or `config/settings.json`
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var(SETTINGS_PATH_VAR).unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
        Self::load(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let settings = Self::from_file_contents(&contents)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_file_contents(contents: &str) -> Result<Self, ConfigError> {
        let file: SettingsFile =
            serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let api = file.api.ok_or(ConfigError::MissingSection("api"))?;

        let products = file.products.unwrap_or_else(|| {
            log::warn!("⚠️  Settings section 'products' missing, using built-in sample catalog");
            sample_products()
        });

        let settings = Self {
            application: or_default(file.application, "application"),
            simulation: or_default(file.simulation, "simulation"),
            monitoring: or_default(file.monitoring, "monitoring"),
            api,
            agents: or_default(file.agents, "agents"),
            prompts: or_default(file.prompts, "prompts"),
            products,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if !sim.min_delay_secs.is_finite() || sim.min_delay_secs < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "simulation.min_delay_secs must be >= 0, got {}",
                sim.min_delay_secs
            )));
        }
        if !sim.max_delay_secs.is_finite() || sim.max_delay_secs < sim.min_delay_secs {
            return Err(ConfigError::InvalidValue(format!(
                "simulation.max_delay_secs ({}) must be >= min_delay_secs ({})",
                sim.max_delay_secs, sim.min_delay_secs
            )));
        }
        if !sim.price_variation_min.is_finite() || sim.price_variation_min <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "simulation.price_variation_min must be > 0, got {}",
                sim.price_variation_min
            )));
        }
        if !sim.price_variation_max.is_finite() || sim.price_variation_max < sim.price_variation_min {
            return Err(ConfigError::InvalidValue(format!(
                "simulation.price_variation_max ({}) must be >= price_variation_min ({})",
                sim.price_variation_max, sim.price_variation_min
            )));
        }

        let mon = &self.monitoring;
        if !mon.refresh_interval_secs.is_finite() || mon.refresh_interval_secs <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "monitoring.refresh_interval_secs must be > 0, got {}",
                mon.refresh_interval_secs
            )));
        }
        if mon.categories.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "monitoring.categories cannot be empty".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&mon.price_drop_threshold) {
            return Err(ConfigError::InvalidValue(format!(
                "monitoring.price_drop_threshold must be in [0, 1), got {}",
                mon.price_drop_threshold
            )));
        }
        if let Some(secs) = mon.stage_timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "monitoring.stage_timeout_secs must be > 0, got {}",
                    secs
                )));
            }
        }

        // Seconds must also fit in a Duration
        for (name, secs) in [
            ("simulation.min_delay_secs", Some(sim.min_delay_secs)),
            ("simulation.max_delay_secs", Some(sim.max_delay_secs)),
            ("monitoring.refresh_interval_secs", Some(mon.refresh_interval_secs)),
            ("monitoring.stage_timeout_secs", mon.stage_timeout_secs),
        ] {
            if let Some(secs) = secs {
                Duration::try_from_secs_f64(secs).map_err(|e| {
                    ConfigError::InvalidValue(format!("{} ({}): {}", name, secs, e))
                })?;
            }
        }

        let openai = &self.api.openai;
        for (name, url) in [
            ("api.openai.base_url", &openai.base_url),
            ("api.openai.health_check_url", &openai.health_check_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }
        if openai.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "api.openai.timeout_secs must be > 0".to_string(),
            ));
        }
        if openai.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "api.openai.model cannot be empty".to_string(),
            ));
        }

        for (name, template) in [
            ("prompts.pricing_analysis", &self.prompts.pricing_analysis),
            ("prompts.notification", &self.prompts.notification),
        ] {
            PromptTemplate::parse(template)
                .map_err(|e| ConfigError::InvalidValue(format!("{}: {}", name, e)))?;
        }

        self.catalog()?;
        Ok(())
    }

    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        Catalog::new(self.products.clone())
            .map_err(|e| ConfigError::InvalidValue(format!("products: {}", e)))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(self.monitoring.refresh_interval_secs)
    }

    pub fn stage_timeout(&self) -> Option<Duration> {
        self.monitoring.stage_timeout_secs.map(Duration::from_secs_f64)
    }

    /// Settings with every optional section defaulted (for tests and tooling)
    pub fn with_api(openai: OpenAiSettings) -> Self {
        Self {
            application: ApplicationSettings::default(),
            simulation: SimulationSettings::default(),
            monitoring: MonitoringSettings::default(),
            api: ApiSettings { openai },
            agents: AgentSettings::default(),
            prompts: PromptSettings::default(),
            products: sample_products(),
        }
    }
}
