//! Reasoning service boundary
//!
//! The evaluator never talks to a model directly. It holds two `Agent`s, each
//! a `Persona` bound to a shared `ReasoningService`, and asks them to fill in
//! a `PromptTemplate`. What the service does with the prompt is opaque; the
//! only thing the pipeline relies on is that the returned text carries an
//! ALERT or IGNORE verdict.

pub mod openai;
pub mod template;

pub use openai::OpenAiClient;
pub use template::{PromptFields, PromptTemplate, TemplateError};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    std::sync::Arc,
};

#[derive(Debug)]
pub enum ReasoningError {
    Prompt(TemplateError),
    MissingApiKey,
    Http(String),
    Api { status: u16, body: String },
    MalformedResponse(String),
    Timeout,
}

impl std::fmt::Display for ReasoningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasoningError::Prompt(e) => write!(f, "Prompt formatting failed: {}", e),
            ReasoningError::MissingApiKey => write!(f, "OPENAI_API_KEY is not set"),
            ReasoningError::Http(msg) => write!(f, "HTTP error: {}", msg),
            ReasoningError::Api { status, body } => write!(f, "API error ({}): {}", status, body),
            ReasoningError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            ReasoningError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for ReasoningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReasoningError::Prompt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TemplateError> for ReasoningError {
    fn from(e: TemplateError) -> Self {
        ReasoningError::Prompt(e)
    }
}

impl From<reqwest::Error> for ReasoningError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ReasoningError::Timeout
        } else if e.is_decode() {
            ReasoningError::MalformedResponse(e.to_string())
        } else {
            ReasoningError::Http(e.to_string())
        }
    }
}

/// Role description sent alongside every prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl Persona {
    pub fn new(role: impl Into<String>, goal: impl Into<String>, backstory: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }

    pub fn analyst() -> Self {
        Self::new(
            "Pricing Intelligence Analyst",
            "Analyze competitor price changes and recommend strategic actions",
            "Expert AI trained in market dynamics, competitive analysis, and pricing strategies \
             across various product categories. Capable of identifying significant price movements \
             and determining their potential impact on market position and sales performance.",
        )
    }

    pub fn notifier() -> Self {
        Self::new(
            "Notification Manager",
            "Generate clear, actionable communications for internal teams",
            "Specialist in business communications with expertise in crafting concise yet \
             comprehensive messages that effectively convey critical information and recommended \
             actions to relevant stakeholders.",
        )
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\n\nYour goal: {}",
            self.role, self.backstory, self.goal
        )
    }
}

/// Black-box text generation
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, persona: &Persona, prompt: &str) -> Result<String, ReasoningError>;
}

/// A persona bound to a reasoning service
#[derive(Clone)]
pub struct Agent {
    persona: Persona,
    service: Arc<dyn ReasoningService>,
}

impl Agent {
    pub fn new(persona: Persona, service: Arc<dyn ReasoningService>) -> Self {
        Self { persona, service }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Render `template` with `fields` and submit it under this agent's persona
    pub async fn evaluate(
        &self,
        template: &PromptTemplate,
        fields: &PromptFields,
    ) -> Result<String, ReasoningError> {
        let prompt = template.render(fields)?;
        log::debug!("{} ← {} chars", self.persona.role, prompt.len());
        self.service.complete(&self.persona, &prompt).await
    }
}
