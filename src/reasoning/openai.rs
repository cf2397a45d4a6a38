//! OpenAI-compatible chat completions client
//!
//! Endpoint: `{base_url}/chat/completions`
//! Each call sends the persona as the system message and the rendered prompt
//! as the user message, and returns `choices[0].message.content`.

use {
    super::{Persona, ReasoningError, ReasoningService},
    crate::config::OpenAiSettings,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    settings: OpenAiSettings,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings, api_key: impl Into<String>) -> Result<Self, ReasoningError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ReasoningError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            settings,
            api_key,
            client,
        })
    }

    /// Build a client with the key from `OPENAI_API_KEY`
    pub fn from_env(settings: OpenAiSettings) -> Result<Self, ReasoningError> {
        let api_key = std::env::var(API_KEY_VAR).map_err(|_| ReasoningError::MissingApiKey)?;
        Self::new(settings, api_key)
    }

    pub fn settings(&self) -> &OpenAiSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    async fn chat(
        &self,
        system: Option<&str>,
        user: &str,
        max_tokens: Option<u32>,
    ) -> Result<String, ReasoningError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let request = ChatRequest {
            model: &self.settings.model,
            messages,
            temperature: self.settings.temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ReasoningError::MalformedResponse("no choices in response".to_string()))
    }

    /// Minimal completion used to prove the key is accepted
    pub async fn probe(&self) -> Result<(), ReasoningError> {
        self.chat(None, "Connection test", Some(5)).await.map(|_| ())
    }
}

#[async_trait]
impl ReasoningService for OpenAiClient {
    async fn complete(&self, persona: &Persona, prompt: &str) -> Result<String, ReasoningError> {
        let system = persona.system_prompt();
        self.chat(Some(&system), prompt, self.settings.max_tokens).await
    }
}
