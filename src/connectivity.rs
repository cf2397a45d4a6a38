//! Startup preconditions
//!
//! Both checks must pass before any pipeline loop is started:
//! 1. The health-check URL answers `200 OK` within the configured timeout
//! 2. `OPENAI_API_KEY` is set and a 5-token test completion succeeds

use {
    crate::{
        config::OpenAiSettings,
        reasoning::{OpenAiClient, ReasoningError},
    },
    std::time::Duration,
};

#[derive(Debug)]
pub enum ConnectivityError {
    Network(String),
    UnexpectedStatus(u16),
    MissingApiKey,
    KeyRejected(ReasoningError),
}

impl std::fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectivityError::Network(msg) => write!(f, "Network connection error: {}", msg),
            ConnectivityError::UnexpectedStatus(status) => {
                write!(f, "Connection test failed with status code: {}", status)
            }
            ConnectivityError::MissingApiKey => {
                write!(f, "OPENAI_API_KEY not found in environment or .env file")
            }
            ConnectivityError::KeyRejected(e) => write!(f, "API key verification failed: {}", e),
        }
    }
}

impl std::error::Error for ConnectivityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectivityError::KeyRejected(e) => Some(e),
            _ => None,
        }
    }
}

/// GET `url` and require a 200 response
pub async fn check_network_connection(url: &str, timeout: Duration) -> Result<(), ConnectivityError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConnectivityError::Network(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        log::error!("Network connection error: {}", e);
        ConnectivityError::Network(e.to_string())
    })?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        log::warn!("Connection test failed with status code: {}", status);
        return Err(ConnectivityError::UnexpectedStatus(status.as_u16()));
    }

    log::info!("✅ Network connection to {} successful", url);
    Ok(())
}

/// Build a client from the environment key and prove the key works
pub async fn verify_api_key(settings: &OpenAiSettings) -> Result<OpenAiClient, ConnectivityError> {
    let client = OpenAiClient::from_env(settings.clone()).map_err(|e| match e {
        ReasoningError::MissingApiKey => {
            log::error!("OPENAI_API_KEY not found in environment variables");
            ConnectivityError::MissingApiKey
        }
        other => ConnectivityError::KeyRejected(other),
    })?;

    probe_client(&client).await?;
    Ok(client)
}

pub async fn probe_client(client: &OpenAiClient) -> Result<(), ConnectivityError> {
    client.probe().await.map_err(|e| {
        log::error!("API key verification failed: {}", e);
        ConnectivityError::KeyRejected(e)
    })?;

    log::info!("✅ API key verification successful");
    Ok(())
}

/// Run every startup check, returning a verified client on success
pub async fn run_startup_checks(settings: &OpenAiSettings) -> Result<OpenAiClient, ConnectivityError> {
    check_network_connection(&settings.health_check_url, settings.timeout()).await?;
    verify_api_key(settings).await
}
