//! Reasoning API connection check
//!
//! Sends one tiny completion with the configured model and reports whether
//! the endpoint and `OPENAI_API_KEY` work. Falls back to built-in API
//! settings when the settings file cannot be loaded.
//!
//! Usage:
//!   cargo run --bin conn_check

use {
    dotenv::dotenv,
    pricewatch::{config::{OpenAiSettings, Settings}, reasoning::OpenAiClient},
    std::process::ExitCode,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let api = match Settings::from_env() {
        Ok(settings) => settings.api.openai,
        Err(e) => {
            log::warn!("⚠️  Could not load settings ({}), using default API settings", e);
            OpenAiSettings::default()
        }
    };

    println!("Testing connection to {} ({})", api.base_url, api.model);

    let result = match OpenAiClient::from_env(api) {
        Ok(client) => client.probe().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            println!("API Connection Successful!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("API Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
