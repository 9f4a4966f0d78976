use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables checked, in order, for the Gemini credential.
const GEMINI_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "VITE_GEMINI_API_KEY", "API_KEY"];

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing. The Gemini key is
/// optional here: without it every AI call fails before touching the network.
#[derive(Debug, Clone)]
pub struct Config {
    pub persistence_api_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub batch_throttle: Duration,
    pub success_banner: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            persistence_api_url: require_env("PERSISTENCE_API_URL")?
                .trim_end_matches('/')
                .to_string(),
            gemini_api_key: first_non_empty(&GEMINI_KEY_VARS, |key| std::env::var(key).ok()),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE.to_string()),
            batch_throttle: millis_env("BATCH_THROTTLE_MS", 3000)?,
            success_banner: millis_env("SUCCESS_BANNER_MS", 5000)?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// First of `keys` whose value is set and not blank.
fn first_non_empty(keys: &[&str], lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    keys.iter()
        .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn millis_env(key: &str, default: u64) -> Result<Duration> {
    let millis = match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of milliseconds"))?,
        Err(_) => default,
    };
    Ok(Duration::from_millis(millis))
}
