//! Gemini API client.
//!
//! This module provides an async interface to the Gemini `generateContent`
//! REST endpoint, mapping upstream HTTP failures onto [`GeminiError`] so the
//! retry layer can tell transient conditions from fatal ones.

use crate::config::GeminiConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors that can occur when calling the Gemini API
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Missing Gemini API key. Set GEMINI_API_KEY or gemini.api_key in the config file.")]
    MissingApiKey,

    #[error("HTTP request to Gemini failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini is overloaded (503): {0}")]
    Overloaded(String),

    #[error("Rate limit exceeded (429): {0}")]
    RateLimited(String),

    #[error("Authentication error ({status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Gemini returned an error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Gemini returned no text")]
    EmptyResponse,
}

impl GeminiError {
    /// Whether the failure is worth retrying after a backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, GeminiError::Overloaded(_) | GeminiError::RateLimited(_))
    }

    /// Classify a non-success HTTP status and its body
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::SERVICE_UNAVAILABLE => GeminiError::Overloaded(body),
            StatusCode::TOO_MANY_REQUESTS => GeminiError::RateLimited(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GeminiError::Authentication {
                status: status.as_u16(),
                message: body,
            },
            _ => GeminiError::Api {
                status: status.as_u16(),
                message: body,
            },
        }
    }
}

/// Something that turns a prompt into unstructured text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Create a new GeminiClient
    pub fn new(config: &GeminiConfig) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!("Calling Gemini generateContent");

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Gemini responded with {}", status);
            return Err(GeminiError::from_status(status, text));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed.first_text().ok_or(GeminiError::EmptyResponse)
    }
}
