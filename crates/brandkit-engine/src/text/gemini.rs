use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

use super::TextBackend;
use crate::util::{response_json_or_error, trim_base_url};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct GeminiBackend {
    api_base: String,
    model: String,
    api_key: String,
    http: HttpClient,
}

impl GeminiBackend {
    pub fn new(api_base: &str, model: &str, api_key: &str) -> Self {
        Self {
            api_base: trim_base_url(api_base),
            model: model.trim().to_string(),
            api_key: api_key.to_string(),
            http: HttpClient::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    pub fn build_payload(prompt: &str) -> Value {
        json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ],
        })
    }

    /// Concatenates every text part of every candidate.
    pub fn extract_text(payload: &Value) -> Option<String> {
        let mut out = String::new();
        let candidates = payload.get("candidates").and_then(Value::as_array)?;
        for candidate in candidates {
            let Some(parts) = candidate
                .get("content")
                .and_then(|content| content.get("parts"))
                .and_then(Value::as_array)
            else {
                continue;
            };
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
        }
        let trimmed = out.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl TextBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .json(&Self::build_payload(prompt))
            .send()
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let payload = response_json_or_error("Gemini", response)?;
        match Self::extract_text(&payload) {
            Some(text) => Ok(text),
            None => bail!("Gemini response contained no text"),
        }
    }
}
