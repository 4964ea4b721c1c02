use std::time::Duration;

use anyhow::{Context, Result};
use image::DynamicImage;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};

use super::{BackendRequest, ImageBackend};
use crate::util::{response_bytes_or_error, trim_base_url};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const INFERENCE_STEPS: u32 = 30;
pub const GUIDANCE_SCALE: f64 = 7.5;

/// Hosted text-to-image model behind the Hugging Face inference API.
pub struct HuggingFaceBackend {
    api_base: String,
    model: String,
    api_key: String,
    http: HttpClient,
}

impl HuggingFaceBackend {
    pub fn new(api_base: &str, model: &str, api_key: &str) -> Self {
        Self {
            api_base: trim_base_url(api_base),
            model: model.trim().trim_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: HttpClient::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.api_base, self.model)
    }

    pub fn build_payload(request: &BackendRequest) -> Value {
        json!({
            "inputs": request.prompt,
            "parameters": {
                "width": request.width,
                "height": request.height,
                "num_inference_steps": INFERENCE_STEPS,
                "guidance_scale": GUIDANCE_SCALE,
            },
        })
    }
}

impl ImageBackend for HuggingFaceBackend {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate(&self, request: &BackendRequest) -> Result<DynamicImage> {
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "image/png")
            .header(CONTENT_TYPE, "application/json")
            .timeout(REQUEST_TIMEOUT)
            .json(&Self::build_payload(request))
            .send()
            .with_context(|| format!("Hugging Face request failed ({endpoint})"))?;
        let bytes = response_bytes_or_error(&self.model, response)?;
        image::load_from_memory(&bytes)
            .with_context(|| format!("{} returned bytes that are not an image", self.model))
    }

    /// Cold models answer 503 with an "is currently loading" body.
    fn is_loading(&self, err: &anyhow::Error) -> bool {
        err.chain().any(|cause| {
            let text = cause.to_string().to_ascii_lowercase();
            text.contains("503") || text.contains("loading")
        })
    }
}
