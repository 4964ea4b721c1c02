use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use image::DynamicImage;
use rand::Rng;
use reqwest::blocking::Client as HttpClient;
use reqwest::{StatusCode, Url};

use super::{BackendRequest, ImageBackend};
use crate::util::{response_bytes_or_error, trim_base_url};

pub const NAME: &str = "pollinations";
pub const MODEL: &str = "flux";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const MAX_SEED: u32 = 10_000;

/// Keyless endpoint; the prompt travels as a path segment.
pub struct PollinationsBackend {
    api_base: String,
    http: HttpClient,
}

impl PollinationsBackend {
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: trim_base_url(api_base),
            http: HttpClient::new(),
        }
    }

    pub fn request_url(&self, request: &BackendRequest, seed: u32) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .with_context(|| format!("invalid pollinations base URL: {}", self.api_base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("pollinations base URL cannot carry a path: {}", self.api_base))?
            .pop_if_empty()
            .push(&request.prompt);
        url.query_pairs_mut()
            .append_pair("width", &request.width.to_string())
            .append_pair("height", &request.height.to_string())
            .append_pair("model", MODEL)
            .append_pair("seed", &seed.to_string());
        Ok(url)
    }
}

impl ImageBackend for PollinationsBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn generate(&self, request: &BackendRequest) -> Result<DynamicImage> {
        let seed = rand::rng().random_range(0..=MAX_SEED);
        let url = self.request_url(request, seed)?;
        let response = self
            .http
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .context("pollinations request failed")?;
        let status = response.status();
        if status.is_success() && status != StatusCode::OK {
            bail!("pollinations request failed ({}): expected 200", status.as_u16());
        }
        let bytes = response_bytes_or_error(NAME, response)?;
        image::load_from_memory(&bytes).context("pollinations returned bytes that are not an image")
    }
}
