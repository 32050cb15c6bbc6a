// src/imagegen/automatic1111.rs — Stable Diffusion web UI (AUTOMATIC1111) client
//
// POSTs to /sdapi/v1/txt2img. The router bounds the call with its own
// timeout, so the HTTP client here has none.

use async_trait::async_trait;
use serde::Deserialize;

use super::{ImageGenerator, Txt2ImgRequest};
use crate::infra::errors::GatewayError;

const PROVIDER_ID: &str = "automatic1111";

pub struct Automatic1111Client {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

impl Automatic1111Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn txt2img_url(&self) -> String {
        format!("{}/sdapi/v1/txt2img", self.base_url)
    }
}

fn parse_images(body: &str) -> Result<Vec<String>, GatewayError> {
    serde_json::from_str::<Txt2ImgResponse>(body)
        .map(|r| r.images)
        .map_err(|e| GatewayError::Provider {
            provider: PROVIDER_ID.into(),
            message: format!("Failed to parse txt2img response: {}", e),
        })
}

#[async_trait]
impl ImageGenerator for Automatic1111Client {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn generate(&self, request: &Txt2ImgRequest) -> Result<Vec<String>, GatewayError> {
        tracing::info!(
            steps = request.steps,
            cfg_scale = request.cfg_scale,
            denoising_strength = request.denoising_strength,
            "txt2img request"
        );

        let response = self
            .client
            .post(self.txt2img_url())
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Provider {
                provider: PROVIDER_ID.into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Provider {
                provider: PROVIDER_ID.into(),
                message: format!("HTTP {}: {}", status, error_body),
            });
        }

        let body = response.text().await.map_err(|e| GatewayError::Provider {
            provider: PROVIDER_ID.into(),
            message: e.to_string(),
        })?;
        let images = parse_images(&body)?;

        tracing::info!(count = images.len(), "txt2img returned images");
        Ok(images)
    }
}
