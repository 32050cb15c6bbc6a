// src/imagegen/mod.rs — Image generation backend layer

pub mod automatic1111;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::core::flow::GenerationParams;
use crate::infra::errors::GatewayError;

/// txt2img parameters, serialized with the backend's field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Txt2ImgRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub steps: u32,
    pub cfg_scale: u32,
    pub denoising_strength: f64,
}

impl Txt2ImgRequest {
    pub fn new(
        prompt: impl Into<String>,
        negative_prompt: impl Into<String>,
        params: GenerationParams,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: negative_prompt.into(),
            steps: params.steps,
            cfg_scale: params.cfg_scale,
            denoising_strength: params.denoising_strength,
        }
    }
}

/// Image synthesis backend. Returns base64-encoded images in backend order.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn id(&self) -> &str;

    async fn generate(&self, request: &Txt2ImgRequest) -> Result<Vec<String>, GatewayError>;
}

/// Decode one returned image.
///
/// Accepts plain base64, base64 followed by `,<info>`, or a
/// `data:<mime>;base64,<payload>` URL.
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, GatewayError> {
    let payload = match encoded.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, data)| data),
        None => encoded.split(',').next().unwrap_or(encoded),
    };

    BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| GatewayError::Provider {
            provider: "image".into(),
            message: format!("invalid base64 image: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_snake_case() {
        let req = Txt2ImgRequest::new(
            "a lighthouse",
            "blurry",
            GenerationParams {
                steps: 20,
                cfg_scale: 7,
                denoising_strength: 0.75,
            },
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["prompt"], "a lighthouse");
        assert_eq!(json["negative_prompt"], "blurry");
        assert_eq!(json["steps"], 20);
        assert_eq!(json["cfg_scale"], 7);
        assert_eq!(json["denoising_strength"], 0.75);
    }

    #[test]
    fn test_decode_plain() {
        assert_eq!(decode_image("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_with_trailing_info() {
        assert_eq!(decode_image("aGVsbG8=,{\"seed\":1}").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_data_url() {
        assert_eq!(
            decode_image("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_decode_invalid() {
        assert!(matches!(
            decode_image("not base64!!"),
            Err(GatewayError::Provider { .. })
        ));
    }
}
