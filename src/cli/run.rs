// src/cli/run.rs — Wire backends into the router and start the gateway

use std::sync::Arc;

use crate::audio::VoicePipeline;
use crate::core::router::{Backends, Router, RouterConfig};
use crate::core::session::SessionStore;
use crate::gateway;
use crate::imagegen::automatic1111::Automatic1111Client;
use crate::infra::config::Config;
use crate::integrations::TelegramAdapter;
use crate::provider::openai::OpenAIProvider;

pub async fn run_bot(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let bot_token = config.telegram.bot_token.clone().unwrap_or_default();
    let telegram = Arc::new(TelegramAdapter::new(bot_token));
    match telegram.validate().await {
        Ok(who) => tracing::info!("{}", who),
        Err(e) => anyhow::bail!("Telegram token check failed: {e}"),
    }

    let openai = Arc::new(OpenAIProvider::from_config(&config.openai)?);
    let voice_dir = config.audio.resolved_voice_dir();
    tracing::info!(
        chat_model = %config.openai.chat_model,
        image_backend = %config.image.base_url,
        voice_dir = %voice_dir.display(),
        "backends configured"
    );

    let backends = Backends {
        chat: openai.clone(),
        transcriber: openai,
        images: Arc::new(Automatic1111Client::new(config.image.base_url.clone())),
        voice: Arc::new(
            VoicePipeline::new(telegram.clone(), config.audio.ffmpeg.clone(), voice_dir)
                .with_convert_timeout(config.audio.convert_timeout()),
        ),
    };

    let router = Arc::new(Router::new(
        Arc::new(SessionStore::new()),
        backends,
        RouterConfig::from(config),
    ));

    gateway::run_gateway(
        router,
        telegram.clone(),
        telegram,
        config.telegram.poll_timeout_secs,
    )
    .await
}
