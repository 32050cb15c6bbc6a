// src/cli/check.rs — Configuration and token diagnostics

use crate::infra::config::Config;
use crate::integrations::TelegramAdapter;

pub async fn run_check(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let bot_token = config.telegram.bot_token.clone().unwrap_or_default();
    let telegram = TelegramAdapter::new(bot_token);
    let who = telegram.validate().await?;

    println!("Telegram:       {who}");
    println!("Chat model:     {} @ {}", config.openai.chat_model, config.openai.base_url);
    println!("Transcription:  {}", config.openai.transcription_model);
    println!(
        "Image backend:  {} (timeout {}s)",
        config.image.base_url, config.image.timeout_secs
    );
    println!(
        "Voice scratch:  {} (via {})",
        config.audio.resolved_voice_dir().display(),
        config.audio.ffmpeg
    );
    Ok(())
}
