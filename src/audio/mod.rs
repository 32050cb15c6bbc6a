// src/audio/mod.rs — Voice recording download and conversion
//
// Telegram delivers voice notes as OGG/Opus; the transcription endpoint is
// fed MP3. Conversion shells out to ffmpeg.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::core::types::UserId;
use crate::infra::errors::GatewayError;
use crate::integrations::types::FileDownloader;

/// A converted recording on disk. The file is removed on drop.
#[derive(Debug)]
pub struct VoiceFile {
    path: PathBuf,
}

impl VoiceFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for VoiceFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Produces a transcription-ready audio file for a voice message.
#[async_trait]
pub trait VoicePreparer: Send + Sync {
    async fn prepare(&self, file_id: &str, user: UserId) -> Result<VoiceFile, GatewayError>;
}

const DEFAULT_CONVERT_TIMEOUT: Duration = Duration::from_secs(60);

/// Download through the messaging platform, then convert with ffmpeg.
pub struct VoicePipeline {
    downloader: Arc<dyn FileDownloader>,
    ffmpeg: String,
    dir: PathBuf,
    convert_timeout: Duration,
}

impl VoicePipeline {
    pub fn new(downloader: Arc<dyn FileDownloader>, ffmpeg: impl Into<String>, dir: PathBuf) -> Self {
        Self {
            downloader,
            ffmpeg: ffmpeg.into(),
            dir,
            convert_timeout: DEFAULT_CONVERT_TIMEOUT,
        }
    }

    pub fn with_convert_timeout(mut self, limit: Duration) -> Self {
        self.convert_timeout = limit;
        self
    }

    /// File names are per user; the dispatcher never runs two events for the
    /// same user at once, so they cannot collide.
    fn paths_for(&self, user: UserId) -> (PathBuf, PathBuf) {
        (
            self.dir.join(format!("{user}.ogg")),
            self.dir.join(format!("{user}.mp3")),
        )
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), GatewayError> {
        tracing::debug!("Running: {} on {:?}", self.ffmpeg, input);

        // kill_on_drop reaps ffmpeg when the timeout drops the output future
        let run = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-acodec", "libmp3lame"])
            .arg(output)
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.convert_timeout, run)
            .await
            .map_err(|_| {
                GatewayError::Audio(format!(
                    "{} did not finish within {}s",
                    self.ffmpeg,
                    self.convert_timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| GatewayError::Audio(format!("failed to run {}: {e}", self.ffmpeg)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail = stderr.lines().last().unwrap_or_default();
            return Err(GatewayError::Audio(format!(
                "{} exited with {}: {}",
                self.ffmpeg, result.status, tail
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VoicePreparer for VoicePipeline {
    async fn prepare(&self, file_id: &str, user: UserId) -> Result<VoiceFile, GatewayError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let (ogg, mp3) = self.paths_for(user);

        self.downloader
            .download(file_id, &ogg)
            .await
            .map_err(|e| GatewayError::Messaging(format!("voice download failed: {e}")))?;

        let converted = self.convert(&ogg, &mp3).await;
        if let Err(e) = tokio::fs::remove_file(&ogg).await {
            tracing::debug!("Failed to remove {}: {}", ogg.display(), e);
        }
        converted?;

        Ok(VoiceFile::new(mp3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeDownloader;

    #[async_trait]
    impl FileDownloader for FakeDownloader {
        async fn download(&self, file_id: &str, dest: &Path) -> anyhow::Result<()> {
            if file_id == "missing" {
                anyhow::bail!("file not found");
            }
            tokio::fs::write(dest, b"OggS").await?;
            Ok(())
        }
    }

    #[test]
    fn test_voice_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.mp3");
        std::fs::write(&path, b"ID3").unwrap();
        {
            let vf = VoiceFile::new(path.clone());
            assert!(vf.path().exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_paths_are_per_user() {
        let p = VoicePipeline::new(Arc::new(FakeDownloader), "ffmpeg", PathBuf::from("/v"));
        let (ogg, mp3) = p.paths_for(UserId(42));
        assert_eq!(ogg, PathBuf::from("/v/42.ogg"));
        assert_eq!(mp3, PathBuf::from("/v/42.mp3"));
    }

    #[tokio::test]
    async fn test_download_failure_is_messaging_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = VoicePipeline::new(Arc::new(FakeDownloader), "ffmpeg", dir.path().to_path_buf());
        let err = p.prepare("missing", UserId(1)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Messaging(_)));
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_audio_error_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let p = VoicePipeline::new(
            Arc::new(FakeDownloader),
            "/nonexistent/ffmpeg-binary",
            dir.path().to_path_buf(),
        );
        let err = p.prepare("abc", UserId(1)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Audio(_)));
        assert!(!dir.path().join("1.ogg").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_conversion_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-ffmpeg");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let p = VoicePipeline::new(
            Arc::new(FakeDownloader),
            script.to_string_lossy(),
            dir.path().join("voices"),
        )
        .with_convert_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = p.prepare("abc", UserId(7)).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(matches!(err, GatewayError::Audio(ref m) if m.contains("did not finish")));
        assert!(!dir.path().join("voices").join("7.ogg").exists());
    }
}
