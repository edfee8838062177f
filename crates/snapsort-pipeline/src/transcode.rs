//! HEIC → JPEG transcoding through an external converter command.
//!
//! The default converter is `heif-convert` from libheif:
//! `heif-convert INPUT OUTPUT.jpg`. Any tool with the same
//! `<cmd> <input> <output>` calling convention can be configured.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use snapsort_core::defaults;
use snapsort_core::{Error, ImageTranscoder, Result};

/// Transcoder that shells out to an external converter.
#[derive(Debug, Clone)]
pub struct CommandTranscoder {
    command: String,
    timeout_secs: u64,
}

impl CommandTranscoder {
    pub fn new(command: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            timeout_secs,
        }
    }

    /// Create from `HEIC_CONVERT_CMD` and `HEIC_CONVERT_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let command = std::env::var("HEIC_CONVERT_CMD")
            .ok()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| defaults::HEIC_CONVERT_CMD.to_string());
        let timeout_secs = std::env::var("HEIC_CONVERT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::HEIC_CONVERT_TIMEOUT_SECS);
        Self::new(command, timeout_secs)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Check whether the converter binary can be spawned.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .await
            .is_ok()
    }
}

impl Default for CommandTranscoder {
    fn default() -> Self {
        Self::new(
            defaults::HEIC_CONVERT_CMD,
            defaults::HEIC_CONVERT_TIMEOUT_SECS,
        )
    }
}

/// Run a command with a timeout, failing on a non-zero exit.
async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<()> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Transcode(format!("Converter timed out after {}s", timeout_secs))
        })?
        .map_err(|e| Error::Transcode(format!("Failed to execute converter: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Transcode(format!(
            "Converter failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

#[async_trait]
impl ImageTranscoder for CommandTranscoder {
    #[instrument(skip(self, data), fields(subsystem = "pipeline", component = "transcode", op = "to_jpeg", image_bytes = data.len()))]
    async fn to_jpeg(&self, data: &[u8], media_type: &str) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(Error::Transcode("Cannot convert empty image".to_string()));
        }

        let dir = tempfile::tempdir()
            .map_err(|e| Error::Transcode(format!("Failed to create temp dir: {}", e)))?;
        let suffix = if media_type.eq_ignore_ascii_case("image/heif") {
            "heif"
        } else {
            "heic"
        };
        let input = dir.path().join(format!("input.{}", suffix));
        let output = dir.path().join("output.jpg");

        tokio::fs::write(&input, data)
            .await
            .map_err(|e| Error::Transcode(format!("Failed to write temp file: {}", e)))?;

        debug!(command = %self.command, "Converting HEIC to JPEG");

        run_cmd_with_timeout(
            Command::new(&self.command).arg(&input).arg(&output),
            self.timeout_secs,
        )
        .await?;

        let jpeg = tokio::fs::read(&output)
            .await
            .map_err(|e| Error::Transcode(format!("Converter produced no output: {}", e)))?;
        if jpeg.is_empty() {
            return Err(Error::Transcode("Converter produced empty output".to_string()));
        }
        Ok(jpeg)
    }

    fn name(&self) -> &str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let transcoder = CommandTranscoder::default();
        assert_eq!(transcoder.command(), "heif-convert");
        assert_eq!(transcoder.name(), "command");
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let transcoder = CommandTranscoder::default();
        let err = transcoder.to_jpeg(&[], "image/heic").await.unwrap_err();
        assert!(matches!(err, Error::Transcode(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_transcode_error() {
        let transcoder = CommandTranscoder::new("snapsort-no-such-converter", 5);
        let err = transcoder
            .to_jpeg(b"not really heic", "image/heic")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transcode(_)));
        assert!(!transcoder.is_available().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_converter_without_output_fails() {
        // `true` exits 0 but never writes the output file.
        let transcoder = CommandTranscoder::new("true", 5);
        let err = transcoder.to_jpeg(b"data", "image/heic").await.unwrap_err();
        assert!(err.to_string().contains("no output"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_converter_copies_file() {
        // `cp input output` stands in for a real converter.
        let transcoder = CommandTranscoder::new("cp", 5);
        let out = transcoder.to_jpeg(b"jpeg-bytes", "image/heif").await.unwrap();
        assert_eq!(out, b"jpeg-bytes");
    }
}
