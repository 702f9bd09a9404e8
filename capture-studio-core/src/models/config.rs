use std::path::PathBuf;
use std::time::Duration;

use super::presets::{export_format, QualityId};

/// Configuration for a studio instance.
#[derive(Debug, Clone)]
pub struct StudioConfiguration {
    /// Output quality (default: native).
    pub quality: QualityId,

    /// Export format id tried first during codec negotiation, e.g. `"mp4-h264"`.
    pub preferred_format: Option<String>,

    /// Video bitrate in bits/s, or None to use the quality preset's bitrate.
    pub video_bitrate: Option<u32>,

    /// Audio bitrate in bits/s (default: 128 kbps).
    pub audio_bitrate: u32,

    /// Encoder flush interval (default: 1 second).
    pub timeslice: Duration,

    /// Compositor tick rate in Hz (default: 30).
    pub frame_rate: u32,

    /// Frame-rate ceiling requested from display capture (default: 60).
    pub max_capture_frame_rate: u32,

    /// Directory backing the durable chunk buffer and settings.
    pub storage_directory: PathBuf,
}

impl StudioConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=120).contains(&self.frame_rate) {
            return Err(format!("unsupported frame rate: {}", self.frame_rate));
        }
        if self.max_capture_frame_rate == 0 {
            return Err("capture frame-rate ceiling must be positive".into());
        }
        if self.timeslice.is_zero() {
            return Err("timeslice must be positive".into());
        }
        if self.audio_bitrate == 0 || self.video_bitrate == Some(0) {
            return Err("bitrate must be positive".into());
        }
        if let Some(ref id) = self.preferred_format {
            if export_format(id).is_none() {
                return Err(format!("unknown export format: {}", id));
            }
        }
        Ok(())
    }

    /// Effective video bitrate: explicit override or the quality preset's.
    pub fn effective_video_bitrate(&self) -> u32 {
        self.video_bitrate.unwrap_or(self.quality.preset().bitrate)
    }

    /// Mime type of the preferred export format, if one is configured.
    pub fn preferred_mime_type(&self) -> Option<&'static str> {
        self.preferred_format
            .as_deref()
            .and_then(export_format)
            .map(|f| f.mime_type)
    }
}

impl Default for StudioConfiguration {
    fn default() -> Self {
        Self {
            quality: QualityId::Native,
            preferred_format: None,
            video_bitrate: None,
            audio_bitrate: 128_000,
            timeslice: Duration::from_secs(1),
            frame_rate: 30,
            max_capture_frame_rate: 60,
            storage_directory: PathBuf::from(".capture-studio"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(StudioConfiguration::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let config = StudioConfiguration {
            frame_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StudioConfiguration {
            preferred_format: Some("avi".into()),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err("unknown export format: avi".to_string()));

        let config = StudioConfiguration {
            timeslice: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bitrate_follows_quality_unless_overridden() {
        let config = StudioConfiguration {
            quality: QualityId::P1440,
            ..Default::default()
        };
        assert_eq!(config.effective_video_bitrate(), 16_000_000);

        let config = StudioConfiguration {
            video_bitrate: Some(2_500_000),
            ..config
        };
        assert_eq!(config.effective_video_bitrate(), 2_500_000);
    }

    #[test]
    fn preferred_mime_from_format_id() {
        let config = StudioConfiguration {
            preferred_format: Some("mkv-vp9".into()),
            ..Default::default()
        };
        assert_eq!(config.preferred_mime_type(), Some("video/x-matroska;codecs=vp9,opus"));
    }
}
