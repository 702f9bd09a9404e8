use serde::{Deserialize, Serialize};

use crate::models::composition::CompositionSettings;
use crate::models::presets::{QualityId, FALLBACK_RESOLUTION};

/// Which track feeds the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Raw screen track, no compositing.
    Direct,
    /// Compositor surface.
    Canvas,
}

/// Everything the mode decision depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeInputs {
    pub camera_active: bool,
    pub has_background: bool,
    pub screen_scale: f64,
    pub quality_mismatch: bool,
}

impl ModeInputs {
    pub fn new(
        camera_active: bool,
        settings: &CompositionSettings,
        quality: QualityId,
        screen_native: Option<(u32, u32)>,
    ) -> Self {
        Self {
            camera_active,
            has_background: settings.has_background(),
            screen_scale: settings.screen_scale,
            quality_mismatch: quality_mismatch(quality, screen_native),
        }
    }
}

/// Canvas iff any styling or source requires compositing.
pub fn select_capture_mode(inputs: &ModeInputs) -> CaptureMode {
    if inputs.camera_active || inputs.has_background || inputs.screen_scale < 1.0 || inputs.quality_mismatch {
        CaptureMode::Canvas
    } else {
        CaptureMode::Direct
    }
}

/// Whether `quality` asks for a size other than the screen's own.
pub fn quality_mismatch(quality: QualityId, screen_native: Option<(u32, u32)>) -> bool {
    match (quality.preset().resolution, screen_native) {
        (Some(requested), Some(native)) => requested != native,
        _ => false,
    }
}

/// Surface size for the composite: the preset's, else the screen's, else 720p.
pub fn target_resolution(quality: QualityId, screen_native: Option<(u32, u32)>) -> (u32, u32) {
    quality
        .preset()
        .resolution
        .or(screen_native)
        .unwrap_or(FALLBACK_RESOLUTION)
}
