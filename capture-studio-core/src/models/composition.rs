use kurbo::Point;
use serde::{Deserialize, Serialize};

use super::presets::{background_preset, BackgroundPreset, NO_BACKGROUND};

/// Clip shape of the webcam bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WebcamShape {
    Circle,
    RoundedRect,
    Square,
}

/// Live styling of the composite.
///
/// Mutated only while not recording. `webcam_position` is the top-left corner
/// of the bubble in surface coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSettings {
    pub webcam_shape: WebcamShape,
    /// Bubble edge length as a fraction of the surface height.
    pub webcam_scale: f64,
    pub webcam_position: Point,
    pub background: String,
    /// Fraction of the fitted screen rectangle; below 1.0 the screen is framed.
    pub screen_scale: f64,
}

impl CompositionSettings {
    pub const MIN_WEBCAM_SCALE: f64 = 0.05;
    pub const MAX_WEBCAM_SCALE: f64 = 1.0;
    pub const MIN_SCREEN_SCALE: f64 = 0.5;

    pub fn background_preset(&self) -> Option<&'static BackgroundPreset> {
        background_preset(&self.background)
    }

    /// Whether a non-"none" background is selected.
    pub fn has_background(&self) -> bool {
        self.background_preset()
            .map(|p| p.colors.is_some())
            .unwrap_or(false)
    }

    pub fn is_framed(&self) -> bool {
        self.screen_scale < 1.0
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(Self::MIN_WEBCAM_SCALE..=Self::MAX_WEBCAM_SCALE).contains(&self.webcam_scale) {
            return Err(format!("webcam scale out of range: {}", self.webcam_scale));
        }
        if !(Self::MIN_SCREEN_SCALE..=1.0).contains(&self.screen_scale) {
            return Err(format!("screen scale out of range: {}", self.screen_scale));
        }
        if self.background != NO_BACKGROUND && self.background_preset().is_none() {
            return Err(format!("unknown background preset: {}", self.background));
        }
        Ok(())
    }
}

impl Default for CompositionSettings {
    fn default() -> Self {
        Self {
            webcam_shape: WebcamShape::Circle,
            webcam_scale: 0.40,
            webcam_position: Point::new(20.0, 410.0),
            background: NO_BACKGROUND.to_string(),
            screen_scale: 1.0,
        }
    }
}
