//! Static configuration tables: quality presets, export formats, backgrounds.

use serde::{Deserialize, Serialize};

/// Recording quality identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityId {
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "native")]
    Native,
}

impl QualityId {
    pub fn preset(&self) -> &'static QualityPreset {
        QUALITY_PRESETS
            .iter()
            .find(|p| p.id == *self)
            .unwrap_or(&QUALITY_PRESETS[3])
    }
}

/// Output resolution and bitrate for one quality level.
///
/// `resolution` is `None` for `native`: the screen source's own size is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityPreset {
    pub id: QualityId,
    pub label: &'static str,
    pub resolution: Option<(u32, u32)>,
    pub bitrate: u32,
}

pub static QUALITY_PRESETS: [QualityPreset; 4] = [
    QualityPreset {
        id: QualityId::P720,
        label: "720p HD",
        resolution: Some((1280, 720)),
        bitrate: 5_000_000,
    },
    QualityPreset {
        id: QualityId::P1080,
        label: "1080p Full HD",
        resolution: Some((1920, 1080)),
        bitrate: 8_000_000,
    },
    QualityPreset {
        id: QualityId::P1440,
        label: "1440p QHD",
        resolution: Some((2560, 1440)),
        bitrate: 16_000_000,
    },
    QualityPreset {
        id: QualityId::Native,
        label: "Native",
        resolution: None,
        bitrate: 8_000_000,
    },
];

/// Surface size used when quality is `native` but no screen is shared.
pub const FALLBACK_RESOLUTION: (u32, u32) = (1280, 720);

/// A container/codec combination the recorder may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFormat {
    pub id: &'static str,
    pub label: &'static str,
    pub mime_type: &'static str,
    pub extension: &'static str,
}

/// Export formats in preference order.
pub static EXPORT_FORMATS: [ExportFormat; 6] = [
    ExportFormat {
        id: "webm-vp9",
        label: "WebM (VP9)",
        mime_type: "video/webm;codecs=vp9,opus",
        extension: "webm",
    },
    ExportFormat {
        id: "webm-vp8",
        label: "WebM (VP8)",
        mime_type: "video/webm;codecs=vp8,opus",
        extension: "webm",
    },
    ExportFormat {
        id: "mkv-vp9",
        label: "MKV (VP9)",
        mime_type: "video/x-matroska;codecs=vp9,opus",
        extension: "mkv",
    },
    ExportFormat {
        id: "mkv-generic",
        label: "MKV (Standard)",
        mime_type: "video/x-matroska",
        extension: "mkv",
    },
    ExportFormat {
        id: "mp4-h264",
        label: "MP4 (H.264)",
        mime_type: "video/mp4;codecs=h264,aac",
        extension: "mp4",
    },
    ExportFormat {
        id: "mp4-generic",
        label: "MP4 (Standard)",
        mime_type: "video/mp4",
        extension: "mp4",
    },
];

/// Hard-coded negotiation chain tried after the user's preferred format.
pub const FALLBACK_MIME_TYPES: [&str; 4] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
    "video/mp4",
];

pub fn export_format(id: &str) -> Option<&'static ExportFormat> {
    EXPORT_FORMATS.iter().find(|f| f.id == id)
}

/// File extension for a negotiated mime type (without the dot).
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let container = mime_type.split(';').next().unwrap_or("").trim();
    match container {
        "video/mp4" => "mp4",
        "video/x-matroska" => "mkv",
        _ => "webm",
    }
}

/// Formats the runtime can actually produce, in preference order.
pub fn supported_formats(is_supported: impl Fn(&str) -> bool) -> Vec<&'static ExportFormat> {
    EXPORT_FORMATS
        .iter()
        .filter(|f| is_supported(f.mime_type))
        .collect()
}

/// The first supported format, if any.
pub fn default_format(is_supported: impl Fn(&str) -> bool) -> Option<&'static ExportFormat> {
    EXPORT_FORMATS.iter().find(|f| is_supported(f.mime_type))
}

/// A background style: `colors` is `None` for the plain "none" preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackgroundPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub colors: Option<&'static [&'static str]>,
}

pub const NO_BACKGROUND: &str = "none";

pub static BACKGROUND_PRESETS: [BackgroundPreset; 8] = [
    BackgroundPreset {
        id: NO_BACKGROUND,
        name: "None",
        colors: None,
    },
    BackgroundPreset {
        id: "midnight",
        name: "Midnight Dream",
        colors: Some(&["#0f172a", "#1e1b4b", "#312e81"]),
    },
    BackgroundPreset {
        id: "aurora",
        name: "Aurora Flare",
        colors: Some(&["#064e3b", "#065f46", "#0891b2"]),
    },
    BackgroundPreset {
        id: "sunset",
        name: "Sunset Vibe",
        colors: Some(&["#7c2d12", "#991b1b", "#f59e0b"]),
    },
    BackgroundPreset {
        id: "cyber",
        name: "Cyber Glow",
        colors: Some(&["#4c1d95", "#701a75", "#2563eb"]),
    },
    BackgroundPreset {
        id: "rose",
        name: "Dusty Rose",
        colors: Some(&["#881337", "#9f1239", "#fb7185"]),
    },
    BackgroundPreset {
        id: "ocean",
        name: "Deep Ocean",
        colors: Some(&["#1e3a8a", "#1d4ed8", "#0ea5e9"]),
    },
    BackgroundPreset {
        id: "mesh",
        name: "Mesh Palette",
        colors: Some(&["#4338ca", "#db2777", "#f59e0b"]),
    },
];

pub fn background_preset(id: &str) -> Option<&'static BackgroundPreset> {
    BACKGROUND_PRESETS.iter().find(|p| p.id == id)
}
